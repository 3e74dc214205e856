use crossbeam_channel::unbounded;
use halomatch::core::domain::{Catalog, CatalogHeader, Halo};
use halomatch::core::grid::Grid;
use halomatch::engine::builder::{build_footprints, ReferenceSnapshot};
use halomatch::matcher::{MatchEvent, MatchParams, MatchStrategy};
use halomatch::HaloMatcher;
use nalgebra::Point3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

const BOX: f64 = 500.0;
const HALOS: usize = 20_000;
const PER_HALO: usize = 64;

/// Two catalogs drawn from one snapshot: the second keeps a random
/// three-quarters of every halo's particles.
fn make_catalogs(rng: &mut ChaCha8Rng) -> (ReferenceSnapshot, Catalog, Catalog) {
    let mut positions = Vec::with_capacity(HALOS * PER_HALO);
    let mut primary = Vec::with_capacity(HALOS);
    let mut secondary = Vec::with_capacity(HALOS);

    for id in 0..HALOS {
        let center = Point3::new(
            rng.gen_range(0.0..BOX),
            rng.gen_range(0.0..BOX),
            rng.gen_range(0.0..BOX),
        );
        let ids: Vec<u64> = (0..PER_HALO)
            .map(|_| {
                let offset = nalgebra::Vector3::new(
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(-2.0..2.0),
                );
                positions.push(center + offset);
                (positions.len() - 1) as u64
            })
            .collect();
        let kept: Vec<u64> = ids.iter().copied().filter(|_| rng.gen_bool(0.75)).collect();

        let mass = PER_HALO as f64 * rng.gen_range(0.5..2.0);
        primary.push(Halo::new(id as i64, mass, center).with_particles(ids));
        secondary.push(Halo::new(id as i64, mass * 0.75, center).with_particles(kept));
    }

    let mut a = Catalog::new(CatalogHeader::cubic(0, BOX), primary);
    let mut b = Catalog::new(CatalogHeader::cubic(0, BOX), secondary);
    a.sort_by_mass();
    b.sort_by_mass();
    (ReferenceSnapshot::new(positions), a, b)
}

fn main() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let (snapshot, mut primary, mut secondary) = make_catalogs(&mut rng);

    let grid = Grid::cubic(256, *primary.box_size());
    let start = Instant::now();
    build_footprints(&mut primary, &snapshot, &grid).expect("primary footprints");
    build_footprints(&mut secondary, &snapshot, &grid).expect("secondary footprints");
    println!("Footprints took: {:?}", start.elapsed());

    for strategy in [MatchStrategy::TwoPass, MatchStrategy::SinglePass] {
        let matcher = HaloMatcher::new(MatchParams {
            mass_offset: 3.0,
            max_displacement: 10.0,
            strategy,
            ..Default::default()
        });

        let (tx, rx) = unbounded();
        let start = Instant::now();
        let outcome = matcher.run(&primary, &secondary, Some(tx));
        let duration = start.elapsed();

        let passes = rx
            .iter()
            .filter(|e| matches!(e, MatchEvent::PassFinished { .. }))
            .count();

        println!(
            "{:?}: {} of {} matched in {:?} ({} passes)",
            strategy,
            outcome.stats.matched,
            outcome.stats.num_primary,
            duration,
            passes
        );
    }
}
