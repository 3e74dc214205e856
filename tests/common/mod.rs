#![allow(dead_code)]

use halomatch::core::domain::{Catalog, CatalogHeader, Halo};
use halomatch::engine::builder::ReferenceSnapshot;
use halomatch::engine::footprint::Footprint;
use nalgebra::Point3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const BOX: f64 = 100.0;

pub fn halo(id: i64, mass: f64, pos: [f64; 3], cells: &[(u64, u32)]) -> Halo {
    Halo::new(id, mass, Point3::new(pos[0], pos[1], pos[2]))
        .with_footprint(Footprint::from_pairs(cells.iter().copied()))
}

/// Mass-sorted catalog in a cubic box of side [`BOX`].
pub fn catalog(halos: Vec<Halo>) -> Catalog {
    let mut c = Catalog::new(CatalogHeader::cubic(0, BOX), halos);
    c.sort_by_mass();
    c
}

/// A reference snapshot with `n_halos` clumps of `per_halo` particles, and a
/// catalog whose halo `k` owns clump `k`.
pub fn clumped_snapshot(seed: u64, n_halos: usize, per_halo: usize) -> (ReferenceSnapshot, Vec<Vec<u64>>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut positions = Vec::with_capacity(n_halos * per_halo);
    let mut members = Vec::with_capacity(n_halos);

    for _ in 0..n_halos {
        let center = [
            rng.gen_range(0.0..BOX),
            rng.gen_range(0.0..BOX),
            rng.gen_range(0.0..BOX),
        ];
        let mut ids = Vec::with_capacity(per_halo);
        for _ in 0..per_halo {
            ids.push(positions.len() as u64);
            positions.push(Point3::new(
                center[0] + rng.gen_range(-3.0..3.0),
                center[1] + rng.gen_range(-3.0..3.0),
                center[2] + rng.gen_range(-3.0..3.0),
            ));
        }
        members.push(ids);
    }
    (ReferenceSnapshot::new(positions), members)
}

/// Random footprint-carrying catalog for strategy comparisons.
pub fn random_catalog(seed: u64, n: usize, n_cells: u64) -> Catalog {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let halos = (0..n)
        .map(|id| {
            let base = rng.gen_range(0..n_cells);
            let cells: Vec<(u64, u32)> = (0..rng.gen_range(1..6))
                .map(|_| ((base + rng.gen_range(0..4)) % n_cells, rng.gen_range(1..20)))
                .collect();
            halo(
                id as i64,
                rng.gen_range(1.0e10..8.0e10),
                [
                    rng.gen_range(0.0..BOX),
                    rng.gen_range(0.0..BOX),
                    rng.gen_range(0.0..BOX),
                ],
                &cells,
            )
        })
        .collect();
    catalog(halos)
}
