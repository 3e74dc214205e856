use nalgebra::Point3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::domain::Catalog;
use crate::core::grid::Grid;
use crate::engine::footprint::{CellHistogram, Footprint, TreeHistogram};
use crate::error::FootprintError;

/// Source of reference-time particle positions, keyed by particle id.
/// Implementations must be Thread-Safe (Sync).
pub trait ParticleSource: Send + Sync {
    fn position(&self, particle_id: u64) -> Option<Point3<f64>>;

    fn num_particles(&self) -> usize;
}

/// Dense reference snapshot: particle `id` lives at `positions[id]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub positions: Vec<Point3<f64>>,
}

impl ReferenceSnapshot {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self { positions }
    }
}

impl ParticleSource for ReferenceSnapshot {
    #[inline]
    fn position(&self, particle_id: u64) -> Option<Point3<f64>> {
        usize::try_from(particle_id)
            .ok()
            .and_then(|i| self.positions.get(i))
            .copied()
    }

    fn num_particles(&self) -> usize {
        self.positions.len()
    }
}

/// Bins a set of particles into a footprint.
pub fn footprint_of(
    particle_ids: &[u64],
    source: &dyn ParticleSource,
    grid: &Grid,
) -> Result<Footprint, u64> {
    let mut hist = TreeHistogram::new();
    for &pid in particle_ids {
        let pos = source.position(pid).ok_or(pid)?;
        hist.insert_or_increment(grid.cell_of(&pos), 1);
    }
    Ok(Footprint::from_histogram(&hist))
}

/// Fills the footprint of every halo in the catalog.
///
/// Halos are independent, so the work is spread over the rayon pool.
/// Placeholders get an empty footprint.
///
/// **Invariant**: also resets `num_particles` to the length of each halo's
/// particle list.
pub fn build_footprints(
    catalog: &mut Catalog,
    source: &dyn ParticleSource,
    grid: &Grid,
) -> Result<(), FootprintError> {
    if grid.dims().iter().any(|&n| n == 0) {
        return Err(FootprintError::InvalidGrid(format!("zero dimension in {:?}", grid.dims())));
    }

    catalog.halos.par_iter_mut().try_for_each(|halo| {
        if halo.is_placeholder() {
            halo.footprint = Footprint::default();
            return Ok(());
        }
        let footprint = footprint_of(&halo.particle_ids, source, grid).map_err(|particle| {
            FootprintError::UnknownParticle {
                halo: halo.id,
                particle,
            }
        })?;
        halo.num_particles = halo.particle_ids.len();
        halo.footprint = footprint;
        Ok(())
    })?;

    let occupied: usize = catalog.halos.iter().map(|h| h.footprint.as_slice().len()).sum();
    log::debug!(
        "Built {} footprints from {} reference particles on a {:?} grid ({} occupied cells total)",
        catalog.len(),
        source.num_particles(),
        grid.dims(),
        occupied
    );
    Ok(())
}
