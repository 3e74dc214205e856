//! JSON catalog bundles: a halo catalog plus the reference-time particle
//! positions its footprints are built from.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::core::domain::{Catalog, CatalogHeader, Halo};
use crate::engine::builder::ReferenceSnapshot;
use crate::error::CatalogError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub header: CatalogHeader,
    pub halos: Vec<Halo>,
    /// Particle `id` sits at `reference_positions[id]`. May be empty when the
    /// bundle only serves as a secondary catalog in internal matching.
    #[serde(default)]
    pub reference_positions: Vec<Point3<f64>>,
}

impl CatalogFile {
    /// Splits the bundle into a mass-sorted catalog and its snapshot.
    pub fn into_parts(self) -> (Catalog, ReferenceSnapshot) {
        let mut halos = self.halos;
        for h in &mut halos {
            if h.num_particles == 0 {
                h.num_particles = h.particle_ids.len();
            }
        }
        let mut catalog = Catalog::new(self.header, halos);
        catalog.sort_by_mass();
        (catalog, ReferenceSnapshot::new(self.reference_positions))
    }
}

pub fn load_catalog(path: &Path) -> Result<CatalogFile, CatalogError> {
    let file = File::open(path)?;
    let bundle: CatalogFile = serde_json::from_reader(BufReader::new(file))?;
    log::info!(
        "Loaded {} halos and {} reference particles from {}",
        bundle.halos.len(),
        bundle.reference_positions.len(),
        path.display()
    );
    Ok(bundle)
}

pub fn save_catalog(bundle: &CatalogFile, path: &Path) -> Result<(), CatalogError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, bundle)?;
    writer.flush()?;
    Ok(())
}
