use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::engine::footprint::Footprint;

// --- Header Types ---

/// Cosmological parameters carried along with a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cosmology {
    pub omega_m: f64,
    pub omega_l: f64,
    pub h0: f64,
    pub particle_mass: f64,
}

impl Default for Cosmology {
    fn default() -> Self {
        Self {
            omega_m: 0.3,
            omega_l: 0.7,
            h0: 0.7,
            particle_mass: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogHeader {
    pub num_halos: usize,
    /// Periodic box length per axis, in the same units as halo positions.
    pub box_size: Vector3<f64>,
    #[serde(default)]
    pub cosmology: Cosmology,
}

impl CatalogHeader {
    pub fn cubic(num_halos: usize, box_len: f64) -> Self {
        Self {
            num_halos,
            box_size: Vector3::repeat(box_len),
            cosmology: Cosmology::default(),
        }
    }
}

// --- The Core Entity ---

/// A cataloged structure (halo).
///
/// `id == None` marks a removed or placeholder entry. Placeholders keep their
/// slot (and mass) so the catalog stays mass-sorted, but they are never used
/// as a match reference or target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Halo {
    pub id: Option<i64>,
    pub mass: f64,
    pub position: Point3<f64>,
    pub velocity: Vector3<f64>,
    /// Particle count used as the goodness denominator.
    #[serde(default)]
    pub num_particles: usize,
    #[serde(default)]
    pub particle_ids: Vec<u64>,

    #[serde(skip)]
    pub footprint: Footprint,
}

impl Halo {
    pub fn new(id: i64, mass: f64, position: Point3<f64>) -> Self {
        Self {
            id: Some(id),
            mass,
            position,
            velocity: Vector3::zeros(),
            num_particles: 0,
            particle_ids: Vec::new(),
            footprint: Footprint::default(),
        }
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.id.is_none()
    }

    pub fn with_particles(mut self, particle_ids: Vec<u64>) -> Self {
        self.num_particles = particle_ids.len();
        self.particle_ids = particle_ids;
        self
    }

    /// Attaches a prebuilt footprint. The particle count becomes the
    /// footprint's total weight.
    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.num_particles = footprint.total() as usize;
        self.footprint = footprint;
        self
    }
}

/// One snapshot's worth of halos plus its box geometry.
///
/// The matcher requires `halos` sorted by ascending mass; call
/// [`Catalog::sort_by_mass`] after loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub header: CatalogHeader,
    pub halos: Vec<Halo>,
}

impl Catalog {
    pub fn new(header: CatalogHeader, halos: Vec<Halo>) -> Self {
        let mut header = header;
        header.num_halos = halos.len();
        Self { header, halos }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.halos.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.halos.is_empty()
    }

    #[inline]
    pub fn box_size(&self) -> &Vector3<f64> {
        &self.header.box_size
    }

    /// Stable ascending sort by mass.
    pub fn sort_by_mass(&mut self) {
        self.halos.sort_by(|a, b| a.mass.total_cmp(&b.mass));
    }

    /// Stable ascending sort by id. Placeholders go last.
    pub fn sort_by_id(&mut self) {
        self.halos.sort_by(|a, b| match (a.id, b.id) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    pub fn is_mass_sorted(&self) -> bool {
        self.halos.windows(2).all(|w| w[0].mass <= w[1].mass)
    }

    /// Turns the entry at `index` into a placeholder, keeping its slot.
    /// Returns the previous id, or `None` if the index was out of range or
    /// already a placeholder.
    pub fn remove(&mut self, index: usize) -> Option<i64> {
        let halo = self.halos.get_mut(index)?;
        halo.footprint = Footprint::default();
        halo.id.take()
    }
}
