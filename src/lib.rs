//! Cross-identification of halos between two simulation catalogs.
//!
//! Objects are matched by mass and by the overlap of the reference-time grid
//! cells their particles occupied, accepting only reciprocal best matches.

pub mod collections;
pub mod core;
pub mod engine;
pub mod error;
pub mod io;
pub mod matcher;

pub use crate::core::domain::{Catalog, CatalogHeader, Halo};
pub use crate::error::MatchError;
pub use crate::matcher::halo_matcher::{HaloMatcher, MatchOutcome};
pub use crate::matcher::{Candidate, MatchParams, MatchStrategy, MatchTable};
