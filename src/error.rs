use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FootprintError {
    #[error("halo {halo:?} references particle {particle} missing from the reference snapshot")]
    UnknownParticle { halo: Option<i64>, particle: u64 },

    #[error("invalid grid: {0}")]
    InvalidGrid(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid match cache: {0}")]
    InvalidFormat(String),

    #[error("match cache version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u8, found: u8 },

    #[error("match cache holds {found_primary}x{found_secondary} halos, catalogs have {expected_primary}x{expected_secondary}")]
    CatalogMismatch {
        expected_primary: usize,
        expected_secondary: usize,
        found_primary: usize,
        found_secondary: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid parameter `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level error for a matching run.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Footprint(#[from] FootprintError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("report error: {0}")]
    Report(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
