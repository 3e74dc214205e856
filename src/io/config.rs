use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::matcher::MatchParams;

/// Everything a matching run needs, loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub primary_catalog: PathBuf,
    pub secondary_catalog: PathBuf,

    /// Cells per axis of the reference-time footprint grid.
    pub grid_resolution: u64,

    /// Both catalogs come from the same run: reuse the primary reference
    /// snapshot for the secondary catalog.
    #[serde(default)]
    pub internal_matching: bool,

    #[serde(default)]
    pub load_cache: bool,
    #[serde(default)]
    pub save_cache: bool,
    #[serde(default)]
    pub cache_path: Option<PathBuf>,

    #[serde(default)]
    pub ascii_output_path: Option<PathBuf>,

    #[serde(default = "default_threads")]
    pub threads: usize,

    #[serde(default)]
    pub params: MatchParams,
}

fn default_threads() -> usize {
    4
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.params;
        // NaN fails every comparison below, so it is rejected too
        if !(p.mass_offset >= 1.0) {
            return Err(invalid("mass_offset", format!("must be >= 1, got {}", p.mass_offset)));
        }
        if !(p.max_displacement > 0.0) {
            return Err(invalid(
                "max_displacement",
                format!("must be positive, got {}", p.max_displacement),
            ));
        }
        if !(p.tie_tolerance >= 0.0) {
            return Err(invalid("tie_tolerance", format!("must be >= 0, got {}", p.tie_tolerance)));
        }
        if !(0.0..100.0).contains(&p.min_goodness) {
            return Err(invalid("min_goodness", format!("must be in [0, 100), got {}", p.min_goodness)));
        }
        if self.grid_resolution == 0 {
            return Err(invalid("grid_resolution", "must be positive".to_string()));
        }
        if self.threads == 0 {
            return Err(invalid("threads", "must be positive".to_string()));
        }
        if (self.load_cache || self.save_cache) && self.cache_path.is_none() {
            return Err(invalid("cache_path", "required when load_cache or save_cache is set".to_string()));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { name, reason }
}
