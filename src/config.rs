//! # Configuration
//!
//! Settings for the terrain store, loadable from JSON. Every field has a
//! default, so a config file only needs to name what it changes:
//!
//! ```json
//! { "save_path": "saves/world.bin", "terrain": { "width": 32, "seed": 7 } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("terrain grid must be positive and even in both directions, got {width}x{depth}")]
    InvalidGrid { width: u32, depth: u32 },

    #[error("invalid noise settings: {0}")]
    InvalidNoise(&'static str),

    #[error("terrain amplitude must be finite and non-negative, got {0}")]
    InvalidAmplitude(f32),

    #[error("terrain heights must be finite and within ±{limit}: {reason}")]
    InvalidHeight { reason: &'static str, limit: f32 },
}

/// Largest absolute height, in blocks, a column may reach. Block centers up
/// to this magnitude stay exactly representable as `f32` half-integers.
pub const HEIGHT_LIMIT: f32 = 1_048_576.0;

/// Shape of the generated terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Number of columns along x. Must be even so the grid centers on the origin.
    pub width: u32,
    /// Number of columns along z. Must be even.
    pub depth: u32,
    /// Maximum deviation of the surface from `median_height`, in blocks.
    pub amplitude: f32,
    /// Surface height of a column where the noise is zero.
    pub median_height: f32,
    /// Bottom of every column.
    pub min_height: f32,
    /// Multiplier applied to grid coordinates before sampling noise.
    pub noise_scale: f64,
    pub octaves: u32,
    pub persistence: f64,
    /// Fixed noise seed. A random seed is drawn for every generation when unset.
    pub seed: Option<u32>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 16,
            depth: 16,
            amplitude: 4.0,
            median_height: 10.0,
            min_height: 0.0,
            noise_scale: 0.1,
            octaves: 3,
            persistence: 0.5,
            seed: None,
        }
    }
}

impl TerrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid_ok = |n: u32| n > 0 && n % 2 == 0;
        if !grid_ok(self.width) || !grid_ok(self.depth) {
            return Err(ConfigError::InvalidGrid {
                width: self.width,
                depth: self.depth,
            });
        }
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(ConfigError::InvalidAmplitude(self.amplitude));
        }
        let in_range = |h: f32| h.is_finite() && h.abs() <= HEIGHT_LIMIT;
        if !in_range(self.min_height) {
            return Err(invalid_height("min_height is out of range"));
        }
        if !in_range(self.median_height) {
            return Err(invalid_height("median_height is out of range"));
        }
        if !in_range(self.median_height + self.amplitude)
            || !in_range(self.median_height - self.amplitude)
        {
            return Err(invalid_height("median_height ± amplitude is out of range"));
        }
        if !self.noise_scale.is_finite() {
            return Err(ConfigError::InvalidNoise("noise_scale must be finite"));
        }
        if !self.persistence.is_finite() {
            return Err(ConfigError::InvalidNoise("persistence must be finite"));
        }
        if self.octaves == 0 {
            return Err(ConfigError::InvalidNoise("at least one octave is required"));
        }
        Ok(())
    }
}

fn invalid_height(reason: &'static str) -> ConfigError {
    ConfigError::InvalidHeight {
        reason,
        limit: HEIGHT_LIMIT,
    }
}

/// Top-level settings of a `TerrainStore`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Where the registry is persisted on shutdown and restored on startup.
    pub save_path: PathBuf,
    pub terrain: TerrainConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("./world.bin"),
            terrain: TerrainConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate()
    }
}
