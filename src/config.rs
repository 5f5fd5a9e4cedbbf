use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExplorerError, Result};

/// Tuning for the quantum overlay.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayParams {
    /// Opacity removed from every transient link per tick.
    pub decay_step: f32,
    /// Datasets at or below this size are never sampled.
    pub min_nodes: usize,
    /// Density is divided by this to get the per-tick spawn probability.
    pub density_divisor: f32,
    /// Animation phase advance per tick.
    pub phase_step: f32,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            decay_step: 0.01,
            min_nodes: 5,
            density_divisor: 600.0,
            phase_step: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub overlay: OverlayParams,
    /// Initial quantum density, 0..=100.
    pub default_density: f32,
    /// Fixed seed for overlay sampling; random when absent.
    pub seed: Option<u64>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            overlay: OverlayParams::default(),
            default_density: 50.0,
            seed: None,
        }
    }
}

impl ExplorerConfig {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|error| ExplorerError::Config(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading explorer config");
        let raw = fs::read_to_string(path)
            .map_err(|error| ExplorerError::Config(format!("{}: {error}", path.display())))?;
        Self::from_toml(&raw)
    }

    fn validate(&self) -> Result<()> {
        if !(self.overlay.density_divisor > 100.0) {
            return Err(ExplorerError::Config(
                "overlay.density_divisor must exceed 100 so spawn probability stays below 1".to_owned(),
            ));
        }
        if self.overlay.min_nodes < 1 {
            return Err(ExplorerError::Config("overlay.min_nodes must be at least 1".to_owned()));
        }
        if !(self.overlay.decay_step > 0.0) {
            return Err(ExplorerError::Config("overlay.decay_step must be positive".to_owned()));
        }
        if !(0.0..=100.0).contains(&self.default_density) {
            return Err(ExplorerError::Config("default_density must be within 0..=100".to_owned()));
        }
        Ok(())
    }
}
