//! Optional JSON configuration file.
//!
//! JSON shape (every field optional):
//! {
//!   "layout": {
//!     "algorithm": "force",        // force | hierarchical | radial
//!     "canvas_width": 1200,
//!     "canvas_height": 800,
//!     "min_spacing": 60,
//!     "cell_area": 14400,
//!     "grid_threshold": 150,
//!     "seed": 7
//!   },
//!   "refresh": {
//!     "interval_secs": 15,
//!     "status_ttl_secs": 10
//!   }
//! }

use crate::Result;
use crate::layout::LayoutConfig;
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    /// How long New/Changed highlights and tombstones stay visible.
    pub status_ttl_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            status_ttl_secs: 10,
        }
    }
}

impl RefreshConfig {
    pub fn status_ttl_ms(&self) -> i64 {
        i64::try_from(self.status_ttl_secs.saturating_mul(1_000)).unwrap_or(i64::MAX)
    }
}

impl Config {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
        let config: Config =
            serde_json::from_str(&text).with_context(|| format!("parse config file {}", path))?;
        config.validate().with_context(|| format!("invalid config file {}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let l = &self.layout;
        if !(l.canvas_width > 0.0 && l.canvas_height > 0.0) {
            bail!(
                "canvas must have positive size, got {}x{}",
                l.canvas_width,
                l.canvas_height
            );
        }
        if !(l.min_spacing > 0.0) {
            bail!("min_spacing must be positive, got {}", l.min_spacing);
        }
        if !(l.cell_area >= 0.0) {
            bail!("cell_area must not be negative, got {}", l.cell_area);
        }
        Ok(())
    }
}
