//! Configuration management for quadwarp

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::assembler::{WarpOptions, WarpStrategy, DEFAULT_MESH_RESOLUTION, DEFAULT_TEXTURE_EXTENT};
use crate::matrix::DEFAULT_PIVOT_EPSILON;
use crate::quad::{Point, PointQuad};

/// Leading comment written into generated config files
const CONFIG_HEADER: &str =
    "# quadwarp settings; [quad] corners are ordered top-right, bottom-right, top-left, bottom-left\n\n";

/// Mesh and quantization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarpConfig {
    /// Grid points per axis
    #[serde(default = "default_mesh_resolution")]
    pub mesh_resolution: usize,

    /// Texture coordinate scale `K` used when quantizing to i16
    #[serde(default = "default_texture_extent")]
    pub texture_extent: f64,

    /// Pivots at or below this magnitude are treated as singular
    #[serde(default = "default_pivot_epsilon")]
    pub pivot_epsilon: f64,

    #[serde(default)]
    pub strategy: WarpStrategy,
}

fn default_mesh_resolution() -> usize {
    DEFAULT_MESH_RESOLUTION
}

fn default_texture_extent() -> f64 {
    DEFAULT_TEXTURE_EXTENT
}

fn default_pivot_epsilon() -> f64 {
    DEFAULT_PIVOT_EPSILON
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            mesh_resolution: DEFAULT_MESH_RESOLUTION,
            texture_extent: DEFAULT_TEXTURE_EXTENT,
            pivot_epsilon: DEFAULT_PIVOT_EPSILON,
            strategy: WarpStrategy::default(),
        }
    }
}

impl WarpConfig {
    pub fn options(&self) -> WarpOptions {
        WarpOptions {
            resolution: self.mesh_resolution,
            texture_extent: self.texture_extent,
            strategy: self.strategy,
            pivot_epsilon: self.pivot_epsilon,
        }
    }
}

/// Destination quad in pixel coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuadConfig {
    /// Order: top-right, bottom-right, top-left, bottom-left
    pub corners: PointQuad,
}

impl Default for QuadConfig {
    fn default() -> Self {
        Self {
            corners: PointQuad::new([
                Point::new(9570.0, 3643.0), // Top-right
                Point::new(8105.0, 6155.0), // Bottom-right
                Point::new(4547.0, 3643.0), // Top-left
                Point::new(6012.0, 6155.0), // Bottom-left
            ]),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub warp: WarpConfig,

    #[serde(default)]
    pub quad: QuadConfig,
}

impl Config {
    /// Parse a TOML document, rejecting settings no warp could satisfy
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("Invalid quadwarp TOML")?;
        let warp = &config.warp;
        if warp.mesh_resolution < 2 {
            bail!("warp.mesh_resolution must be >= 2, got {}", warp.mesh_resolution);
        }
        if !(warp.texture_extent > 0.0 && warp.texture_extent <= i16::MAX as f64) {
            bail!(
                "warp.texture_extent must be in (0, {}], got {}",
                i16::MAX,
                warp.texture_extent
            );
        }
        Ok(config)
    }

    /// Load the warp settings at `path`, writing the defaults there first
    /// when no file exists yet
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("No config at {:?}; wrote defaults", path);
            return Ok(config);
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read quadwarp config {:?}", path))?;
        let config = Self::from_toml_str(&text).with_context(|| format!("In {:?}", path))?;
        tracing::debug!(
            "Config {:?}: {} strategy, {} corners",
            path,
            config.warp.strategy.as_str(),
            config.quad.corners.points().len()
        );
        Ok(config)
    }

    /// Write the settings as TOML, creating missing parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = toml::to_string_pretty(self).context("Cannot encode quadwarp config")?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create config directory {:?}", dir))?;
        }
        std::fs::write(path, format!("{}{}", CONFIG_HEADER, body))
            .with_context(|| format!("Cannot write quadwarp config {:?}", path))
    }
}
