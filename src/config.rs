//! Run configuration. Every field has a default, so a config file only needs the values it changes.
//!
//! ```toml
//! data_root = "single-person/data/raw_data/indiv_data"
//! subjects = ["X05", "X07"]
//! fps = 50
//!
//! [view]
//! elevation = 18.0
//! azimuth = -10.0
//! ```

use crate::animate::MAX_FRAME_RATE;
use crate::topology::{Topology, TopologyError, MOCAP_22_PARENTS};
use crate::types::ParentIndex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid skeleton topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("Frame rate must be between 1 and 100 fps, got {0}")]
    InvalidFrameRate(u32),

    #[error("Unit scale must be a positive finite number, got {0}")]
    InvalidUnitScale(f64),

    #[error("Image size must be at least {min} pixels, got {size}")]
    ImageTooSmall { size: u32, min: u32 },
}

/// Smallest image the renderer will draw into.
pub const MIN_IMAGE_SIZE: u32 = 64;

/// How a single frame is looked at and rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    /// Camera height above the xy plane, in degrees.
    pub elevation: f64,
    /// Camera rotation about the z axis, in degrees.
    pub azimuth: f64,
    /// Width and height of every rendered image, in pixels.
    pub image_size: u32,
    /// Draw the wireframe of the view box with axis letters.
    pub show_box: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            elevation: 16.0,
            azimuth: -35.0,
            image_size: 500,
            show_box: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding one sub directory of .bvh files per subject.
    pub data_root: PathBuf,
    /// Where stills and GIFs are written.
    pub output_dir: PathBuf,
    pub subjects: Vec<String>,
    /// Factor applied to every loaded position (millimetres to metres by default).
    pub unit_scale: f64,
    /// Playback rate of animated output.
    pub fps: u32,
    /// Parent index of every joint, -1 for roots.
    pub parents: Vec<ParentIndex>,
    pub view: ViewConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_root: PathBuf::from("single-person/data/raw_data/indiv_data"),
            output_dir: PathBuf::from("visual_results"),
            subjects: ["X05", "X07", "X08", "X09"].map(String::from).to_vec(),
            unit_scale: 1.0 / 1000.0,
            fps: 50,
            parents: MOCAP_22_PARENTS.to_vec(),
            view: ViewConfig::default(),
        }
    }
}

impl Config {
    /// Load `path`, or fall back to the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let config = match path {
            None => Config::default(),
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Config::from_toml(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    /// Checks the values that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_FRAME_RATE).contains(&self.fps) {
            return Err(ConfigError::InvalidFrameRate(self.fps));
        }
        if !(self.unit_scale.is_finite() && self.unit_scale > 0.0) {
            return Err(ConfigError::InvalidUnitScale(self.unit_scale));
        }
        if self.view.image_size < MIN_IMAGE_SIZE {
            return Err(ConfigError::ImageTooSmall {
                size: self.view.image_size,
                min: MIN_IMAGE_SIZE,
            });
        }
        self.topology()?;
        Ok(())
    }

    pub fn topology(&self) -> Result<Topology, TopologyError> {
        Topology::new(self.parents.clone())
    }
}
