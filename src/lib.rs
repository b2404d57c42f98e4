pub mod capture;
pub mod convert;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod process;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

pub use capture::frame::{PackedImage, RawFrame};
pub use error::PipelineError;

use crate::process::ProcessorKind;

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// In-flight device frame budget; mirrors the small driver-side pool.
    pub pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub processor: ProcessorKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                width: 640,
                height: 480,
                fps: 30,
                pool_size: 2,
            },
            display: DisplayConfig {
                width: 640,
                height: 480,
            },
            pipeline: PipelineConfig {
                processor: ProcessorKind::Grayscale,
            },
        }
    }
}

impl Config {
    /// Layered load: built-in defaults, then an optional `edgeview.toml`,
    /// then `EDGEVIEW_*` environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name("edgeview").required(false))
            .add_source(config::Environment::with_prefix("EDGEVIEW").separator("__"))
            .build()?
            .try_deserialize()
    }
}
