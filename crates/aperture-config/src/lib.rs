//! Configuration system for the Aperture portal installation.
//!
//! Settings persist to disk as RON files with forward/backward compatible
//! serialization. CLI overrides come from clap.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CaptureConfig, Config, DebugConfig, PortalConfig, RenderConfig, SessionConfig, SlotConfig,
    ViewerPipelineConfig, default_config_dir,
};
pub use error::ConfigError;
