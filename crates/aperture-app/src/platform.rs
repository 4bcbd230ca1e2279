//! Per-user directories of the installation.

use std::io;
use std::path::{Path, PathBuf};

use aperture_config::{ConfigError, default_config_dir};

const APP_NAME: &str = "aperture";

/// Errors resolving or creating platform directories.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The OS did not provide a configuration directory.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Directory creation failed.
    #[error("platform I/O error: {0}")]
    Io(#[from] io::Error),
}

/// OS-specific directories (XDG on Linux, Known Folders on Windows,
/// Library on macOS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDirs {
    /// `config.ron` lives here.
    pub config_dir: PathBuf,
    /// Recorded input scripts and other session data.
    pub data_dir: PathBuf,
    /// Log files.
    pub log_dir: PathBuf,
}

impl PlatformDirs {
    /// Resolves the directories without touching the disk. An explicit
    /// `config_dir` (from `--config`) replaces the OS location.
    pub fn resolve(config_dir: Option<&Path>) -> Result<Self, PlatformError> {
        let config_dir = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_config_dir()?,
        };
        let data_dir = dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .unwrap_or_else(|| config_dir.join("data"));
        Ok(Self {
            log_dir: config_dir.join("logs"),
            config_dir,
            data_dir,
        })
    }

    /// Directories rooted under `root`.
    pub fn with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            data_dir: app_dir.join("data"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Creates every directory on disk.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
