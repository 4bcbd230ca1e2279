//! Configuration structs with sensible defaults and RON persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "aperture";

/// Top-level installation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Portal geometry and interaction constants.
    pub portal: PortalConfig,
    /// Capture device wiring.
    pub capture: CaptureConfig,
    /// Portal rendering settings.
    pub render: RenderConfig,
    /// Per-process session settings (tick rate, observation slots).
    pub session: SessionConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Portal geometry and interaction constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortalConfig {
    /// Width of a captured portal panel in meters.
    pub width: f32,
    /// Height of a captured portal panel in meters.
    pub height: f32,
    /// Per-tick scale multiplier while the shrink button is held.
    pub shrink_factor: f32,
    /// Per-tick scale multiplier while the grow button is held.
    pub grow_factor: f32,
    /// Magnification applied to portals laid out in the gallery carousel.
    pub gallery_magnification: f32,
    /// Horizontal gap between neighbouring gallery portals in meters.
    pub gallery_spacing: f32,
    /// Half-height of the gallery grab box in meters.
    pub grab_half_height: f32,
    /// Half-depth of the gallery grab box in meters.
    pub grab_half_depth: f32,
    /// Border material assigned to newly captured portals.
    pub default_border_material: String,
}

/// Capture device wiring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Button overrides (action name -> channel index).
    pub buttons: BTreeMap<String, u8>,
    /// Capture new portals in 3D (viewer-following) mode.
    pub capture_in_3d: bool,
    /// Capture new portals with negative parallax enabled.
    pub capture_negative_parallax: bool,
}

/// Viewer pipeline settings a portal pipeline is cloned from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerPipelineConfig {
    /// Enable bloom.
    pub bloom: bool,
    /// Bloom intensity.
    pub bloom_intensity: f32,
    /// Bloom radius.
    pub bloom_radius: f32,
    /// Enable screen-space ambient occlusion.
    pub ssao: bool,
    /// Enable back-face culling.
    pub backface_culling: bool,
    /// Enable frustum culling.
    pub frustum_culling: bool,
    /// Enable FXAA.
    pub fxaa: bool,
}

/// Portal rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Fixed per-eye resolution of every portal render target.
    pub portal_resolution: [u32; 2],
    /// Texture shown on a portal panel seen from behind.
    pub placeholder_texture: String,
    /// Sky-map texture used as the portal pipeline background.
    pub background_texture: String,
    /// Settings of the viewer pipeline owning the portal pipelines.
    pub viewer: ViewerPipelineConfig,
}

/// One observation slot served by this client process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotConfig {
    /// Platform (navigation group) the slot belongs to.
    pub platform: u32,
    /// Screen index.
    pub screen: u32,
    /// Slot index on that screen.
    pub slot: u32,
    /// Whether the slot renders in stereo.
    pub stereo: bool,
    /// Head position in platform coordinates when no tracker is attached.
    #[serde(default = "default_head_position")]
    pub head_position: [f32; 3],
    /// Distance between the eyes, zero for mono.
    #[serde(default = "default_eye_distance")]
    pub eye_distance: f32,
}

fn default_head_position() -> [f32; 3] {
    [0.0, 1.7, 0.6]
}

fn default_eye_distance() -> f32 {
    0.064
}

/// Per-process session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Evaluation ticks per second.
    pub tick_rate: u32,
    /// Observation slots of this client.
    pub slots: Vec<SlotConfig>,
    /// Optional RON file of recorded device input frames.
    pub input_script: Option<PathBuf>,
    /// Number of ticks to run before exiting.
    pub ticks: u64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the console output.
    pub file_logging: bool,
}

// --- Default implementations ---

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            width: 0.3,
            height: 0.3,
            shrink_factor: 0.985,
            grow_factor: 1.015,
            gallery_magnification: 1.5,
            gallery_spacing: 0.05,
            grab_half_height: 0.1,
            grab_half_depth: 0.05,
            default_border_material: "data/materials/ShadelessBlue.gmd".to_string(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            buttons: BTreeMap::new(),
            capture_in_3d: true,
            capture_negative_parallax: true,
        }
    }
}

impl Default for ViewerPipelineConfig {
    fn default() -> Self {
        Self {
            bloom: false,
            bloom_intensity: 0.1,
            bloom_radius: 10.0,
            ssao: true,
            backface_culling: false,
            frustum_culling: true,
            fxaa: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            portal_resolution: [1024, 1024],
            placeholder_texture: "data/textures/tiles_diffuse.jpg".to_string(),
            background_texture: "data/textures/sky.jpg".to_string(),
            viewer: ViewerPipelineConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            slots: vec![SlotConfig {
                platform: 0,
                screen: 0,
                slot: 0,
                stereo: true,
                head_position: default_head_position(),
                eye_distance: default_eye_distance(),
            }],
            input_script: None,
            ticks: 600,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logging: false,
        }
    }
}

/// Default per-user config directory (`<os config dir>/aperture`).
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

// --- Load / Save ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}
