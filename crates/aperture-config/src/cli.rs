//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Aperture command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "aperture", about = "Recursive portal session")]
pub struct CliArgs {
    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// RON file of recorded capture-device input frames.
    #[arg(long)]
    pub input_script: Option<PathBuf>,

    /// Number of ticks to run before exiting.
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Portal panel width in meters.
    #[arg(long)]
    pub portal_width: Option<f32>,

    /// Portal panel height in meters.
    #[arg(long)]
    pub portal_height: Option<f32>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref script) = args.input_script {
            self.session.input_script = Some(script.clone());
        }
        if let Some(ticks) = args.ticks {
            self.session.ticks = ticks;
        }
        if let Some(w) = args.portal_width {
            self.portal.width = w;
        }
        if let Some(h) = args.portal_height {
            self.portal.height = h;
        }
    }
}
