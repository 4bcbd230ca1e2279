//! Runs a portal session: a capture device creating portals on the server
//! side and a rendering client mirroring them, stepped at a fixed rate.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p aperture-app -- --ticks 300` for a short session.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use aperture_app::platform::PlatformDirs;
use aperture_app::script::InputScript;
use aperture_app::session::Session;
use aperture_app::tick_loop::TickLoop;
use aperture_config::{CliArgs, Config};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match PlatformDirs::resolve(args.config.as_deref()) {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to resolve platform directories: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = dirs.create_dirs() {
        eprintln!("Failed to create platform directories: {e}");
    }

    let mut config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    aperture_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    info!(config = %dirs.config_dir.display(), "aperture starting");

    let script = match &config.session.input_script {
        Some(path) => match InputScript::load(path) {
            Ok(script) => script,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("no input script configured, playing the built-in demo");
            InputScript::demo(&config.portal)
        }
    };
    if script.is_empty() {
        warn!("input script has no frames");
    }

    let mut session = match Session::new(&config, script) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to start session: {e}");
            return ExitCode::FAILURE;
        }
    };

    let ticks = config.session.ticks;
    let mut tick_loop = TickLoop::new(config.session.tick_rate);
    let mut failure = None;
    while session.tick_count() < ticks && failure.is_none() {
        tick_loop.tick(|_, _| match session.step() {
            Ok(_) => session.tick_count() < ticks,
            Err(e) => {
                failure = Some(e);
                false
            }
        });
        std::thread::sleep(Duration::from_millis(1));
    }

    if let Some(e) = failure {
        error!(tick = session.tick_count(), "session failed: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        ticks = session.tick_count(),
        seconds = tick_loop.total_time(),
        portals = session.registry().len(),
        mirrors = session.client().reconciler().len(),
        "session finished"
    );
    ExitCode::SUCCESS
}
