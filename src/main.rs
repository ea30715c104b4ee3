//! Demo: a host window with the overlay on top.
//!
//! ```text
//! overlay3d-demo [MODEL]
//! ```
//!
//! `MODEL` is an optional `.stl` or `.json` model to load once the scene is
//! up. Set `OVERLAY3D_CONFIG` to a JSON file to override the overlay
//! configuration, and `RUST_LOG` to change log verbosity.

use glam::Vec3;
use overlay3d::desktop::{HostConfig, run_overlay};
use overlay3d::{Color, Command, LoggingConfig, ObjectSpec, OverlayConfig, init_logging};

fn load_config() -> OverlayConfig {
    let Ok(path) = std::env::var("OVERLAY3D_CONFIG") else {
        return OverlayConfig::default();
    };
    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|json| OverlayConfig::from_json_str(&json).map_err(|e| e.to_string()));
    match parsed {
        Ok(config) => {
            log::info!("using overlay config from {path}");
            config
        }
        Err(e) => {
            log::error!("ignoring overlay config {path}: {e}");
            OverlayConfig::default()
        }
    }
}

fn main() {
    init_logging(LoggingConfig::default());

    let mut startup = vec![
        Command::CreateScene,
        Command::CreateObject(
            ObjectSpec::new()
                .color(Color::GREEN)
                .size(2.0, 1.0, 1.0)
                .position(Vec3::new(0.0, 0.0, -3.0)),
        ),
    ];
    if let Some(model) = std::env::args().nth(1) {
        startup.push(Command::LoadExternalObject { url: model });
    }

    let host = HostConfig::new().title("overlay3d demo host").size(960, 600);
    if let Err(e) = run_overlay(host, load_config(), startup) {
        log::error!("event loop failed: {e}");
        std::process::exit(1);
    }
}
