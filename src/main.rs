//! bakeview - viewer for a baked architectural model.
//!
//! Loads a glTF model, an sRGB environment cubemap and a baked lighting
//! texture, assigns glass or baked materials by mesh name, and drives a
//! directional light, orbit camera and an egui control panel per frame.

mod app;
mod assets;
mod config;
mod render;
mod scene;
mod ui;
mod viewer;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Render(#[from] render::RenderError),
}

fn main() -> Result<(), StartupError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let arg = std::env::args_os().nth(1);
    if arg.as_deref() == Some(OsStr::new("--init-config")) {
        let path = Path::new(config::DEFAULT_CONFIG_FILE);
        config::save_config(&config::ViewerConfig::default(), path)?;
        log::info!("Wrote default config to {}", path.display());
        return Ok(());
    }
    let config_path = arg.map(PathBuf::from);
    let config = config::resolve_config(config_path.as_deref())?;

    log::info!("bakeview starting, model {}", config.model_path);
    log::info!("   Press ESC or close window to exit");

    app::run(config)?;

    log::info!("Goodbye");
    Ok(())
}
