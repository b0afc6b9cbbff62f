//! `sable [config.json]`: run a game from a data directory.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use sable_engine::config::EngineConfig;
use sable_engine::engine::Engine;
use sable_engine::graphics::window::WindowBackend;
use sable_engine::logging::{init_logging, LogLevel};
use sable_python::PythonHost;

const LOG_FILE: &str = "log.txt";

fn main() -> ExitCode {
    if let Err(err) = init_logging(LogLevel::Debug, Some(Path::new(LOG_FILE))) {
        eprintln!("sable: {err}");
        return ExitCode::FAILURE;
    }

    match run() {
        Ok(()) => {
            tracing::info!("shutting down");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => EngineConfig::default(),
    };

    let backend = WindowBackend::new(&config).context("failed to open the game window")?;
    let scripts_dir = config.scripts_dir();
    let mut engine = Engine::new(config, Box::new(backend), |world| {
        Ok(PythonHost::new(world, scripts_dir))
    })
    .context("failed to start the engine")?;

    while engine.update()? {}
    Ok(())
}
