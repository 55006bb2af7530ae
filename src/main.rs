//! macroarc host: wires the engine to enigo, rdev and real timers.
//!
//! Usage: `macroarc [settings.json]`. Defaults apply when the file is
//! missing. Log level defaults to info; override with RUST_LOG.

use std::{path::PathBuf, sync::Arc};

use macroarc::{
    listener, Collaborators, ConfigError, EnigoActuator, Engine, LogSink, MemoryMacroStore,
    MemorySettingsStore, Settings, ThreadScheduler,
};
use thiserror::Error;

const DEFAULT_SETTINGS_PATH: &str = "macroarc.json";

#[derive(Debug, Error)]
enum HostError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("input listener failed: {0:?}")]
    Listen(rdev::ListenError),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), HostError> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
    let settings = Settings::load(&path)?;

    log::info!(
        "macroarc v{}: auto-click {}, record {}, playback {}, hotkey button {} ({:?})",
        env!("CARGO_PKG_VERSION"),
        settings.auto_clicker_hotkey,
        settings.record_hotkey,
        settings.playback_hotkey,
        settings.hotkey_button,
        settings.hotkey_mode,
    );

    let engine = Arc::new(Engine::new(Collaborators {
        actuator: Arc::new(EnigoActuator::spawn()),
        scheduler: Arc::new(ThreadScheduler::new()),
        notifier: Arc::new(LogSink),
        settings: Arc::new(MemorySettingsStore::new(settings)),
        macros: Arc::new(MemoryMacroStore::new()),
    }));

    let result = listener::listen(engine.clone()).map_err(HostError::Listen);
    engine.shutdown();
    result
}
