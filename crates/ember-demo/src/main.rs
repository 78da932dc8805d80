mod game;

use std::sync::Arc;

use ember_engine::config::{Settings, SettingsSource};
use ember_engine::diagnostics;
use ember_engine::logging::{init_logging, LoggingConfig};
use ember_engine::startup::StartupSequencer;
use ember_engine::store::AppStore;
use ember_engine::window::Runtime;

use game::Playground;

fn main() {
    let path = Settings::resolve_path();
    let (settings, source) = Settings::load_or_fallback(&path);

    init_logging(LoggingConfig {
        log_path: settings.log_path.clone(),
        ..LoggingConfig::default()
    });

    match source {
        SettingsSource::File(path) => log::info!("settings loaded from {}", path.display()),
        SettingsSource::Fallback(e) => log::warn!("using default settings: {e:#}"),
    }

    // Only the engine's own stages are critical; the listener is optional.
    let mut seq = StartupSequencer::<()>::new();
    let (telemetry, listener) = match settings.diagnostics_addr.as_deref() {
        Some(addr) => seq.degradable(
            "diagnostics",
            || diagnostics::spawn(addr).map(|(publisher, handle)| (Some(publisher), Some(handle))),
            || (None, None),
        ),
        None => (None, None),
    };

    let store = Arc::new(AppStore::with_app_state());
    let result = Runtime::run(settings, store, telemetry, Playground);

    if let Some(handle) = listener {
        handle.join();
    }

    if let Err(e) = result {
        log::error!("{e:#}");
        eprintln!("fatal: {e:#}");
        std::process::exit(1);
    }
}
