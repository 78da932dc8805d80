use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "ember_engine=debug,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Appends to this file instead of writing to stderr.
    pub log_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            log_path: None,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Idempotent; subsequent calls are ignored. A log file that cannot be opened
/// leaves the logger on stderr and is reported as a warning.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = &config.env_filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
            // wgpu is chatty at info.
            builder.filter_module("wgpu_core", log::LevelFilter::Warn);
            builder.filter_module("wgpu_hal", log::LevelFilter::Warn);
        }

        let mut file_error = None;
        match &config.log_path {
            Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                    builder.write_style(env_logger::WriteStyle::Never);
                }
                Err(e) => {
                    file_error = Some(format!("{}: {e}", path.display()));
                    builder.write_style(config.write_style);
                }
            },
            None => {
                builder.write_style(config.write_style);
            }
        }

        builder.init();

        if let Some(err) = file_error {
            log::warn!("could not open log file {err}; logging to stderr");
        }
        log::debug!("logging initialized");
    });
}
