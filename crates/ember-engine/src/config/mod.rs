//! Settings loading.
//!
//! Settings are optional: a missing or malformed file degrades to built-in
//! defaults and the caller reports the failure once logging is up.

mod settings;

pub use settings::{Settings, SettingsSource, DEFAULT_SETTINGS_PATH, SETTINGS_PATH_ENV};
