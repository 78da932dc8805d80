use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::coords::Vec2;
use crate::paint::Color;

pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";

/// Environment variable overriding [`DEFAULT_SETTINGS_PATH`].
pub const SETTINGS_PATH_ENV: &str = "EMBER_SETTINGS";

/// Application settings.
///
/// Every field has a default, so a settings file only needs the keys it
/// wants to override.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Window size in logical pixels.
    pub screen_width: u32,
    pub screen_height: u32,

    /// Offscreen render target size in pixels. Scene coordinates live in this space.
    pub render_width: u32,
    pub render_height: u32,

    /// Frame pacing target. `0` presents as fast as the surface allows.
    pub target_fps: u32,

    pub title: String,

    /// Log file. `None` logs to stderr.
    pub log_path: Option<PathBuf>,

    /// Startup grace period during which only blank frames are presented.
    pub warmup_secs: f32,

    /// Fixed simulation step, in seconds.
    pub fixed_dt: f32,

    /// Gravity in physics units per second squared.
    pub gravity: Vec2,

    /// Render-space pixels per physics unit.
    pub pixels_per_unit: f32,

    /// Straight-alpha RGBA clear color of the render target.
    pub clear_color: [f32; 4],

    /// Longest frame the clock reports, in seconds.
    pub max_frame_secs: f32,

    /// Local address of the diagnostics listener. `None` disables it.
    pub diagnostics_addr: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screen_width: 1280,
            screen_height: 720,
            render_width: 640,
            render_height: 360,
            target_fps: 60,
            title: "ember".to_string(),
            log_path: None,
            warmup_secs: 5.0,
            fixed_dt: 1.0 / 60.0,
            gravity: Vec2::zero(),
            pixels_per_unit: 32.0,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            max_frame_secs: 0.25,
            diagnostics_addr: Some("127.0.0.1:6969".to_string()),
        }
    }
}

/// Where the active settings came from.
#[derive(Debug)]
pub enum SettingsSource {
    File(PathBuf),
    /// Built-in defaults; carries the load failure for deferred logging.
    Fallback(anyhow::Error),
}

impl Settings {
    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        settings.validated()
    }

    /// Loads settings, falling back to defaults on any failure.
    pub fn load_or_fallback(path: impl AsRef<Path>) -> (Self, SettingsSource) {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(s) => (s, SettingsSource::File(path.to_path_buf())),
            Err(e) => (Self::default(), SettingsSource::Fallback(e)),
        }
    }

    /// Resolves the settings path from [`SETTINGS_PATH_ENV`] or the default.
    pub fn resolve_path() -> PathBuf {
        std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
    }

    pub fn clear_color(&self) -> Color {
        Color::from(self.clear_color)
    }

    fn validated(self) -> Result<Self> {
        anyhow::ensure!(
            self.screen_width > 0 && self.screen_height > 0,
            "screen size must be non-zero, got {}x{}",
            self.screen_width,
            self.screen_height
        );
        anyhow::ensure!(
            self.render_width > 0 && self.render_height > 0,
            "render size must be non-zero, got {}x{}",
            self.render_width,
            self.render_height
        );
        anyhow::ensure!(
            self.fixed_dt.is_finite() && self.fixed_dt > 0.0,
            "fixed_dt must be positive, got {}",
            self.fixed_dt
        );
        anyhow::ensure!(
            self.warmup_secs.is_finite() && self.warmup_secs >= 0.0,
            "warmup_secs must be non-negative, got {}",
            self.warmup_secs
        );
        anyhow::ensure!(
            self.max_frame_secs.is_finite() && self.max_frame_secs > 0.0,
            "max_frame_secs must be positive, got {}",
            self.max_frame_secs
        );
        anyhow::ensure!(
            self.pixels_per_unit.is_finite() && self.pixels_per_unit > 0.0,
            "pixels_per_unit must be positive, got {}",
            self.pixels_per_unit
        );
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ember-settings-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let path = temp_file("partial.json", r#"{ "title": "demo", "target_fps": 144 }"#);
        let s = Settings::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(s.title, "demo");
        assert_eq!(s.target_fps, 144);
        assert_eq!(s.screen_width, Settings::default().screen_width);
        assert_eq!(s.warmup_secs, 5.0);
    }

    #[test]
    fn nested_values_are_parsed() {
        let path = temp_file(
            "nested.json",
            r#"{ "gravity": { "x": 0.0, "y": 9.8 }, "log_path": "ember.log", "diagnostics_addr": null }"#,
        );
        let s = Settings::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(s.gravity, Vec2::new(0.0, 9.8));
        assert_eq!(s.log_path, Some(PathBuf::from("ember.log")));
        assert_eq!(s.diagnostics_addr, None);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let (s, source) = Settings::load_or_fallback("/definitely/not/here/settings.json");
        assert_eq!(s, Settings::default());
        assert!(matches!(source, SettingsSource::Fallback(_)));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = temp_file("broken.json", "{ not json");
        let (s, source) = Settings::load_or_fallback(&path);
        fs::remove_file(&path).ok();

        assert_eq!(s, Settings::default());
        let SettingsSource::Fallback(err) = source else { panic!("expected fallback") };
        assert!(format!("{err:#}").contains("failed to parse"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let path = temp_file("invalid.json", r#"{ "render_width": 0 }"#);
        let result = Settings::load(&path);
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
