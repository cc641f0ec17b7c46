//! Persisted player settings and settings file resolution
//!
//! Player settings (effects, playback modes, volume) are read once at startup
//! and written back whenever they change. The engine only ever sees the
//! current values; the storage mechanism lives here.
//!
//! # Settings file resolution priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. OS-dependent config directory (`<config_dir>/cloude/settings.toml`)
//! 4. `./cloude_settings.toml` when no config directory exists

use crate::fade_curves::FadeCurve;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the settings file
pub const SETTINGS_ENV_VAR: &str = "CLOUDE_SETTINGS";

/// Default crossfade duration in seconds
pub const DEFAULT_CROSSFADE_SECONDS: f64 = 3.8;

/// Environment-sound settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsSettings {
    /// Effects chain routed in for the active slot
    pub enabled: bool,

    /// Preset name (`studio`, `cinema`, `concert`, `car`, `night`)
    pub preset: String,

    /// User strength, 0-100
    pub strength: u8,

    /// Stereo separation boost
    pub separation: bool,

    /// Bass shelf trim in dB
    pub bass_db: i8,

    /// Clarity peak trim in dB
    pub clarity_db: i8,
}

impl Default for EffectsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: "studio".to_string(),
            strength: 65,
            separation: true,
            bass_db: 3,
            clarity_db: 2,
        }
    }
}

/// Track-change behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackModes {
    /// Overlap outgoing/incoming tracks with a gain ramp
    pub crossfade: bool,

    /// Advance with no fade just before the end of a track
    pub gapless: bool,

    /// Starting from the library enqueues the whole library
    pub smart_play: bool,

    /// Crossfade duration in seconds
    pub crossfade_seconds: f64,

    /// Gain law used for crossfades
    pub fade_curve: FadeCurve,
}

impl Default for PlaybackModes {
    fn default() -> Self {
        Self {
            crossfade: true,
            gapless: false,
            smart_play: true,
            crossfade_seconds: DEFAULT_CROSSFADE_SECONDS,
            fade_curve: FadeCurve::EqualPower,
        }
    }
}

/// All persisted player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Master volume, 0.0-1.0
    pub volume: f32,

    /// Look up lyrics for tracks automatically
    pub auto_lyrics: bool,

    pub effects: EffectsSettings,

    pub playback: PlaybackModes,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            auto_lyrics: true,
            effects: EffectsSettings::default(),
            playback: PlaybackModes::default(),
        }
    }
}

impl PlayerSettings {
    /// Clamp every field into its valid range
    pub fn sanitized(mut self) -> Self {
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.effects.strength = self.effects.strength.min(100);
        self.effects.bass_db = self.effects.bass_db.clamp(-12, 12);
        self.effects.clarity_db = self.effects.clarity_db.clamp(-12, 12);
        if !self.playback.crossfade_seconds.is_finite() || self.playback.crossfade_seconds <= 0.0 {
            self.playback.crossfade_seconds = DEFAULT_CROSSFADE_SECONDS;
        }
        // Crossfade wins when a hand-edited file enables both
        if self.playback.crossfade && self.playback.gapless {
            self.playback.gapless = false;
        }
        self
    }
}

/// TOML-backed settings store
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, writing defaults back when the file does not exist
    pub fn load_or_init(&self) -> Result<PlayerSettings> {
        if !self.path.exists() {
            info!(
                "Settings file {} not found, writing defaults",
                self.path.display()
            );
            let settings = PlayerSettings::default();
            self.save(&settings)?;
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let settings: PlayerSettings = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse settings file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("Loaded settings from {}", self.path.display());
        Ok(settings.sanitized())
    }

    /// Write settings to disk, creating parent directories as needed
    pub fn save(&self, settings: &PlayerSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(settings)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(&self.path, content)?;

        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Resolve the settings file path
pub fn resolve_settings_path(cli_arg: Option<&Path>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: OS-dependent default
    default_settings_path()
}

/// OS-dependent default settings path
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("cloude").join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from("./cloude_settings.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = PlayerSettings::default();
        assert!(!settings.effects.enabled);
        assert_eq!(settings.effects.preset, "studio");
        assert_eq!(settings.effects.strength, 65);
        assert!(settings.effects.separation);
        assert_eq!(settings.effects.bass_db, 3);
        assert_eq!(settings.effects.clarity_db, 2);
        assert!(settings.playback.crossfade);
        assert!(!settings.playback.gapless);
        assert!(settings.playback.smart_play);
        assert_eq!(settings.playback.crossfade_seconds, 3.8);
        assert_eq!(settings.volume, 1.0);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let store = SettingsStore::new(&path);

        let settings = store.load_or_init().unwrap();
        assert_eq!(settings, PlayerSettings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.toml"));

        let mut settings = PlayerSettings::default();
        settings.effects.enabled = true;
        settings.effects.preset = "concert".to_string();
        settings.effects.bass_db = -4;
        settings.playback.crossfade = false;
        settings.playback.gapless = true;
        settings.volume = 0.4;
        store.save(&settings).unwrap();

        assert_eq!(store.load_or_init().unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "volume = 0.5\n[effects]\npreset = \"night\"\n").unwrap();

        let settings = SettingsStore::new(&path).load_or_init().unwrap();
        assert_eq!(settings.volume, 0.5);
        assert_eq!(settings.effects.preset, "night");
        assert_eq!(settings.effects.strength, 65);
        assert!(settings.playback.crossfade);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "volume = \"loud\"").unwrap();

        let err = SettingsStore::new(&path).load_or_init().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_sanitized_clamps_ranges() {
        let mut settings = PlayerSettings::default();
        settings.volume = 3.0;
        settings.effects.strength = 250;
        settings.effects.bass_db = 40;
        settings.effects.clarity_db = -40;
        settings.playback.crossfade_seconds = -1.0;
        settings.playback.gapless = true;

        let settings = settings.sanitized();
        assert_eq!(settings.volume, 1.0);
        assert_eq!(settings.effects.strength, 100);
        assert_eq!(settings.effects.bass_db, 12);
        assert_eq!(settings.effects.clarity_db, -12);
        assert_eq!(settings.playback.crossfade_seconds, DEFAULT_CROSSFADE_SECONDS);
        assert!(settings.playback.crossfade);
        assert!(!settings.playback.gapless);
    }

    #[test]
    fn test_cli_path_wins() {
        let cli = PathBuf::from("/tmp/explicit.toml");
        assert_eq!(
            resolve_settings_path(Some(&cli), "CLOUDE_TEST_UNSET_VAR"),
            cli
        );
    }

    #[test]
    fn test_default_path_is_not_empty() {
        let path = resolve_settings_path(None, "CLOUDE_TEST_UNSET_VAR");
        assert!(!path.as_os_str().is_empty());
    }
}
