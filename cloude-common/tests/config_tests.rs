//! Integration tests for settings resolution and persistence
//!
//! Each test that touches the environment uses its own variable name, so
//! tests can run in parallel without stepping on each other.

use cloude_common::config::{resolve_settings_path, PlayerSettings, SettingsStore};
use cloude_common::FadeCurve;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_env_var_used_without_cli_arg() {
    let var = "CLOUDE_TEST_SETTINGS_ENV_ONLY";
    env::set_var(var, "/tmp/cloude-env/settings.toml");

    let path = resolve_settings_path(None, var);
    assert_eq!(path, PathBuf::from("/tmp/cloude-env/settings.toml"));

    env::remove_var(var);
}

#[test]
fn test_cli_arg_beats_env_var() {
    let var = "CLOUDE_TEST_SETTINGS_CLI_WINS";
    env::set_var(var, "/tmp/cloude-env/settings.toml");

    let cli = PathBuf::from("/tmp/cloude-cli/settings.toml");
    assert_eq!(resolve_settings_path(Some(&cli), var), cli);

    env::remove_var(var);
}

#[test]
fn test_blank_env_var_falls_through_to_default() {
    let var = "CLOUDE_TEST_SETTINGS_BLANK";
    env::set_var(var, "   ");

    let path = resolve_settings_path(None, var);
    assert!(path.to_string_lossy().ends_with("settings.toml"));

    env::remove_var(var);
}

#[test]
fn test_settings_file_is_human_editable_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    let store = SettingsStore::new(&path);

    let mut settings = PlayerSettings::default();
    settings.playback.fade_curve = FadeCurve::SCurve;
    settings.playback.crossfade_seconds = 5.5;
    settings.auto_lyrics = false;
    store.save(&settings).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("[effects]"));
    assert!(text.contains("[playback]"));
    assert!(text.contains("fade_curve = \"s_curve\""));

    let loaded = store.load_or_init().unwrap();
    assert_eq!(loaded.playback.fade_curve, FadeCurve::SCurve);
    assert_eq!(loaded.playback.crossfade_seconds, 5.5);
    assert!(!loaded.auto_lyrics);
}

#[test]
fn test_hand_edited_conflicts_are_resolved_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(
        &path,
        "volume = 7.0\n[playback]\ncrossfade = true\ngapless = true\ncrossfade_seconds = 0.0\n",
    )
    .unwrap();

    let settings = SettingsStore::new(&path).load_or_init().unwrap();
    assert_eq!(settings.volume, 1.0);
    assert!(settings.playback.crossfade);
    assert!(!settings.playback.gapless);
    assert_eq!(settings.playback.crossfade_seconds, 3.8);
}
