use blastgrid_settings::{Config, ConfigError, SettingsError};
use tempfile::tempdir;

#[test]
fn test_toml_round_trip() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.canvas.grid_color = "#336699".to_string();
    config.render.max_cache_size = 4;
    config.pattern.settings.spacing = 4.5;
    config.storage.directory = dir.path().join("patterns");

    config.save_to_file(&path).expect("save");
    let loaded = Config::load_from_file(&path).expect("load");
    assert_eq!(loaded, config);
}

#[test]
fn test_json_round_trip() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.json");

    let mut config = Config::default();
    config.canvas.max_zoom = 4.0;
    config.save_to_file(&path).expect("save");

    let loaded = Config::load_from_file(&path).expect("load");
    assert_eq!(loaded.canvas.max_zoom, 4.0);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[render]\nmax_grid_lines = 200\n").expect("write");

    let loaded = Config::load_from_file(&path).expect("load");
    assert_eq!(loaded.render.max_grid_lines, 200);
    assert_eq!(loaded.render.max_cache_size, 10);
    assert_eq!(loaded.canvas.ruler_height, 30.0);
}

#[test]
fn test_invalid_file_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[canvas]\nmin_zoom = 5.0\nmax_zoom = 2.0\n").expect("write");

    match Config::load_from_file(&path) {
        Err(SettingsError::Config(ConfigError::Inconsistent(_))) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_invalid_config_not_written() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.render.max_grid_lines = 0;
    assert!(config.save_to_file(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_load_or_default_missing_file() {
    let dir = tempdir().expect("tempdir");
    let loaded = Config::load_or_default(&dir.path().join("absent.toml")).expect("defaults");
    assert_eq!(loaded, Config::default());
}
