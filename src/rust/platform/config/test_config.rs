use super::*;

#[test]
fn test_missing_config_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load(dir.path()).unwrap();

    assert_eq!(config, AppConfig::default());
    assert!(dir.path().join(CONFIG_JSON).exists());

    // The written file loads back to the same values.
    let reloaded = AppConfig::load(dir.path()).unwrap();
    assert_eq!(reloaded, config);
}

#[test]
fn test_toml_config_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(CONFIG_TOML),
        r#"
[serial]
port = "/dev/rfcomm0"
baud_rate = 9600

[device]
channels = 60
layout = "layouts/strip.json"

[timing]
drain_tick_ms = 20
"#,
    )
    .unwrap();

    let config = AppConfig::load(dir.path()).unwrap();
    assert_eq!(config.serial.port, "/dev/rfcomm0");
    assert_eq!(config.serial.baud_rate, 9600);
    assert_eq!(config.serial.settle_ms, 2_000);
    assert_eq!(config.device.channels, 60);
    assert_eq!(
        config.layout_path(dir.path()),
        Some(dir.path().join("layouts/strip.json"))
    );

    let session = config.session_config();
    assert_eq!(session.drain_tick, Duration::from_millis(20));
    assert_eq!(session.default_duration, Duration::from_millis(100));
    assert_eq!(session.command_delay, Duration::from_millis(10));
}

#[test]
fn test_toml_wins_over_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG_JSON), r#"{"device": {"channels": 10}}"#).unwrap();
    fs::write(dir.path().join(CONFIG_TOML), "[device]\nchannels = 20\n").unwrap();

    let config = AppConfig::load(dir.path()).unwrap();
    assert_eq!(config.device.channels, 20);
}

#[test]
fn test_dot_config_accepts_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG_DOT), r#"{"log": {"verbose": true}}"#).unwrap();

    let config = AppConfig::load(dir.path()).unwrap();
    assert!(config.log.verbose);
    assert!(!dir.path().join(CONFIG_JSON).exists());
}

#[test]
fn test_invalid_pitch_bounds_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(CONFIG_TOML),
        "[device]\nmin_pitch = 100\nmax_pitch = 50\n",
    )
    .unwrap();

    let err = AppConfig::load(dir.path()).unwrap_err();
    assert!(err.to_string().contains("min_pitch"));
}

#[test]
fn test_malformed_json_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG_JSON), "{ nope").unwrap();

    let err = AppConfig::load(dir.path()).unwrap_err();
    assert!(err.to_string().contains("invalid JSON config"));
}
