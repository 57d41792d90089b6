//! Configuration loading

use std::io::Write;

use adaptive_sizing::config::Config;
use adaptive_sizing::ControlError;

#[test]
fn test_example_config_matches_defaults() {
    let example: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    example.validate().unwrap();
    assert_eq!(
        toml::to_string(&example).unwrap(),
        toml::to_string(&Config::default()).unwrap()
    );
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[pid]\nkp = 3.0\n\n[thompson]\nseed = 9\n\n[telemetry]\nlog_format = \"json\""
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.pid.kp, 3.0);
    assert_eq!(config.pid.ki, 0.1);
    assert_eq!(config.thompson.seed, Some(9));
}

#[test]
fn test_load_rejects_invalid_section() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[thompson]\nfloor = 0.0").unwrap();

    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ControlError>(),
        Some(ControlError::Configuration(_))
    ));
}

#[test]
fn test_load_missing_file() {
    assert!(Config::load("/nonexistent/adaptive-sizing.toml").is_err());
    assert!(Config::load_optional("/nonexistent/adaptive-sizing.toml")
        .unwrap()
        .is_none());
}

#[test]
fn test_load_optional_keeps_validation_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[thompson]\ndecay = 1.5").unwrap();
    assert!(Config::load_optional(file.path()).is_err());
}
