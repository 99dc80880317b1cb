use ferrous_decor::{DecorationConfig, DiError, ServiceCollection};
use serial_test::serial;
use std::env;

const WARN: &str = "FERROUS_DECOR_WARN_ON_SKIPPED_CANDIDATES";
const VALIDATE: &str = "FERROUS_DECOR_VALIDATE_ON_BUILD";

fn clear() {
    env::remove_var(WARN);
    env::remove_var(VALIDATE);
}

#[test]
#[serial]
fn defaults_without_variables() {
    clear();
    assert_eq!(DecorationConfig::from_env().unwrap(), DecorationConfig::default());
}

#[test]
#[serial]
fn variables_override_defaults() {
    clear();
    env::set_var(WARN, "yes");
    env::set_var(VALIDATE, "0");

    let config = DecorationConfig::from_env().unwrap();
    assert!(config.warn_on_skipped_candidates);
    assert!(!config.validate_on_build);
    clear();
}

#[test]
#[serial]
fn values_are_case_insensitive_and_trimmed() {
    clear();
    env::set_var(WARN, " TRUE ");
    env::set_var(VALIDATE, "Off");

    let config = DecorationConfig::from_env().unwrap();
    assert!(config.warn_on_skipped_candidates);
    assert!(!config.validate_on_build);
    clear();
}

#[test]
#[serial]
fn invalid_value_is_a_config_error() {
    clear();
    env::set_var(WARN, "sometimes");

    match DecorationConfig::from_env() {
        Err(DiError::Config(message)) => {
            assert!(message.contains(WARN));
            assert!(message.contains("sometimes"));
        }
        other => panic!("unexpected {other:?}"),
    }
    clear();
}

#[test]
#[serial]
fn custom_prefix() {
    env::set_var("MY_APP_WARN_ON_SKIPPED_CANDIDATES", "on");
    let config = DecorationConfig::from_env_with_prefix("my_app").unwrap();
    assert!(config.warn_on_skipped_candidates);
    assert!(config.validate_on_build);
    env::remove_var("MY_APP_WARN_ON_SKIPPED_CANDIDATES");
}

#[test]
#[serial]
fn collection_carries_loaded_config() {
    clear();
    env::set_var(WARN, "1");
    let mut services = ServiceCollection::new();
    services.with_config(DecorationConfig::from_env().unwrap());
    assert!(services.config().warn_on_skipped_candidates);
    clear();
}

#[cfg(feature = "config")]
#[test]
fn json_file_loading() {
    let path = env::temp_dir().join(format!("ferrous-decor-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "validate_on_build": false }"#).unwrap();

    let config = DecorationConfig::from_json_file(&path).unwrap();
    assert!(!config.validate_on_build);
    assert!(!config.warn_on_skipped_candidates);

    std::fs::remove_file(&path).unwrap();
    assert!(matches!(
        DecorationConfig::from_json_file(&path),
        Err(DiError::Config(_))
    ));
}
