use super::*;
use serial_test::serial;

fn clear_env() {
    for key in [
        "PG_DATA_DIR",
        "PG_BUILD_BACKEND",
        "PG_BUILD_CPU_LIMIT",
        "PG_WARMUP_POOL_SIZE",
        "PG_REGISTRY_INSECURE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_apply_when_unset() {
    clear_env();
    let settings = Settings::load().unwrap();
    assert_eq!(settings.build_backend, BuildBackend::Local);
    assert_eq!(settings.warmup_pool_size, 3);
    assert!(!settings.registry_insecure);
}

#[test]
#[serial]
fn data_dir_env_override_is_respected() {
    clear_env();
    std::env::set_var("PG_DATA_DIR", "/tmp/pg-test-data");
    let settings = Settings::load().unwrap();
    assert_eq!(settings.data_dir, PathBuf::from("/tmp/pg-test-data"));
    std::env::remove_var("PG_DATA_DIR");
}

#[test]
#[serial]
fn invalid_build_backend_is_rejected() {
    clear_env();
    std::env::set_var("PG_BUILD_BACKEND", "quantum");
    let err = Settings::load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { key: "PG_BUILD_BACKEND", .. }));
    std::env::remove_var("PG_BUILD_BACKEND");
}

#[test]
#[serial]
fn malformed_numeric_value_is_rejected() {
    clear_env();
    std::env::set_var("PG_BUILD_CPU_LIMIT", "not-a-number");
    let err = Settings::load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { key: "PG_BUILD_CPU_LIMIT", .. }));
    std::env::remove_var("PG_BUILD_CPU_LIMIT");
}

#[test]
#[serial]
fn derived_paths_nest_under_data_dir() {
    clear_env();
    std::env::set_var("PG_DATA_DIR", "/tmp/pg-test-data2");
    let settings = Settings::load().unwrap();
    assert_eq!(settings.metadata_dir(), PathBuf::from("/tmp/pg-test-data2/metadata"));
    assert_eq!(settings.workspaces_dir(), PathBuf::from("/tmp/pg-test-data2/workspaces"));
    std::env::remove_var("PG_DATA_DIR");
}
