use strata_core::config::{dirs_path, GlobalConfig};
use tempfile::TempDir;

#[test]
fn test_global_config_default_jobs_nonzero() {
    let config = GlobalConfig::default();
    assert!(config.build.jobs > 0, "jobs should be > 0");
}

#[test]
fn test_global_config_default_no_module() {
    let config = GlobalConfig::default();
    assert!(config.build.default_module.is_none());
    assert!(config.build.default_variant.is_none());
}

#[test]
fn test_global_config_jobs_default_from_empty_toml() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert!(config.build.jobs > 0);
}

#[test]
fn test_dirs_path_ends_with_strata() {
    if std::env::var("STRATA_HOME").is_err() {
        assert!(dirs_path().ends_with(".strata"));
    }
}

#[test]
fn test_global_config_parse_from_toml() {
    let toml = r#"
[build]
jobs = 3
default-module = "app"
default-variant = "release"
"#;
    let config: GlobalConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.build.jobs, 3);
    assert_eq!(config.build.default_module.as_deref(), Some("app"));
    assert_eq!(config.build.default_variant.as_deref(), Some("release"));
}

#[test]
fn test_global_config_load_from_missing_file_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = GlobalConfig::load_from(&tmp.path().join("config.toml")).unwrap();
    assert!(config.build.default_module.is_none());
}

#[test]
fn test_global_config_load_from_invalid_file_fails() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[build]\njobs = \"many\"\n").unwrap();
    assert!(GlobalConfig::load_from(&path).is_err());
}
