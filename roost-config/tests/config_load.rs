use roost_config::RoostConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
version: "0.1"
twitter:
  auth_token: "${ROOST_TEST_BEARER}"
  csrf_token: "ct0-value"
  cookie: "auth_token=abc; ct0=ct0-value"
cache:
  url: "sqlite::memory:"
  database: "ai-cache"
logging:
  format: json
  stderr: true
"#;

#[test]
#[serial]
fn loads_file_and_expands_env() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "roost.yaml", FILE_YAML);

    let config = temp_env::with_var("ROOST_TEST_BEARER", Some("AAAA"), || {
        RoostConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load system config")
    });

    assert_eq!(config.version.as_deref(), Some("0.1"));
    assert_eq!(config.twitter.auth_token, "AAAA");
    assert_eq!(config.cache.url, "sqlite::memory:");
    assert_eq!(config.cache.index, "index");
    assert_eq!(config.logging.format.as_deref(), Some("json"));
    assert!(config.logging.stderr);
}

#[test]
#[serial]
fn env_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "roost.yaml", FILE_YAML);

    let config = temp_env::with_vars(
        [
            ("ROOST_TEST_BEARER", Some("AAAA")),
            ("ROOST__CACHE__DATABASE", Some("override-db")),
        ],
        || RoostConfigLoader::new().with_file(&p).load().expect("load"),
    );

    assert_eq!(config.cache.database, "override-db");
}

#[test]
#[serial]
fn optional_file_may_be_absent() {
    let tmp = TempDir::new().unwrap();
    let config = RoostConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .with_yaml_str("twitter: { auth_token: a, csrf_token: b, cookie: c }")
        .load()
        .expect("optional file skipped");
    assert_eq!(config.twitter.csrf_token, "b");

    let missing = RoostConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(missing.is_err());
}
