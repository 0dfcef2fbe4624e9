//! Connection config error-message and atomic-write tests.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use ranger_sync_core::{config, ConfigError, RangerConnection};

fn connection() -> RangerConnection {
    RangerConnection::new("ranger.local", 6080, "admin", "secret", "cl1_hadoop", "cl1_hive")
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("connection.yaml"));
    assert!(err.to_string().contains("ranger-sync init"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".ranger-sync/connection.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("connection.yaml"));
}

#[test]
fn load_rejects_empty_repository_name() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".ranger-sync/connection.yaml")
        .write_str(
            "hostname: ranger.local\nport: 6080\nusername: admin\npassword: secret\n\
             hdfs_repository_name: ''\nhive_repository_name: cl1_hive\n",
        )
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
    assert!(err.to_string().contains("hdfs_repository_name"));
}

// ---------------------------------------------------------------------------
// 2. Save
// ---------------------------------------------------------------------------

#[test]
fn save_creates_config_and_removes_tmp() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &connection()).expect("save");

    home.child(".ranger-sync/connection.yaml")
        .assert(predicate::path::exists());
    home.child(".ranger-sync/connection.yaml.tmp")
        .assert(predicate::path::missing());
    home.child(".ranger-sync/connection.yaml")
        .assert(predicate::str::contains("hive_repository_name: cl1_hive"));
}

#[test]
fn save_refuses_invalid_config() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut conn = connection();
    conn.hostname = "  ".to_string();

    let err = config::save_at(home.path(), &conn).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    home.child(".ranger-sync/connection.yaml")
        .assert(predicate::path::missing());
}

#[test]
fn save_overwrites_existing_config() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &connection()).expect("first save");

    let mut updated = connection();
    updated.port = 6182;
    updated.scheme = "https".to_string();
    config::save_at(home.path(), &updated).expect("second save");

    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded.base_url(), "https://ranger.local:6182");
}
