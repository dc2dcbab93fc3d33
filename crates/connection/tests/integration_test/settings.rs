//! Tests for ConnectionSettings: YAML loading, env precedence and auth selection.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use snowglue_connection::*;

use crate::support::FakeFactory;

// Env-based tests must run serially to avoid interfering with each other.
static ENV_LOCK: Mutex<()> = Mutex::new(());

// Helper: clear all SNOWFLAKE_* and profile env vars used by the settings.
fn clear_snowflake_env() {
    let keys = [
        "SNOWGLUE_PROFILE",
        "SNOWFLAKE_ACCOUNT",
        "SNOWFLAKE_USER",
        "SNOWFLAKE_PASSWORD",
        "SNOWFLAKE_ROLE",
        "SNOWFLAKE_WAREHOUSE",
        "SNOWFLAKE_DATABASE",
        "SNOWFLAKE_SCHEMA",
        "SNOWFLAKE_PRIVATE_KEY_PATH",
        "SNOWFLAKE_PRIVATE_KEY_PEM",
        "SNOWFLAKE_AUTHENTICATOR",
        "PROD_SNOWFLAKE_ROLE",
        "PROD_SNOWFLAKE_PASSWORD",
    ];
    for k in keys {
        env::remove_var(k);
    }
}

fn write_settings(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("snowflake_config.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

const FULL_YAML: &str = "\
snowflake:
  account: acme-xy123
  user: svc_loader
  password: from-yaml
  role: LOADER
  warehouse: LOAD_WH
  database: RAW
  schema: EVENTS
";

#[test]
fn test_settings_from_yaml() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_snowflake_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = write_settings(tmp.path(), FULL_YAML);

    let s = ConnectionSettings::from_yaml(&path).unwrap();

    assert_eq!(s.account, "acme-xy123");
    assert_eq!(s.user, "svc_loader");
    assert_eq!(s.role, "LOADER");
    assert_eq!(s.warehouse, "LOAD_WH");
    assert_eq!(s.database.as_deref(), Some("RAW"));
    assert_eq!(s.schema.as_deref(), Some("EVENTS"));
    assert_eq!(s.auth_kind(), Some("password"));
}

#[test]
fn test_env_wins_over_yaml_and_profile_wins_over_env() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_snowflake_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = write_settings(tmp.path(), FULL_YAML);

    env::set_var("SNOWFLAKE_ROLE", "ENV_ROLE");
    let s = ConnectionSettings::from_yaml(&path).unwrap();
    assert_eq!(s.role, "ENV_ROLE");

    env::set_var("SNOWGLUE_PROFILE", "PROD");
    env::set_var("PROD_SNOWFLAKE_ROLE", "PROD_ROLE");
    env::set_var("PROD_SNOWFLAKE_PASSWORD", "prod-secret");
    let s = ConnectionSettings::from_yaml(&path).unwrap();
    assert_eq!(s.role, "PROD_ROLE");
    assert_eq!(s.password.as_deref(), Some("prod-secret"));
    // Unprofiled fields still come from the file.
    assert_eq!(s.warehouse, "LOAD_WH");

    clear_snowflake_env();
}

#[test]
fn test_env_only_without_file() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_snowflake_env();

    env::set_var("SNOWFLAKE_ACCOUNT", "acme-xy123");
    env::set_var("SNOWFLAKE_USER", "svc");
    env::set_var("SNOWFLAKE_AUTHENTICATOR", "externalbrowser");

    let s = ConnectionSettings::from_yaml("does-not-exist.yaml").unwrap();
    assert_eq!(s.authenticator.as_deref(), Some("externalbrowser"));
    assert_eq!(s.role, "DATASCIENTIST");
    assert_eq!(s.warehouse, "DS_WH_XS");

    clear_snowflake_env();
}

#[test]
fn test_missing_user_fails() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_snowflake_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = write_settings(tmp.path(), "snowflake:\n  account: acme-xy123\n");

    let err = ConnectionSettings::from_yaml(&path).unwrap_err();
    assert!(matches!(err, ConnectionError::Configuration(_)));
    assert!(err.to_string().contains("user"));
}

#[test]
fn test_private_key_path_from_env() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_snowflake_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = write_settings(tmp.path(), FULL_YAML);
    let key_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/rsa_key_pkcs1.pem");

    env::set_var("SNOWFLAKE_PRIVATE_KEY_PATH", &key_path);
    let s = ConnectionSettings::from_yaml(&path).unwrap();
    let params = s.get_connection_params(&SessionOverrides::default()).unwrap();

    let expected = key::load_private_key(Some(include_str!("../fixtures/rsa_key.p8")), None).unwrap();
    match params.auth {
        AuthMethod::PrivateKey(der) => assert_eq!(der, expected),
        other => panic!("expected private key auth, got {:?}", other),
    }

    clear_snowflake_env();
}

#[test]
fn test_garbage_private_key_is_authentication_error() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_snowflake_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = write_settings(tmp.path(), FULL_YAML);

    env::set_var(
        "SNOWFLAKE_PRIVATE_KEY_PEM",
        pem::encode(&pem::Pem::new("PRIVATE KEY", vec![0x30, 0x00])),
    );
    let s = ConnectionSettings::from_yaml(&path).unwrap();
    let err = s.get_connection_params(&SessionOverrides::default()).unwrap_err();
    assert!(matches!(err, ConnectionError::Authentication(_)));
    assert!(err.to_string().contains("Error loading private key"));

    clear_snowflake_env();
}

#[test]
fn test_manager_from_yaml() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_snowflake_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = write_settings(tmp.path(), FULL_YAML);

    let mgr = ConnectionManager::from_yaml(&path, FakeFactory::default()).unwrap();
    assert_eq!(mgr.settings().user, "svc_loader");

    let params = mgr
        .get_connection_params(&SessionOverrides::new().warehouse("BIG_WH"))
        .unwrap();
    assert_eq!(params.warehouse, "BIG_WH");
    assert_eq!(params.schema.as_deref(), Some("EVENTS"));
    assert_eq!(params.session_key().role, "LOADER");
}
