//! Tests for ConnectionManager: session caching, query tags and teardown.

use serde_json::json;
use snowglue_connection::*;

use crate::support::{same, FakeFactory};

fn password_settings() -> ConnectionSettings {
    ConnectionSettings {
        password: Some("pw".into()),
        database: Some("SALES".into()),
        ..ConnectionSettings::new("acme-xy123", "svc")
    }
}

fn manager(factory: FakeFactory) -> ConnectionManager<FakeFactory> {
    ConnectionManager::new(password_settings(), factory)
}

#[tokio::test]
async fn test_cached_session_is_reused() {
    let mut mgr = manager(FakeFactory::default());

    let first = mgr.get_session(&SessionRequest::new()).await.unwrap();
    let second = mgr.get_session(&SessionRequest::new()).await.unwrap();

    assert!(same(&first, &second));
    assert_eq!(mgr.factory().created(), 1);
    assert_eq!(mgr.cached_session_count(), 1);
}

#[tokio::test]
async fn test_distinct_keys_get_distinct_sessions() {
    let mut mgr = manager(FakeFactory::default());

    let default = mgr.get_session(&SessionRequest::new()).await.unwrap();
    let analyst = mgr.get_session(&SessionRequest::new().role("ANALYST")).await.unwrap();
    let other_db = mgr.get_session(&SessionRequest::new().database("HR")).await.unwrap();

    assert!(!same(&default, &analyst));
    assert!(!same(&default, &other_db));
    assert_eq!(mgr.cached_session_count(), 3);
    assert_eq!(analyst.params.role, "ANALYST");
    assert_eq!(other_db.params.database.as_deref(), Some("HR"));
}

#[tokio::test]
async fn test_schema_is_not_part_of_the_key() {
    let mut mgr = manager(FakeFactory::default());

    let first = mgr.get_session(&SessionRequest::new().schema("PUBLIC")).await.unwrap();
    assert_eq!(first.params.schema.as_deref(), Some("PUBLIC"));

    let second = mgr.get_session(&SessionRequest::new().schema("STAGING")).await.unwrap();
    assert!(same(&first, &second));
    assert_eq!(*second.schemas.lock().unwrap(), vec!["STAGING".to_string()]);
}

#[tokio::test]
async fn test_schema_switch_failure_is_session_error() {
    let mut mgr = manager(FakeFactory::default());
    mgr.get_session(&SessionRequest::new()).await.unwrap();

    let err = mgr
        .get_session(&SessionRequest::new().schema("MISSING"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ConnectionError::Session(_)));
}

#[tokio::test]
async fn test_use_cache_false_always_creates() {
    let mut mgr = manager(FakeFactory::default());
    let req = SessionRequest::new().use_cache(false);

    let first = mgr.get_session(&req).await.unwrap();
    let second = mgr.get_session(&req).await.unwrap();

    assert!(!same(&first, &second));
    assert_eq!(mgr.factory().created(), 2);
    assert_eq!(mgr.cached_session_count(), 0);
}

#[tokio::test]
async fn test_use_cache_false_ignores_existing_entry() {
    let mut mgr = manager(FakeFactory::default());
    let cached = mgr.get_session(&SessionRequest::new()).await.unwrap();
    let fresh = mgr.get_session(&SessionRequest::new().use_cache(false)).await.unwrap();

    assert!(!same(&cached, &fresh));
    assert_eq!(mgr.cached_session_count(), 1);
}

#[tokio::test]
async fn test_no_credentials_fails_before_sdk() {
    let mut mgr = ConnectionManager::new(ConnectionSettings::new("a", "u"), FakeFactory::default());

    let err = mgr.get_session(&SessionRequest::new()).await.err().unwrap();
    assert!(matches!(err, ConnectionError::Authentication(_)));
    assert_eq!(mgr.factory().created(), 0);
    assert_eq!(mgr.cached_session_count(), 0);
}

#[tokio::test]
async fn test_sdk_failure_is_wrapped() {
    let mut mgr = manager(FakeFactory {
        fail_create: true,
        ..FakeFactory::default()
    });

    let err = mgr.get_session(&SessionRequest::new()).await.err().unwrap();
    assert!(matches!(err, ConnectionError::Authentication(_)));
    assert!(err.to_string().contains("Failed to create session"));
    assert!(err.to_string().contains("incorrect username or password"));
    assert_eq!(mgr.cached_session_count(), 0);
}

#[tokio::test]
async fn test_default_query_tag_applied() {
    let mut mgr = manager(FakeFactory::default());
    let session = mgr.get_session(&SessionRequest::new()).await.unwrap();

    let tag = session.last_tag().unwrap();
    assert_eq!(tag["origin"], "snowpark_session");
    assert_eq!(tag["name"], "svc");
    assert_eq!(tag["attributes"]["source"], "SALES");
}

#[tokio::test]
async fn test_request_tag_overrides_and_reapplies_on_cache_hit() {
    let mut mgr = manager(FakeFactory::default());
    let session = mgr.get_session(&SessionRequest::new()).await.unwrap();

    let custom = json!({ "job": "nightly-refresh" });
    mgr.get_session(&SessionRequest::new().query_tag(custom.clone()))
        .await
        .unwrap();

    assert_eq!(session.tags.lock().unwrap().len(), 2);
    assert_eq!(session.last_tag(), Some(custom));
}

#[tokio::test]
async fn test_empty_request_tag_falls_back_to_settings_tag() {
    let mut mgr = manager(FakeFactory::default());
    let expected = mgr.settings().query_tag();

    let session = mgr
        .get_session(&SessionRequest::new().query_tag(json!({})))
        .await
        .unwrap();
    assert_eq!(session.last_tag(), Some(expected.clone()));

    mgr.get_session(&SessionRequest::new().query_tag(json!("")))
        .await
        .unwrap();
    assert_eq!(session.last_tag(), Some(expected));
}

#[tokio::test]
async fn test_tag_failure_does_not_fail_session() {
    let mut mgr = manager(FakeFactory {
        fail_tag: true,
        ..FakeFactory::default()
    });

    let session = mgr.get_session(&SessionRequest::new()).await.unwrap();
    assert!(session.last_tag().is_none());
    assert_eq!(mgr.cached_session_count(), 1);
}

#[tokio::test]
async fn test_close_all_sessions_survives_close_failure() {
    let mut mgr = manager(FakeFactory {
        fail_close_role: Some("BROKEN".into()),
        ..FakeFactory::default()
    });

    let ok = mgr.get_session(&SessionRequest::new()).await.unwrap();
    let broken = mgr.get_session(&SessionRequest::new().role("BROKEN")).await.unwrap();
    assert_eq!(mgr.cached_session_count(), 2);

    mgr.close_all_sessions().await;

    assert_eq!(mgr.cached_session_count(), 0);
    assert!(ok.is_closed());
    assert!(broken.is_closed());

    // A fresh session is created after the cache is cleared.
    let again = mgr.get_session(&SessionRequest::new()).await.unwrap();
    assert!(!same(&ok, &again));
}

#[tokio::test]
async fn test_cached_sessions_lists_keys() {
    let mut mgr = manager(FakeFactory::default());
    mgr.get_session(&SessionRequest::new().role("ANALYST")).await.unwrap();

    let cached = mgr.cached_sessions();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].key.role, "ANALYST");
    assert_eq!(cached[0].key.warehouse, "DS_WH_XS");
    assert_eq!(cached[0].key.database.as_deref(), Some("SALES"));
}
