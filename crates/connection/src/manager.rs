//! Session management on top of [`ConnectionSettings`].
//!
//! Provides [`ConnectionManager`], which resolves per-call overrides, opens
//! sessions through a [`SessionFactory`], tags them for attribution and keeps
//! them in a [`SessionCache`] owned by the manager instance.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CachedSession, SessionCache};
use crate::error::ConnectionError;
use crate::params::{ConnectionParams, SessionOverrides};
use crate::session::{Session, SessionFactory};
use crate::settings::ConnectionSettings;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Options for [`ConnectionManager::get_session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub overrides: SessionOverrides,
    /// Reuse and store sessions in the cache (default `true`).
    pub use_cache: bool,
    /// Tag for this request; falls back to the settings' tag when unset or empty.
    pub query_tag: Option<serde_json::Value>,
}

impl Default for SessionRequest {
    fn default() -> Self {
        Self {
            overrides: SessionOverrides::default(),
            use_cache: true,
            query_tag: None,
        }
    }
}

impl SessionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(mut self, overrides: SessionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.overrides.role = Some(role.into());
        self
    }

    pub fn warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.overrides.warehouse = Some(warehouse.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.overrides.database = Some(database.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.overrides.schema = Some(schema.into());
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn query_tag(mut self, tag: serde_json::Value) -> Self {
        self.query_tag = Some(tag);
        self
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Owns connection settings, an SDK session factory and the session cache.
///
/// Cache mutation goes through `&mut self`; share a manager across tasks by
/// wrapping it in a lock at the call site.
pub struct ConnectionManager<F: SessionFactory> {
    settings: ConnectionSettings,
    factory: F,
    cache: SessionCache<F::Session>,
}

impl<F: SessionFactory> ConnectionManager<F> {
    pub fn new(settings: ConnectionSettings, factory: F) -> Self {
        info!(
            account = %settings.account,
            user = %settings.user,
            role = %settings.role,
            warehouse = %settings.warehouse,
            auth = settings.auth_kind().unwrap_or("none"),
            "ConnectionManager initialised"
        );
        Self {
            settings,
            factory,
            cache: SessionCache::new(),
        }
    }

    /// Load settings with [`ConnectionSettings::from_yaml`] and wrap them.
    pub fn from_yaml(path: impl AsRef<Path>, factory: F) -> Result<Self, ConnectionError> {
        Ok(Self::new(ConnectionSettings::from_yaml(path)?, factory))
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// See [`ConnectionSettings::get_connection_params`].
    pub fn get_connection_params(&self, overrides: &SessionOverrides) -> Result<ConnectionParams, ConnectionError> {
        self.settings.get_connection_params(overrides)
    }

    /// Get or create a session.
    ///
    /// With `use_cache`, a session already cached under the resolved
    /// (role, warehouse, database) is returned after switching to the
    /// requested schema, if any. Otherwise a new session is created and, with
    /// `use_cache`, stored. The query tag is applied in both cases; tagging
    /// failures are logged and do not fail the call.
    pub async fn get_session(&mut self, request: &SessionRequest) -> Result<Arc<F::Session>, ConnectionError> {
        let key = self.settings.session_key(&request.overrides);
        let tag = request
            .query_tag
            .clone()
            .filter(|t| !is_empty_tag(t))
            .unwrap_or_else(|| self.settings.query_tag());

        if request.use_cache {
            if let Some(session) = self.cache.get(&key) {
                if let Some(schema) = request.overrides.schema.as_deref().filter(|s| !s.is_empty()) {
                    session.use_schema(schema).await.map_err(|e| {
                        ConnectionError::Session(format!("failed to use schema {}: {}", schema, e))
                    })?;
                }
                apply_query_tag(session.as_ref(), &tag).await;
                debug!(key = %key, session = session.id(), "Reusing cached session");
                return Ok(session);
            }
        }

        let params = self.settings.get_connection_params(&request.overrides)?;
        let session = self.factory.create(&params).await.map_err(|e| {
            ConnectionError::Authentication(format!("Failed to create session: {}", e))
        })?;
        let session = Arc::new(session);

        info!(
            role = %key.role,
            warehouse = %key.warehouse,
            database = ?key.database,
            session = session.id(),
            "Created new session"
        );

        apply_query_tag(session.as_ref(), &tag).await;

        if request.use_cache {
            info!(key = %key, "Cached new session");
            self.cache.insert(key, Arc::clone(&session));
        }

        Ok(session)
    }

    /// Close every cached session and empty the cache.
    ///
    /// Individual close failures are logged, not returned.
    pub async fn close_all_sessions(&mut self) {
        for (key, session) in self.cache.drain() {
            match session.close().await {
                Ok(()) => debug!(key = %key, session = session.id(), "Closed session"),
                Err(e) => warn!(key = %key, session = session.id(), error = %e, "Error closing session"),
            }
        }
    }

    pub fn cached_session_count(&self) -> usize {
        self.cache.len()
    }

    pub fn cached_sessions(&self) -> Vec<CachedSession> {
        self.cache.entries()
    }
}

/// `null`, `{}` and `""` count as no tag.
fn is_empty_tag(tag: &serde_json::Value) -> bool {
    match tag {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

async fn apply_query_tag<S: Session + ?Sized>(session: &S, tag: &serde_json::Value) {
    match session.set_query_tag(tag).await {
        Ok(()) => info!(session = session.id(), tag = %tag, "Set query tag"),
        Err(e) => warn!(session = session.id(), error = %e, "Failed to set query tag"),
    }
}
