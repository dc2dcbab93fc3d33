use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::params::SessionKey;

struct CacheEntry<S> {
    session: Arc<S>,
    created_at: DateTime<Utc>,
}

/// Description of one cached session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedSession {
    pub key: SessionKey,
    pub created_at: DateTime<Utc>,
}

/// Sessions keyed by (role, warehouse, database).
///
/// Entries live until [`drain`](Self::drain) or [`clear`](Self::clear); there
/// is no expiry.
pub struct SessionCache<S> {
    entries: HashMap<SessionKey, CacheEntry<S>>,
}

impl<S> Default for SessionCache<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S> SessionCache<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SessionKey) -> Option<Arc<S>> {
        self.entries.get(key).map(|e| Arc::clone(&e.session))
    }

    /// Store `session` under `key`, returning the handle it replaced.
    pub fn insert(&mut self, key: SessionKey, session: Arc<S>) -> Option<Arc<S>> {
        self.entries
            .insert(
                key,
                CacheEntry {
                    session,
                    created_at: Utc::now(),
                },
            )
            .map(|old| old.session)
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached keys with creation times, oldest first.
    pub fn entries(&self) -> Vec<CachedSession> {
        let mut out: Vec<CachedSession> = self
            .entries
            .iter()
            .map(|(key, e)| CachedSession {
                key: key.clone(),
                created_at: e.created_at,
            })
            .collect();
        out.sort_by_key(|c| c.created_at);
        out
    }

    /// Remove and return every cached session.
    pub fn drain(&mut self) -> Vec<(SessionKey, Arc<S>)> {
        self.entries
            .drain()
            .map(|(key, e)| (key, e.session))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
