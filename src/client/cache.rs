//! Explicit key-value query cache.
//!
//! Entries are keyed by resource plus serialized parameters. Consistency is
//! invalidation-based: mutations drop the affected entries so the next read
//! refetches. There is no ambient global; callers hold the handle and pass
//! it to whatever layer needs it.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Cache key: a resource name plus a stable parameter string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: String,
    pub params: String,
}

impl QueryKey {
    pub fn new(resource: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: params.into(),
        }
    }
}

/// In-memory query cache storing JSON values.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, serde_json::Value>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed cache lookup. An entry that fails to deserialize is treated as
    /// a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Store a value under a key, replacing any previous entry.
    pub fn put<T: Serialize>(&self, key: QueryKey, value: &T) {
        let Ok(json) = serde_json::to_value(value) else {
            return;
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, json);
    }

    /// Drop every entry belonging to a resource, list and item keys alike.
    pub fn invalidate_resource(&self, resource: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|key, _| key.resource != resource);
    }

    /// Drop a single entry.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
