//! In-memory secret store.
//!
//! Suitable for tests, demos and single-process deployments. TTLs are
//! tracked with monotonic instants and expired entries are dropped
//! lazily on read.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::SecretStore;
use crate::error::StoreResult;

struct SiteEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl SiteEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Thread-safe in-memory [`SecretStore`].
#[derive(Default)]
pub struct MemoryStore {
    principal_values: RwLock<HashMap<(i64, String), String>>,
    site_values: RwLock<HashMap<String, SiteEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemoryStore {
    fn get_value(&self, principal_id: i64, name: &str) -> StoreResult<Option<String>> {
        Ok(self
            .principal_values
            .read()
            .unwrap()
            .get(&(principal_id, name.to_string()))
            .cloned())
    }

    fn put_value(&self, principal_id: i64, name: &str, value: &str) -> StoreResult<()> {
        self.principal_values
            .write()
            .unwrap()
            .insert((principal_id, name.to_string()), value.to_string());
        Ok(())
    }

    fn delete_value(&self, principal_id: i64, name: &str) -> StoreResult<bool> {
        Ok(self
            .principal_values
            .write()
            .unwrap()
            .remove(&(principal_id, name.to_string()))
            .is_some())
    }

    fn find_principal(&self, name: &str, value: &str) -> StoreResult<Option<i64>> {
        Ok(self
            .principal_values
            .read()
            .unwrap()
            .iter()
            .find(|((_, n), v)| n == name && v.as_str() == value)
            .map(|((id, _), _)| *id))
    }

    fn get_site_value(&self, name: &str) -> StoreResult<Option<String>> {
        // Fast path: read lock, return live values.
        {
            let values = self.site_values.read().unwrap();
            match values.get(name) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
                _ => {}
            }
        }
        // Entry exists but has expired; drop it.
        self.site_values.write().unwrap().remove(name);
        Ok(None)
    }

    fn put_site_value(&self, name: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let entry = SiteEntry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.site_values
            .write()
            .unwrap()
            .insert(name.to_string(), entry);
        Ok(())
    }

    fn delete_site_value(&self, name: &str) -> StoreResult<bool> {
        Ok(self.site_values.write().unwrap().remove(name).is_some())
    }
}
