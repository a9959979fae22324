//! Opaque secret storage for connection state.
//!
//! The handshake persists a handful of small values: per-principal
//! connection keys, single-use token identifiers, encrypted revoke
//! credentials and connection metadata, plus a few site-scoped values
//! (the SSO failure counter and login log). [`SecretStore`] abstracts
//! that persistence so the crate can sit on whatever key/value storage
//! the hosting application already has.
//!
//! Writes are plain upserts: two concurrent writers to the same key are
//! last-writer-wins. Deployments that need stronger guarantees can
//! implement the trait over a store with conditional writes; nothing in
//! the core requires it.

mod memory;

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-postgres")]
mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "store-postgres")]
pub use postgres::PostgresStore;

use std::time::Duration;

use crate::error::StoreResult;

/// Well-known value names used by the handshake components.
pub mod keys {
    /// Platform-issued connection key, one per principal.
    pub const CONNECTION_KEY: &str = "connection_key";
    /// Encrypted platform revoke credential.
    pub const REVOKE_TOKEN: &str = "revoke_token";
    /// Outstanding single-use token identifier, if any.
    pub const SINGLE_USE_ID: &str = "single_use_id";
    /// Free-text location from the platform profile.
    pub const LOCATION: &str = "location";
    /// Login of the principal who approved the connection.
    pub const ADDED_BY: &str = "added_by";
    /// Unix timestamp of connection approval.
    pub const ADDED_TIME: &str = "added_time";
    /// Site-scoped failed-SSO-attempt counter (stored with a TTL).
    pub const SSO_FAILURES: &str = "sso_failures";
    /// Site-scoped bounded log of recent SSO logins.
    pub const SSO_LOG: &str = "sso_log";
}

/// Key/value persistence for connection secrets.
///
/// Values are opaque strings. Site-scoped values may carry a TTL; an
/// expired value behaves as absent on read. Implementations must be
/// shareable across request-handling threads.
pub trait SecretStore: Send + Sync {
    /// Read a per-principal value.
    fn get_value(&self, principal_id: i64, name: &str) -> StoreResult<Option<String>>;

    /// Write (upsert) a per-principal value.
    fn put_value(&self, principal_id: i64, name: &str, value: &str) -> StoreResult<()>;

    /// Delete a per-principal value. Returns whether one existed.
    fn delete_value(&self, principal_id: i64, name: &str) -> StoreResult<bool>;

    /// Find the principal holding `value` under `name`, if any.
    ///
    /// Used to resolve an unrecognized connection key back to the
    /// principal it was bound to.
    fn find_principal(&self, name: &str, value: &str) -> StoreResult<Option<i64>>;

    /// Read a site-scoped value, honoring any TTL.
    fn get_site_value(&self, name: &str) -> StoreResult<Option<String>>;

    /// Write (upsert) a site-scoped value, optionally expiring after
    /// `ttl`. Writing resets any previous TTL.
    fn put_site_value(&self, name: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Delete a site-scoped value. Returns whether one existed.
    fn delete_site_value(&self, name: &str) -> StoreResult<bool>;
}
