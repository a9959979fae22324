//! SQLite secret store implementation.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use super::SecretStore;
use crate::error::{StoreError, StoreResult};

/// SQLite-backed secret store.
///
/// # Example
///
/// ```rust,ignore
/// use proconnect::store::SqliteStore;
///
/// // In-memory database
/// let store = SqliteStore::in_memory()?;
///
/// // File-based database
/// let store = SqliteStore::new("secrets.db")?;
/// ```
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Create a new SQLite secret store with the given database path.
    pub fn new(path: &str) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager)?;

        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite secret store.
    pub fn in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory();
        // A single connection so every handle sees the same memory db.
        let pool = Pool::builder().max_size(1).build(manager)?;

        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    /// Create from an existing r2d2 pool.
    pub fn from_pool(pool: Pool<SqliteConnectionManager>) -> StoreResult<Self> {
        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS principal_secrets (
                principal_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (principal_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_principal_secrets_name_value
                ON principal_secrets(name, value);

            CREATE TABLE IF NOT EXISTS site_secrets (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER
            );
            "#,
        )?;
        Ok(())
    }

    /// Get a connection from the pool.
    fn conn(&self) -> StoreResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

impl SecretStore for SqliteStore {
    fn get_value(&self, principal_id: i64, name: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT value FROM principal_secrets WHERE principal_id = ?1 AND name = ?2",
        )?;

        let result = stmt.query_row(params![principal_id, name], |row| row.get(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    fn put_value(&self, principal_id: i64, name: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO principal_secrets (principal_id, name, value)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(principal_id, name) DO UPDATE SET value = excluded.value
            "#,
            params![principal_id, name, value],
        )?;
        Ok(())
    }

    fn delete_value(&self, principal_id: i64, name: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM principal_secrets WHERE principal_id = ?1 AND name = ?2",
            params![principal_id, name],
        )?;
        Ok(rows > 0)
    }

    fn find_principal(&self, name: &str, value: &str) -> StoreResult<Option<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT principal_id FROM principal_secrets WHERE name = ?1 AND value = ?2 LIMIT 1",
        )?;

        let result = stmt.query_row(params![name, value], |row| row.get(0));
        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    fn get_site_value(&self, name: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT value, expires_at FROM site_secrets WHERE name = ?1",
        )?;

        let result = stmt.query_row(params![name], |row| {
            let value: String = row.get(0)?;
            let expires_at: Option<i64> = row.get(1)?;
            Ok((value, expires_at))
        });

        match result {
            Ok((value, expires_at)) => {
                if expires_at.is_some_and(|at| Self::now() >= at) {
                    conn.execute("DELETE FROM site_secrets WHERE name = ?1", params![name])?;
                    Ok(None)
                } else {
                    Ok(Some(value))
                }
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    fn put_site_value(&self, name: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let conn = self.conn()?;
        let expires_at = ttl.map(|ttl| Self::now() + ttl.as_secs() as i64);
        conn.execute(
            r#"
            INSERT INTO site_secrets (name, value, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
            params![name, value, expires_at],
        )?;
        Ok(())
    }

    fn delete_site_value(&self, name: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM site_secrets WHERE name = ?1", params![name])?;
        Ok(rows > 0)
    }
}
