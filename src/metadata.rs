//! SQLite-backed run metadata lookups.

use anyhow::{Context, Result};
use async_trait::async_trait;
use mgf_common::{MetadataLookup, UNKNOWN_RUN_ID};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::DatabaseConfig;

/// Async-safe handle to the metadata database.
///
/// The connection sits behind `Arc<Mutex>` and every query runs on tokio's
/// blocking pool, so the filter and all units can share one handle.
#[derive(Clone)]
pub struct SqliteMetadata {
    conn: Arc<Mutex<Connection>>,
    run_id_query: Arc<str>,
    ms2_count_query: Arc<str>,
}

impl SqliteMetadata {
    /// Open an existing database. A missing file is an error, not a new database.
    pub fn open(path: &Path, config: &DatabaseConfig) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("Failed to open metadata database {}", path.display()))?;
        Ok(Self::with_connection(conn, config))
    }

    pub fn open_in_memory(config: &DatabaseConfig) -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory metadata database")?;
        Ok(Self::with_connection(conn, config))
    }

    fn with_connection(conn: Connection, config: &DatabaseConfig) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            run_id_query: Arc::from(config.run_id_query.as_str()),
            ms2_count_query: Arc::from(config.ms2_count_query.as_str()),
        }
    }

    /// Run a closure against the connection on a blocking thread.
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("Metadata connection lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("Metadata query task panicked")?
    }

    /// First column of the first row, or `default` when there is no row.
    async fn query_i64(&self, sql: Arc<str>, basename: &str, default: i64) -> Result<i64> {
        let basename = basename.to_string();
        self.call(move |conn| {
            let value: Option<Option<i64>> = conn
                .query_row(&sql, params![basename], |row| row.get(0))
                .optional()
                .with_context(|| format!("Metadata query failed for {}", basename))?;
            Ok(value.flatten().unwrap_or(default))
        })
        .await
    }
}

#[async_trait]
impl MetadataLookup for SqliteMetadata {
    async fn run_id(&self, basename: &str) -> Result<i64> {
        self.query_i64(self.run_id_query.clone(), basename, UNKNOWN_RUN_ID)
            .await
    }

    async fn ms2_count(&self, basename: &str) -> Result<i64> {
        self.query_i64(self.ms2_count_query.clone(), basename, 0)
            .await
    }
}
