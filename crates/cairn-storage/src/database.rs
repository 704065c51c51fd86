// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and schema.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use cairn_core::CairnError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::schema;

/// Convert tokio-rusqlite errors into `CairnError::Storage`.
pub fn storage_err(e: tokio_rusqlite::Error) -> CairnError {
    CairnError::Storage {
        source: Box::new(e),
    }
}

/// An open, migrated SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    wal_mode: bool,
}

impl Database {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, CairnError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CairnError::Storage {
                source: Box::new(e),
            })?;
        }
        let conn = Connection::open(path).await
            .map_err(|e| storage_err(tokio_rusqlite::Error::Error(e)))?;
        let db = Self { conn, wal_mode };
        db.prepare().await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the schema applied.
    pub async fn open_in_memory() -> Result<Self, CairnError> {
        let conn = Connection::open_in_memory().await
            .map_err(|e| storage_err(tokio_rusqlite::Error::Error(e)))?;
        let db = Self {
            conn,
            wal_mode: false,
        };
        db.prepare().await?;
        Ok(db)
    }

    async fn prepare(&self) -> Result<(), CairnError> {
        let wal = self.wal_mode;
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal {
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
                }
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.busy_timeout(Duration::from_secs(5))?;
                schema::apply(conn)
            })
            .await
            .map_err(storage_err)
    }

    /// The single shared connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Whether WAL journaling was requested.
    pub fn wal_mode(&self) -> bool {
        self.wal_mode
    }

    /// Truncate the WAL file. No-op when WAL is off.
    pub async fn checkpoint(&self) -> Result<(), CairnError> {
        if !self.wal_mode {
            return Ok(());
        }
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(storage_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
