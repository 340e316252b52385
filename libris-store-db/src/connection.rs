// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Database connection management.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use tracing::debug;

use crate::error::{Error, Result};
use crate::records::Records;
use crate::schema::{SCHEMA_SQL, SCHEMA_VERSION};

/// Database open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only access (reporting, inspection)
    ReadOnly,
    /// Read-write access to an existing database
    ReadWrite,
    /// Create new database if it doesn't exist
    Create,
}

/// Default time a connection waits for another writer before giving up.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite connection holding the library collections.
pub struct StoreDb {
    pub(crate) conn: Connection,
}

impl std::fmt::Debug for StoreDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreDb")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl StoreDb {
    /// Open or create a database at a custom path.
    ///
    /// In `Create` mode the schema is created if it is missing.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        Self::open_with_timeout(path, mode, DEFAULT_BUSY_TIMEOUT)
    }

    /// Like [`StoreDb::open`] with an explicit busy timeout.
    pub fn open_with_timeout<P: AsRef<Path>>(
        path: P,
        mode: OpenMode,
        busy_timeout: Duration,
    ) -> Result<Self> {
        let path = path.as_ref();
        let flags = match mode {
            OpenMode::ReadOnly => {
                if !path.exists() {
                    return Err(Error::DatabaseNotFound(path.to_owned()));
                }
                OpenFlags::SQLITE_OPEN_READ_ONLY
            }
            OpenMode::ReadWrite => {
                if !path.exists() {
                    return Err(Error::DatabaseNotFound(path.to_owned()));
                }
                OpenFlags::SQLITE_OPEN_READ_WRITE
            }
            OpenMode::Create => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        };

        let conn = Connection::open_with_flags(path, flags).map_err(|e| Error::DatabaseOpen {
            path: path.to_owned(),
            source: e,
        })?;
        conn.busy_timeout(busy_timeout)?;
        let db = Self { conn };

        if mode != OpenMode::ReadOnly {
            db.configure_pragmas()?;
        }
        if mode == OpenMode::Create {
            db.create_schema()?;
        }

        debug!("Opened database at {} ({:?})", path.display(), mode);
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// The database is initialized with the full schema.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.configure_pragmas()?;
        db.create_schema()?;
        debug!("Created in-memory database");
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;
        Ok(())
    }

    /// Create the database schema and stamp its version.
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        debug!("Created database schema");
        Ok(())
    }

    /// Check if the database has the library tables.
    pub fn has_schema(&self) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('books', 'students', 'issues')",
            [],
            |row| row.get(0),
        )?;
        Ok(count == 3)
    }

    /// Schema version recorded in the database file.
    pub fn schema_version(&self) -> Result<i32> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Get raw connection (for advanced usage).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `work` as one atomic unit.
    ///
    /// The transaction is opened with `BEGIN IMMEDIATE`, so the write lock is
    /// taken before the first read and two units of work never interleave
    /// their read-check-write sequences. `Ok` commits; `Err` rolls back and
    /// nothing `work` wrote is kept.
    pub fn unit_of_work<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&Records<'_>) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = work(&Records::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }

    /// Run read-only `work` over a consistent snapshot.
    pub fn read<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&Records<'_>) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = work(&Records::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }
}
