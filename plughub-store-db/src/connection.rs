// SPDX-FileCopyrightText: 2026 Plughub Contributors
// SPDX-License-Identifier: MIT

//! Database connection management.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::{META_SCHEMA_SQL, SCHEMA_SQL, SCHEMA_VERSION};

/// Database open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only access (for serving a finished snapshot)
    ReadOnly,
    /// Read-write access (for testing or maintenance)
    ReadWrite,
    /// Create new database if it doesn't exist (for the build pipeline)
    Create,
}

/// SQLite database connection for a plugin catalog snapshot.
pub struct StoreDb {
    pub(crate) conn: Connection,
}

impl StoreDb {
    /// Open a finished snapshot read-only.
    ///
    /// Uses a URI with the immutable flag: the serving process never mutates
    /// the snapshot, and a rebuild replaces the file wholesale via rename, so
    /// an open handle keeps reading the inode it started with.
    pub fn open_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DatabaseNotFound(path.to_owned()));
        }

        let uri = format!("file:{}?immutable=1", path.display());
        let conn = Connection::open_with_flags(
            &uri,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| Error::DatabaseOpen {
            path: path.to_owned(),
            source: e,
        })?;

        let db = Self { conn };
        db.check_schema_version()?;

        debug!("Opened snapshot at {}", path.display());
        Ok(db)
    }

    /// Open or create a database at a custom path.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
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
        let db = Self { conn };

        if mode == OpenMode::Create {
            db.configure_pragmas()?;
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

    /// Configure SQLite pragmas for snapshot construction.
    ///
    /// Rollback journal rather than WAL: the finished file is installed via
    /// rename and must be a single self-contained file.
    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode = DELETE;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;
        Ok(())
    }

    /// Create the database schema (catalog + meta tables).
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        self.conn.execute_batch(META_SCHEMA_SQL)?;
        debug!("Created database schema");
        Ok(())
    }

    /// Get raw connection (for advanced usage).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get mutable raw connection (for transactions).
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Check if the database has the expected schema tables.
    pub fn has_schema(&self) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='plugins'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Reject snapshots written by an incompatible schema.
    fn check_schema_version(&self) -> Result<()> {
        match self.schema_version()? {
            Some(found) if found != SCHEMA_VERSION => Err(Error::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found,
            }),
            _ => Ok(()),
        }
    }

    /// Schema version recorded in the meta table, if any.
    pub fn schema_version(&self) -> Result<Option<i32>> {
        Ok(self
            .get_meta("schema_version")?
            .and_then(|v| v.parse().ok()))
    }
}
