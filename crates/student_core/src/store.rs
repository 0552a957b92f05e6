//! Record store handle.
//!
//! # Responsibility
//! - Own the single SQLite connection used for every student operation.
//! - Hand out repository/service views bound to that connection.
//!
//! # Invariants
//! - A `StudentStore` is only constructed over a fully migrated schema.
//! - Callers construct one store at startup and pass it explicitly; there is
//!   no process-wide instance.

use crate::db::{open_db, open_db_in_memory};
use crate::repo::student_repo::{RepoResult, SqliteStudentRepository};
use crate::service::student_service::StudentService;
use rusqlite::Connection;
use std::path::Path;

/// Owner of the store's single writer connection.
///
/// `StudentStore` is `Send` but not `Sync`; share it across threads only
/// behind external synchronization such as a `Mutex`.
pub struct StudentStore {
    conn: Connection,
}

impl StudentStore {
    /// Opens (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::from_connection(open_db(path)?)
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Adopts an already opened connection after verifying its schema.
    pub fn from_connection(conn: Connection) -> RepoResult<Self> {
        SqliteStudentRepository::try_new(&conn)?;
        Ok(Self { conn })
    }

    pub fn repository(&self) -> SqliteStudentRepository<'_> {
        SqliteStudentRepository::from_verified(&self.conn)
    }

    pub fn service(&self) -> StudentService<SqliteStudentRepository<'_>> {
        StudentService::new(self.repository())
    }

    /// Raw connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
