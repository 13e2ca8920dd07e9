//! SQLite storage bootstrap for repository sessions.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by `SqliteSession`.
//! - Carry store-level failures unchanged to repository callers.
//!
//! # Invariants
//! - Schema creation is owned by the application, not by this crate.
//! - Store errors are wrapped, never translated or retried.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_configured_db, open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

/// Store-level failure (constraint violation, busy/locked, I/O, ...).
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
}

impl DbError {
    /// Returns the SQLite extended error code when the failure came from the engine.
    pub fn sqlite_code(&self) -> Option<rusqlite::ErrorCode> {
        match self {
            Self::Sqlite(err) => err.sqlite_error_code(),
        }
    }

    /// Whether this failure is a constraint violation (UNIQUE, NOT NULL, FK, ...).
    pub fn is_constraint_violation(&self) -> bool {
        self.sqlite_code() == Some(rusqlite::ErrorCode::ConstraintViolation)
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
