//! Repository error taxonomy.
//!
//! - `NotFound` / `MultipleFound`: lookup outcomes of `find_one_or_fail`.
//! - `Db`: store failures, propagated unchanged from the session.
//! - `UnknownField`, `EmptyValues`, `MissingPrimaryKey`, `NotPersistent`:
//!   programming errors, raised before any I/O.
//! - `InvalidData`: a stored value did not convert to the field's type.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    NotFound {
        entity: &'static str,
    },
    MultipleFound {
        entity: &'static str,
    },
    Db(DbError),
    UnknownField {
        entity: &'static str,
        field: String,
    },
    EmptyValues {
        entity: &'static str,
        operation: &'static str,
    },
    MissingPrimaryKey {
        entity: &'static str,
    },
    NotPersistent {
        entity: &'static str,
    },
    InvalidData(String),
}

impl RepoError {
    /// Whether this error is a caller bug rather than a runtime outcome.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownField { .. }
                | Self::EmptyValues { .. }
                | Self::MissingPrimaryKey { .. }
                | Self::NotPersistent { .. }
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity } => write!(f, "{entity} not found"),
            Self::MultipleFound { entity } => {
                write!(f, "multiple {entity} rows match a single-row lookup")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownField { entity, field } => {
                write!(f, "{entity} has no mapped field `{field}`")
            }
            Self::EmptyValues { entity, operation } => {
                write!(f, "{operation} on {entity} requires at least one value")
            }
            Self::MissingPrimaryKey { entity } => {
                write!(f, "{entity} declares no primary-key field")
            }
            Self::NotPersistent { entity } => {
                write!(f, "{entity} instance has no primary-key value")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
