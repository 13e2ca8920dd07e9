//! Transactional session contract.
//!
//! # Responsibility
//! - Execute rendered statements and materialize rows as `Attrs` records.
//! - Track pending inserts/deletes until flush or commit (unit of work).
//! - Own transaction boundaries (BEGIN on first write, COMMIT, ROLLBACK).
//!
//! # Invariants
//! - A session is used by one thread at a time; implementations may rely on
//!   that and use interior mutability.
//! - Store failures are returned unchanged as `RepoError::Db`.
//! - Records handed back by `flush`/`merge` reflect the stored row, including
//!   store-assigned values.

use crate::model::entity::{Attrs, EntityMeta};
use crate::query::statement::Statement;
use crate::repo::error::RepoResult;
use rusqlite::types::Value;

mod sqlite;

pub use sqlite::SqliteSession;

/// Handle for one pending insert returned by `attach_new`/`attach_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attached(pub(crate) u64);

/// Unit-of-work session over a transactional store.
pub trait Session {
    /// Runs a row-returning statement.
    fn execute_query(&self, statement: &Statement) -> RepoResult<Vec<Attrs>>;

    /// First column of the first row, or `None` when no row is returned.
    fn scalar(&self, statement: &Statement) -> RepoResult<Option<Value>>;

    /// Runs an UPDATE/DELETE style statement and returns the affected row count.
    fn execute_statement(&self, statement: &Statement) -> RepoResult<usize>;

    /// Queues `record` for insertion into `meta`'s table.
    fn attach_new(&self, meta: &'static EntityMeta, record: Attrs) -> Attached;

    /// Queues every record, preserving order.
    fn attach_all(&self, meta: &'static EntityMeta, records: Vec<Attrs>) -> Vec<Attached> {
        records
            .into_iter()
            .map(|record| self.attach_new(meta, record))
            .collect()
    }

    /// Reconciles `record` with the stored row sharing its primary key.
    ///
    /// Changed fields are written; a missing row is inserted. Returns the
    /// stored row after reconciliation.
    fn merge(&self, meta: &'static EntityMeta, record: Attrs) -> RepoResult<Attrs>;

    /// Sends pending writes to the store without committing.
    ///
    /// With `Some(handles)` only those pending inserts are flushed, in handle
    /// order; `None` flushes everything pending. Returns the stored records
    /// of the flushed inserts in execution order.
    fn flush(&self, handles: Option<&[Attached]>) -> RepoResult<Vec<Attrs>>;

    /// Queues deletion of the row identified by `record`'s primary key.
    fn delete(&self, meta: &'static EntityMeta, record: &Attrs) -> RepoResult<()>;

    /// Flushes pending writes and commits the open transaction.
    fn commit(&self) -> RepoResult<()>;

    /// Discards pending writes and rolls back the open transaction.
    fn rollback(&self) -> RepoResult<()>;

    fn in_transaction(&self) -> bool;
}
