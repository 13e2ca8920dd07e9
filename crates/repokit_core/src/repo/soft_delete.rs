//! Soft-delete policy layered over a base repository.
//!
//! # Responsibility
//! - Scope every read/update to rows whose deletion stamp is NULL.
//! - Turn `delete` into an update stamping the deletion column.
//!
//! # Invariants
//! - The scope condition is prepended, so it is always the first conjunct.
//! - Already-deleted rows keep their original stamp on a second delete.
//! - Writes of whole instances (`save`, `remove`) are not scoped.

use crate::model::entity::{Attrs, Entity};
use crate::query::builder::{QueryBuilder, SelectQuery};
use crate::query::filter::{Condition, Filter};
use crate::query::statement::{Assignment, NOW_EPOCH_MS};
use crate::repo::error::RepoResult;
use crate::repo::identity::Identity;
use crate::repo::repository::{Removable, Repository, Saveable};
use crate::session::Session;
use rusqlite::types::Value;

/// Repository wrapper hiding rows whose `column` is stamped.
pub struct SoftDeleteRepository<'s, E, S, Q = SelectQuery> {
    inner: Repository<'s, E, S, Q>,
    column: &'static str,
}

impl<E, S, Q> Clone for SoftDeleteRepository<'_, E, S, Q> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, S, Q> Copy for SoftDeleteRepository<'_, E, S, Q> {}

impl<'s, E, S, Q> SoftDeleteRepository<'s, E, S, Q>
where
    E: Entity,
    S: Session,
    Q: QueryBuilder,
{
    pub fn new(inner: Repository<'s, E, S, Q>, column: &'static str) -> Self {
        Self { inner, column }
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    /// Base repository ignoring the policy (raw lookups, physical deletes).
    pub fn with_deleted(&self) -> &Repository<'s, E, S, Q> {
        &self.inner
    }

    /// `filter` restricted to live rows.
    pub fn scope(&self, filter: &Filter) -> Filter {
        filter.clone().prepend(Condition::is_null(self.column))
    }

    pub fn instantiate(&self, attrs: Attrs) -> RepoResult<E> {
        self.inner.instantiate(attrs)
    }

    pub fn apply_attrs<'a>(&self, instance: &'a mut E, attrs: Attrs) -> RepoResult<&'a mut E> {
        self.inner.apply_attrs(instance, attrs)
    }

    pub fn has_identity(&self, instance: &E) -> RepoResult<bool> {
        self.inner.has_identity(instance)
    }

    pub fn identity(&self, instance: &E) -> RepoResult<Option<Identity>> {
        self.inner.identity(instance)
    }

    pub fn count(&self, filter: &Filter) -> RepoResult<u64> {
        self.inner.count(&self.scope(filter))
    }

    pub fn update(&self, filter: &Filter, values: Attrs) -> RepoResult<usize> {
        self.inner.update(&self.scope(filter), values)
    }

    /// Stamps matching live rows as deleted and commits.
    pub fn delete(&self, filter: &Filter) -> RepoResult<usize> {
        self.inner.update_with(
            &self.scope(filter),
            &[(self.column.to_string(), Assignment::Expr(NOW_EPOCH_MS))],
        )
    }

    /// Clears the stamp on matching deleted rows and commits.
    pub fn restore(&self, filter: &Filter) -> RepoResult<usize> {
        let deleted = filter.clone().prepend(Condition::is_not_null(self.column));
        self.inner.update_with(
            &deleted,
            &[(self.column.to_string(), Assignment::Value(Value::Null))],
        )
    }

    /// Physically removes matching rows, live or stamped.
    pub fn force_delete(&self, filter: &Filter) -> RepoResult<usize> {
        self.inner.delete(filter)
    }

    pub fn find(&self, filter: &Filter) -> RepoResult<Vec<E>> {
        self.inner.find(&self.scope(filter))
    }

    pub fn find_one(&self, filter: &Filter) -> RepoResult<Option<E>> {
        self.inner.find_one(&self.scope(filter))
    }

    pub fn find_one_or_fail(&self, filter: &Filter) -> RepoResult<E> {
        self.inner.find_one_or_fail(&self.scope(filter))
    }

    pub fn remove<T: Removable<E>>(&self, target: T) -> RepoResult<()> {
        self.inner.remove(target)
    }

    pub fn pre_save<T: Saveable<E>>(&self, target: T) -> RepoResult<T::Output> {
        self.inner.pre_save(target)
    }

    pub fn save<T: Saveable<E>>(&self, target: T) -> RepoResult<T::Output> {
        self.inner.save(target)
    }
}
