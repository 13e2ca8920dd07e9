//! Generic repository over one entity type.
//!
//! # Responsibility
//! - Expose CRUD and batch-save operations for any `Entity`.
//! - Choose insert vs merge for single saves from the instance's identity.
//! - Route single instances and slices to distinct save/remove paths.
//!
//! # Invariants
//! - `save`, `update`, `delete` and `remove` commit before returning;
//!   `pre_save` flushes but leaves the transaction open.
//! - Batch `pre_save` is insert-only; identity is checked per call only on
//!   the single-instance path.
//! - The binding holds nothing but the session reference.

use crate::model::entity::{Attrs, Entity, EntityMeta};
use crate::query::builder::{QueryBuilder, SelectQuery};
use crate::query::filter::Filter;
use crate::query::statement::{self, Assignment, SelectOptions};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::identity::{self, Identity};
use crate::session::Session;
use log::debug;
use rusqlite::types::Value;
use std::collections::HashSet;
use std::marker::PhantomData;

/// Repository binding of entity type `E`, session `S` and query builder `Q`.
///
/// Obtain one through `inject_repository` or `RepositoryFactory`.
pub struct Repository<'s, E, S, Q = SelectQuery> {
    session: &'s S,
    _marker: PhantomData<fn() -> (E, Q)>,
}

impl<E, S, Q> Clone for Repository<'_, E, S, Q> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, S, Q> Copy for Repository<'_, E, S, Q> {}

impl<'s, E, S, Q> Repository<'s, E, S, Q>
where
    E: Entity,
    S: Session,
    Q: QueryBuilder,
{
    pub(crate) fn bind(session: &'s S) -> Self {
        Self {
            session,
            _marker: PhantomData,
        }
    }

    pub fn session(&self) -> &'s S {
        self.session
    }

    pub fn meta(&self) -> &'static EntityMeta {
        E::meta()
    }

    /// Fresh query builder scoped to this entity's table.
    pub fn query(&self) -> Q {
        Q::for_entity(E::meta())
    }

    /// Runs a query built by `query()`.
    pub fn fetch(&self, query: &Q) -> RepoResult<Vec<E>> {
        let statement = query.to_statement()?;
        self.session
            .execute_query(&statement)?
            .into_iter()
            .map(E::from_attrs)
            .collect()
    }

    /// Builds an untracked instance from `attrs`. No I/O.
    pub fn instantiate(&self, attrs: Attrs) -> RepoResult<E> {
        E::from_attrs(attrs)
    }

    /// Assigns `attrs` onto `instance` in place. No I/O.
    pub fn apply_attrs<'a>(&self, instance: &'a mut E, attrs: Attrs) -> RepoResult<&'a mut E> {
        instance.assign(attrs)?;
        Ok(instance)
    }

    pub fn has_identity(&self, instance: &E) -> RepoResult<bool> {
        identity::has_identity(instance)
    }

    pub fn identity(&self, instance: &E) -> RepoResult<Option<Identity>> {
        identity::resolve_identity(instance)
    }

    pub fn count(&self, filter: &Filter) -> RepoResult<u64> {
        let statement = statement::count(E::meta(), filter)?;
        match self.session.scalar(&statement)? {
            Some(Value::Integer(total)) => Ok(u64::try_from(total).unwrap_or(0)),
            Some(other) => Err(RepoError::InvalidData(format!(
                "count returned non-integer value {other:?}"
            ))),
            None => Ok(0),
        }
    }

    /// Updates every matching row with `values` and commits.
    ///
    /// Returns the number of rows changed.
    pub fn update(&self, filter: &Filter, values: Attrs) -> RepoResult<usize> {
        let changes = values
            .into_iter()
            .map(|(field, value)| (field, Assignment::Value(value)))
            .collect::<Vec<_>>();
        self.update_with(filter, &changes)
    }

    pub(crate) fn update_with(
        &self,
        filter: &Filter,
        changes: &[(String, Assignment)],
    ) -> RepoResult<usize> {
        let meta = E::meta();
        let statement = statement::update(meta, filter, changes)?;
        let changed = self.session.execute_statement(&statement)?;
        self.session.commit()?;
        debug!(
            "event=repo_update module=repo status=ok entity={} changed={}",
            meta.name, changed
        );
        Ok(changed)
    }

    /// Deletes every matching row and commits.
    ///
    /// Returns the number of rows removed.
    pub fn delete(&self, filter: &Filter) -> RepoResult<usize> {
        let meta = E::meta();
        let statement = statement::delete(meta, filter)?;
        let removed = self.session.execute_statement(&statement)?;
        self.session.commit()?;
        debug!(
            "event=repo_delete module=repo status=ok entity={} removed={}",
            meta.name, removed
        );
        Ok(removed)
    }

    /// Matching entities in store order, one per identity.
    ///
    /// # Errors
    /// - `MissingPrimaryKey` for entities declared without a key.
    pub fn find(&self, filter: &Filter) -> RepoResult<Vec<E>> {
        let meta = E::meta();
        meta.ensure_primary_key()?;
        let records = self.select(filter, &SelectOptions::default())?;

        let mut seen = HashSet::with_capacity(records.len());
        let mut entities = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(identity::identity_key(meta, &record)) {
                entities.push(E::from_attrs(record)?);
            }
        }
        Ok(entities)
    }

    /// First matching entity, if any.
    pub fn find_one(&self, filter: &Filter) -> RepoResult<Option<E>> {
        self.select(filter, &SelectOptions::limit(1))?
            .into_iter()
            .next()
            .map(E::from_attrs)
            .transpose()
    }

    /// The single matching entity.
    ///
    /// # Errors
    /// - `NotFound` when no row matches.
    /// - `MultipleFound` when more than one row matches.
    pub fn find_one_or_fail(&self, filter: &Filter) -> RepoResult<E> {
        E::meta().ensure_primary_key()?;
        let entity = E::meta().name;
        let mut records = self.select(filter, &SelectOptions::limit(2))?;
        match records.len() {
            0 => Err(RepoError::NotFound { entity }),
            1 => E::from_attrs(records.remove(0)),
            _ => Err(RepoError::MultipleFound { entity }),
        }
    }

    /// Deletes one instance or a collection by primary key and commits.
    pub fn remove<T: Removable<E>>(&self, target: T) -> RepoResult<()> {
        target.remove_with(self)
    }

    pub fn remove_one(&self, instance: &E) -> RepoResult<()> {
        self.session.delete(E::meta(), &instance.to_attrs())?;
        self.session.commit()
    }

    /// Every instance must be persisted; nothing is queued otherwise.
    pub fn remove_many(&self, instances: &[E]) -> RepoResult<()> {
        let meta = E::meta();
        let records = instances.iter().map(Entity::to_attrs).collect::<Vec<_>>();
        for record in &records {
            statement::key_filter(meta, record)?;
        }
        for record in &records {
            self.session.delete(meta, record)?;
        }
        self.session.commit()?;
        debug!(
            "event=repo_remove module=repo status=ok entity={} mode=batch size={}",
            meta.name,
            instances.len()
        );
        Ok(())
    }

    /// Attaches and flushes one instance or a collection without committing.
    pub fn pre_save<T: Saveable<E>>(&self, target: T) -> RepoResult<T::Output> {
        target.pre_save_with(self)
    }

    /// Merges an instance that already has an identity; otherwise inserts it
    /// and flushes immediately so store-assigned values land on `instance`.
    pub fn pre_save_one<'a>(&self, instance: &'a mut E) -> RepoResult<&'a mut E> {
        let meta = E::meta();

        if identity::has_identity(instance)? {
            let merged = self.session.merge(meta, instance.to_attrs())?;
            instance.assign(merged)?;
            debug!(
                "event=repo_pre_save module=repo status=ok entity={} mode=single path=merge",
                meta.name
            );
            return Ok(instance);
        }

        let handle = self.session.attach_new(meta, instance.to_attrs());
        let stored = self
            .session
            .flush(Some(&[handle]))?
            .pop()
            .ok_or_else(|| RepoError::InvalidData(format!("flush of {} returned no row", meta.name)))?;
        instance.assign(stored)?;
        debug!(
            "event=repo_pre_save module=repo status=ok entity={} mode=single path=insert",
            meta.name
        );
        Ok(instance)
    }

    /// Attaches every instance and flushes them in one pass. Insert-only.
    pub fn pre_save_many<'a>(&self, instances: &'a mut [E]) -> RepoResult<&'a mut [E]> {
        if instances.is_empty() {
            return Ok(instances);
        }

        let meta = E::meta();
        let records = instances.iter().map(Entity::to_attrs).collect();
        let handles = self.session.attach_all(meta, records);
        let stored = self.session.flush(Some(&handles))?;
        if stored.len() != instances.len() {
            return Err(RepoError::InvalidData(format!(
                "flush of {} returned {} rows for {} instances",
                meta.name,
                stored.len(),
                instances.len()
            )));
        }

        for (instance, record) in instances.iter_mut().zip(stored) {
            instance.assign(record)?;
        }
        debug!(
            "event=repo_pre_save module=repo status=ok entity={} mode=batch size={}",
            meta.name,
            instances.len()
        );
        Ok(instances)
    }

    /// `pre_save` followed by commit.
    pub fn save<T: Saveable<E>>(&self, target: T) -> RepoResult<T::Output> {
        let saved = target.pre_save_with(self)?;
        self.session.commit()?;
        Ok(saved)
    }

    pub fn save_one<'a>(&self, instance: &'a mut E) -> RepoResult<&'a mut E> {
        let saved = self.pre_save_one(instance)?;
        self.session.commit()?;
        Ok(saved)
    }

    pub fn save_many<'a>(&self, instances: &'a mut [E]) -> RepoResult<&'a mut [E]> {
        let saved = self.pre_save_many(instances)?;
        self.session.commit()?;
        Ok(saved)
    }

    fn select(&self, filter: &Filter, options: &SelectOptions) -> RepoResult<Vec<Attrs>> {
        let statement = statement::select(E::meta(), filter, options)?;
        self.session.execute_query(&statement)
    }
}

/// Argument accepted by `pre_save`/`save`: one instance or a collection.
pub trait Saveable<E: Entity> {
    type Output;

    fn pre_save_with<S: Session, Q: QueryBuilder>(
        self,
        repo: &Repository<'_, E, S, Q>,
    ) -> RepoResult<Self::Output>;
}

impl<'a, E: Entity> Saveable<E> for &'a mut E {
    type Output = &'a mut E;

    fn pre_save_with<S: Session, Q: QueryBuilder>(
        self,
        repo: &Repository<'_, E, S, Q>,
    ) -> RepoResult<Self::Output> {
        repo.pre_save_one(self)
    }
}

impl<'a, E: Entity> Saveable<E> for &'a mut [E] {
    type Output = &'a mut [E];

    fn pre_save_with<S: Session, Q: QueryBuilder>(
        self,
        repo: &Repository<'_, E, S, Q>,
    ) -> RepoResult<Self::Output> {
        repo.pre_save_many(self)
    }
}

impl<'a, E: Entity> Saveable<E> for &'a mut Vec<E> {
    type Output = &'a mut [E];

    fn pre_save_with<S: Session, Q: QueryBuilder>(
        self,
        repo: &Repository<'_, E, S, Q>,
    ) -> RepoResult<Self::Output> {
        repo.pre_save_many(self.as_mut_slice())
    }
}

/// Argument accepted by `remove`: one instance or a collection.
pub trait Removable<E: Entity> {
    fn remove_with<S: Session, Q: QueryBuilder>(
        self,
        repo: &Repository<'_, E, S, Q>,
    ) -> RepoResult<()>;
}

impl<E: Entity> Removable<E> for &E {
    fn remove_with<S: Session, Q: QueryBuilder>(
        self,
        repo: &Repository<'_, E, S, Q>,
    ) -> RepoResult<()> {
        repo.remove_one(self)
    }
}

impl<E: Entity> Removable<E> for &[E] {
    fn remove_with<S: Session, Q: QueryBuilder>(
        self,
        repo: &Repository<'_, E, S, Q>,
    ) -> RepoResult<()> {
        repo.remove_many(self)
    }
}

impl<E: Entity> Removable<E> for &Vec<E> {
    fn remove_with<S: Session, Q: QueryBuilder>(
        self,
        repo: &Repository<'_, E, S, Q>,
    ) -> RepoResult<()> {
        repo.remove_many(self.as_slice())
    }
}
