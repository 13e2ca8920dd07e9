//! Repository bindings.
//!
//! Binding is pure construction: no registry, no shared state. Each call
//! returns an independent value; any number of bindings may share one
//! session as long as that session stays on one thread.

use crate::model::entity::Entity;
use crate::query::builder::{QueryBuilder, SelectQuery};
use crate::repo::repository::Repository;
use crate::repo::soft_delete::SoftDeleteRepository;
use crate::session::Session;

/// Binds `E` to `session` with the default query builder.
pub fn inject_repository<E, S>(session: &S) -> Repository<'_, E, S>
where
    E: Entity,
    S: Session,
{
    Repository::bind(session)
}

/// Binds `E` to `session` with a custom query builder `Q`.
pub fn inject_repository_with<E, S, Q>(session: &S) -> Repository<'_, E, S, Q>
where
    E: Entity,
    S: Session,
    Q: QueryBuilder,
{
    Repository::bind(session)
}

/// Hands out repository bindings over one session.
pub struct RepositoryFactory<'s, S> {
    session: &'s S,
}

impl<'s, S: Session> RepositoryFactory<'s, S> {
    pub fn new(session: &'s S) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &'s S {
        self.session
    }

    pub fn repository<E: Entity>(&self) -> Repository<'s, E, S, SelectQuery> {
        Repository::bind(self.session)
    }

    pub fn repository_with<E: Entity, Q: QueryBuilder>(&self) -> Repository<'s, E, S, Q> {
        Repository::bind(self.session)
    }

    /// Binding whose reads and deletes honour the `column` deletion stamp.
    pub fn soft_delete<E: Entity>(&self, column: &'static str) -> SoftDeleteRepository<'s, E, S> {
        SoftDeleteRepository::new(self.repository::<E>(), column)
    }
}
