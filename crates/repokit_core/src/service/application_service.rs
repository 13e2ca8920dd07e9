//! Application use-case service.
//!
//! # Responsibility
//! - Validate input before it reaches the repository.
//! - Serve reads through the soft-delete policy.
//!
//! # Invariants
//! - Deleted applications are invisible to `find` and `find_one_or_fail`.
//! - `delete` never removes rows physically.

use crate::model::application::Application;
use crate::model::entity::uuid_to_value;
use crate::query::filter::Filter;
use crate::repo::error::RepoError;
use crate::repo::factory::RepositoryFactory;
use crate::repo::soft_delete::SoftDeleteRepository;
use crate::service::dto::{ApplicationCreate, ApplicationFilter, ValidationError};
use crate::session::Session;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service-level failure.
#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    Repo(RepoError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Repo(RepoError::NotFound { .. }))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Use-case wrapper over a soft-delete `Application` repository.
pub struct ApplicationService<'s, S> {
    repo: SoftDeleteRepository<'s, Application, S>,
}

impl<'s, S: Session> ApplicationService<'s, S> {
    pub fn new(factory: &RepositoryFactory<'s, S>) -> Self {
        Self {
            repo: factory.soft_delete::<Application>(Application::DELETED_AT),
        }
    }

    pub fn repository(&self) -> &SoftDeleteRepository<'s, Application, S> {
        &self.repo
    }

    /// Validates `payload`, inserts it and commits.
    pub fn create(&self, payload: &ApplicationCreate) -> ServiceResult<Application> {
        payload.validate()?;
        let mut application = self.repo.instantiate(payload.to_attrs())?;
        self.repo.save(&mut application)?;
        info!("event=application_create module=service status=ok");
        Ok(application)
    }

    /// Live applications matching every non-empty criterion.
    pub fn find(&self, criteria: &ApplicationFilter) -> ServiceResult<Vec<Application>> {
        Ok(self.repo.find(&criteria.to_filter())?)
    }

    pub fn find_one_or_fail(&self, id: Uuid) -> ServiceResult<Application> {
        Ok(self.repo.find_one_or_fail(&by_id(id))?)
    }

    /// Soft-deletes a live application and returns it with its stamp set.
    ///
    /// # Errors
    /// - `NotFound` when no live application has `id`.
    pub fn delete(&self, id: Uuid) -> ServiceResult<Application> {
        let filter = by_id(id);
        self.repo.find_one_or_fail(&filter)?;
        self.repo.delete(&filter)?;
        let deleted = self.repo.with_deleted().find_one_or_fail(&filter)?;
        info!("event=application_delete module=service status=ok");
        Ok(deleted)
    }
}

fn by_id(id: Uuid) -> Filter {
    Filter::by(Application::ID, uuid_to_value(Some(id)))
}
