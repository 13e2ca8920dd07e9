//! Generic repository core over SQLite.
//! Entities declare their mapping once; one repository implementation
//! serves every entity type.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod session;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_configured_db, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::application::{create_application_table, Application};
pub use model::entity::{attrs, Attrs, Entity, EntityMeta, FieldMeta};
pub use query::builder::{QueryBuilder, SelectQuery};
pub use query::filter::{Condition, Filter};
pub use query::statement::{Order, SelectOptions, Statement};
pub use repo::error::{RepoError, RepoResult};
pub use repo::factory::{inject_repository, inject_repository_with, RepositoryFactory};
pub use repo::identity::Identity;
pub use repo::repository::{Removable, Repository, Saveable};
pub use repo::soft_delete::SoftDeleteRepository;
pub use rusqlite::types::Value;
pub use service::application_service::{ApplicationService, ServiceError, ServiceResult};
pub use service::dto::{ApplicationCreate, ApplicationFilter, ApplicationRead, ValidationError};
pub use session::{Session, SqliteSession};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
