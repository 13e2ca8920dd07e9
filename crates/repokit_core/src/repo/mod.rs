//! Generic repository layer.
//!
//! # Responsibility
//! - Specialize one repository implementation per entity type.
//! - Resolve persisted identity from entity metadata.
//! - Layer policies (soft delete) by composition over the base repository.
//!
//! # Invariants
//! - Repositories return semantic errors (`NotFound`, `MultipleFound`) in
//!   addition to store errors, which pass through untranslated.
//! - No operation retries.

pub mod error;
pub mod factory;
pub mod identity;
pub mod repository;
pub mod soft_delete;
