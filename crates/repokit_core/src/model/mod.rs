//! Entity contract, mapping metadata, and the example `Application` entity.
//!
//! # Invariants
//! - Every entity is identified by its declared primary-key fields.
//! - Field values cross the generic layer as `rusqlite::types::Value`.

pub mod application;
pub mod entity;
