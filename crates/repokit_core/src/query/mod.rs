//! Filter composition and statement rendering.
//!
//! # Responsibility
//! - Build composite filters shared by every repository operation.
//! - Render the fixed statement shapes executed by sessions.
//!
//! # Invariants
//! - Values are always bound as parameters, never spliced into SQL text.
//! - Identifiers come from entity metadata and are quoted.

pub mod builder;
pub mod filter;
pub mod statement;
