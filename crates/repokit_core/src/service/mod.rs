//! Use-case services built on the generic repository.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep callers decoupled from filter and session details.

pub mod application_service;
pub mod dto;
