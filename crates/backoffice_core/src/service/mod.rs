//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI/UI callers decoupled from SQL and HTTP details.

pub mod project_service;
pub mod task_service;
pub mod vault_service;
