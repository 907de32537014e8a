//! Shared types, errors, and configuration for Inkwell.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management (files, environment, service bindings)

pub mod config;
pub mod error;

pub use config::{AppConfig, CouchConfig, PathsConfig, ServerConfig};
pub use error::{AppError, AppResult};
