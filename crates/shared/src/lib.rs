//! Shared types, errors, and configuration for Hisab.
//!
//! This crate provides common types used across all other crates:
//! - Money rounding helpers with decimal precision
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LogConfig, ServerConfig};
pub use error::{AppError, AppResult};
