//! Common utilities and shared functionality for the storefront platform.
//!
//! This crate provides foundational utilities used across the workspace:
//! - Configuration management
//! - Telemetry and structured logging setup
//! - Pagination and sorting parameter types
//! - DateTime helpers

pub mod config;
pub mod datetime;
pub mod pagination;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AppConfig, AuditConfig, DatabaseConfig, TelemetryConfig};
pub use datetime::now_utc;
pub use pagination::{PageRequest, PaginatedResult, SortDirection, SortParams};
pub use telemetry::init_tracing;

/// Common error type used throughout the crate
pub type Result<T> = std::result::Result<T, anyhow::Error>;
