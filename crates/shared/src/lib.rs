//! Shared configuration, errors, and infrastructure primitives for Sodalis.
//!
//! This crate provides common types used across all other crates:
//! - Layered application configuration
//! - Application-wide error types
//! - Email delivery over SMTP
//! - JWT claims and token validation
//! - Pagination types for list endpoints

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, EmailConfig};
pub use email::{EmailError, EmailService, OutgoingEmail};
pub use error::{AppError, AppResult, FieldViolation};
pub use jwt::{JwtConfig, JwtError, JwtService};
