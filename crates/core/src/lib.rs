//! Fee ledger logic for Sodalis.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! The store, notifier and audit log are traits implemented by the outer crates.
//!
//! # Modules
//!
//! - `auth` - Roles and the acting identity
//! - `clock` - Time source for due-date rules
//! - `fee` - Fee lifecycle, ledger movements, receipts and reporting

pub mod auth;
pub mod clock;
pub mod fee;

pub use auth::{Actor, UserRole};
pub use clock::{Clock, FixedClock, SystemClock};
