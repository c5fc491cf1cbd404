//! `SeaORM` entity definitions.
//!
//! Entities use logical table names only; the schema they live in is chosen
//! per tenant by the connection's `search_path`.

pub mod audit_log;
pub mod fees;
pub mod members;
pub mod movement_categories;
pub mod movements;
pub mod receipt_counters;
pub mod receipts;
pub mod sea_orm_active_enums;
pub mod social_years;
