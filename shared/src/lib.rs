//! Shared types and domain rules for the pharmacy inventory platform
//!
//! This crate holds the catalog, stock and report models together with the
//! pure reconciliation and low-stock logic, so they can be exercised without a
//! database. The backend enables the `sqlx` feature to map them onto rows.

pub mod models;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use models::*;
pub use reconciliation::*;
pub use types::*;
pub use validation::*;
