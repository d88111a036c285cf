//! HTTP request handlers

pub mod auth;
pub mod branch;
pub mod branch_product;
pub mod health;
pub mod inventory_report;
pub mod product;

pub use auth::*;
pub use branch::*;
pub use branch_product::*;
pub use health::*;
pub use inventory_report::*;
pub use product::*;
