//! Domain models for the pharmacy inventory platform

mod branch;
mod inventory_report;
mod product;
mod stock;
mod user;

pub use branch::*;
pub use inventory_report::*;
pub use product::*;
pub use stock::*;
pub use user::*;
