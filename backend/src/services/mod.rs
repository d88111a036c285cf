//! Business logic services

pub mod auth;
pub mod branch;
pub mod inventory_report;
pub mod low_stock;
pub mod product;
pub mod stock;

pub use auth::AuthService;
pub use branch::BranchService;
pub use inventory_report::InventoryReportService;
pub use low_stock::LowStockWorker;
pub use product::ProductService;
pub use stock::StockService;
