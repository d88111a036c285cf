//! Background low-stock sweep

use std::time::Duration;

use sqlx::PgPool;
use tokio::time::{self, MissedTickBehavior};

use crate::services::StockService;

/// Periodically evaluates every stock record's low-stock state
pub struct LowStockWorker {
    stock: StockService,
    interval_seconds: u64,
}

impl LowStockWorker {
    pub fn new(db: PgPool, interval_seconds: u64) -> Self {
        Self {
            stock: StockService::new(db),
            // A zero period would make tokio's interval panic
            interval_seconds: interval_seconds.max(1),
        }
    }

    pub async fn run_loop(&self) {
        tracing::info!(
            "Low-stock sweep worker started with interval {} seconds",
            self.interval_seconds
        );
        let mut interval = time::interval(Duration::from_secs(self.interval_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match self.stock.sweep_low_stock().await {
                Ok(report) if report.transitions.is_empty() => {
                    tracing::debug!(evaluated = report.evaluated, "low-stock sweep: no changes");
                }
                Ok(report) => {
                    tracing::info!(
                        evaluated = report.evaluated,
                        transitions = report.transitions.len(),
                        "low-stock sweep applied transitions"
                    );
                }
                Err(e) => tracing::error!("Low-stock sweep failed: {:?}", e),
            }
        }
    }
}
