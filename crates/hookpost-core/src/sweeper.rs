//! Expiry sweeper
//!
//! A recurring background task that deletes captured requests and endpoints
//! past their plan-determined lifetime. One failed sweep is logged and the
//! next scheduled run retries against the then-current state.

use std::time::Duration;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::HookError;
use hookpost_db::store;

/// Rows removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub requests_deleted: u64,
    pub endpoints_deleted: u64,
}

pub struct ExpirySweeper {
    db: DatabaseConnection,
    period: Duration,
}

impl ExpirySweeper {
    pub fn new(db: DatabaseConnection, period: Duration) -> Self {
        Self { db, period }
    }

    /// Delete everything past its expiry. Idempotent: a second run with no
    /// new captures in between deletes nothing.
    pub async fn sweep_once(&self) -> Result<SweepReport, HookError> {
        let now = Utc::now();

        let requests_deleted = store::delete_expired_requests(&self.db, now).await?;
        let endpoints_deleted = store::delete_expired_endpoints(&self.db, now).await?;

        info!(requests_deleted, endpoints_deleted, "Expiry sweep completed");

        Ok(SweepReport {
            requests_deleted,
            endpoints_deleted,
        })
    }

    /// Run the sweep on a fixed schedule until the task is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            // The immediate first tick would sweep at startup; skip it
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Err(err) = self.sweep_once().await {
                    error!("expiry sweep failed: {err}");
                }
            }
        })
    }
}
