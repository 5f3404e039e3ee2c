//! In-process periodic trigger.
//!
//! Stands in for an external cron: it only decides *when* to call the job.
//! Overlap with manual triggers is handled by the job's run guard.

use crate::services::reconciler::ReconciliationJob;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error};

/// Call `run_reconciliation` every `period`, starting one period from now.
pub fn spawn_periodic(job: Arc<ReconciliationJob>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            debug!("scheduled reconciliation tick");
            if let Err(err) = job.run_reconciliation().await {
                error!(error = %err, "scheduled reconciliation failed");
            }
        }
    })
}
