//! src/services/reconciler.rs
//!
//! ReconciliationJob, the entry point triggered by the scheduler or by an
//! operator. One run is: admit through the [`RunGuard`], snapshot the store
//! and the catalog, diff them by normalized key, then repair the catalog.

use crate::{
    models::reconciliation::{RunOutcome, RunSummary},
    services::{
        catalog::CatalogError, diff, key_codec::KeyCodec, object_store::StoreError,
        repair::RepairExecutor, run_guard::RunGuard, snapshot::SnapshotReader,
    },
};
use chrono::Utc;
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Failures that abort a run. Per-item repair failures never end up here.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to list object store: {0}")]
    StoreSnapshot(#[source] StoreError),
    #[error("failed to list metadata catalog: {0}")]
    CatalogSnapshot(#[source] CatalogError),
}

pub struct ReconciliationJob {
    guard: RunGuard,
    reader: SnapshotReader,
    executor: RepairExecutor,
}

impl ReconciliationJob {
    /// The diff joins on the executor's codec, so created rows always match
    /// their objects on the next run.
    pub fn new(reader: SnapshotReader, executor: RepairExecutor) -> Self {
        Self {
            guard: RunGuard::new(),
            reader,
            executor,
        }
    }

    fn codec(&self) -> &KeyCodec {
        self.executor.codec()
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Run one reconciliation unless another is already in flight.
    ///
    /// Returns `Skipped` without doing any I/O when the guard is held, and an
    /// error only when one of the snapshot reads fails. The guard is released
    /// on every exit path.
    pub async fn run_reconciliation(&self) -> Result<RunOutcome, ReconcileError> {
        let Some(_permit) = self.guard.try_acquire() else {
            warn!("reconciliation already in progress, skipping trigger");
            return Ok(RunOutcome::Skipped);
        };

        let run_id = Uuid::new_v4();
        self.execute(run_id)
            .instrument(info_span!("reconciliation", %run_id))
            .await
            .map(RunOutcome::Completed)
    }

    async fn execute(&self, run_id: Uuid) -> Result<RunSummary, ReconcileError> {
        let started_at = Utc::now();
        info!(key_scheme = self.codec().scheme().as_str(), "reconciliation started");

        let store_objects = self.reader.list_store_objects().await.map_err(|err| {
            error!(error = %err, "store snapshot failed, aborting run");
            ReconcileError::StoreSnapshot(err)
        })?;
        let catalog_records = self.reader.list_catalog_records().await.map_err(|err| {
            error!(error = %err, "catalog snapshot failed, aborting run");
            ReconcileError::CatalogSnapshot(err)
        })?;

        let store_count = store_objects.len();
        let catalog_count = catalog_records.len();
        let diff = diff::reconcile(store_objects, catalog_records, self.codec());
        let missing_in_catalog = diff.missing_in_catalog.len();
        let missing_in_store = diff.missing_in_store.len();

        info!(
            store_objects = store_count,
            catalog_records = catalog_count,
            missing_in_catalog,
            missing_in_store,
            "snapshots compared"
        );

        let repairs = if diff.is_consistent() {
            Default::default()
        } else {
            self.executor.apply(diff).await
        };

        if repairs.has_failures() {
            warn!(
                failed = repairs.failures.len(),
                created = repairs.created,
                deleted = repairs.deleted,
                "reconciliation finished with item failures"
            );
        } else {
            info!(
                created = repairs.created,
                deleted = repairs.deleted,
                "reconciliation finished"
            );
        }

        Ok(RunSummary {
            run_id,
            key_scheme: self.codec().scheme().as_str(),
            store_objects: store_count,
            catalog_records: catalog_count,
            missing_in_catalog,
            missing_in_store,
            repairs,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
