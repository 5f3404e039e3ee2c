//! Values produced by a reconciliation run: the diff, the repair report and
//! the outcome returned to whoever triggered the run.

use super::{metadata_record::MetadataRecord, storage_object::StorageObject};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Symmetric difference between a store snapshot and a catalog snapshot.
///
/// Entities present on both sides appear in neither list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Store objects that have no catalog row.
    pub missing_in_catalog: Vec<StorageObject>,

    /// Catalog rows whose object is gone from the store.
    pub missing_in_store: Vec<MetadataRecord>,
}

impl ReconciliationResult {
    pub fn is_consistent(&self) -> bool {
        self.missing_in_catalog.is_empty() && self.missing_in_store.is_empty()
    }
}

/// Which repair pass an item failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairDirection {
    CreateInCatalog,
    DeleteFromCatalog,
}

/// One item that could not be repaired. The pass continued past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairFailure {
    pub direction: RepairDirection,

    /// Storage key for create failures, record id for delete failures.
    pub item: String,

    pub error: String,
}

/// Tally of what the repair executor did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub created: u64,
    pub deleted: u64,
    pub events_published: u64,
    pub failures: Vec<RepairFailure>,
    pub dry_run: bool,
}

impl RepairReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub key_scheme: &'static str,
    pub store_objects: usize,
    pub catalog_records: usize,
    pub missing_in_catalog: usize,
    pub missing_in_store: usize,
    pub repairs: RepairReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// What a call to the job entry point resulted in.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Another run was already in flight; nothing was read or written.
    Skipped,
    Completed(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            RunOutcome::Skipped => None,
            RunOutcome::Completed(summary) => Some(summary),
        }
    }
}
