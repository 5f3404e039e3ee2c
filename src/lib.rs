//! Reconciles an object store bucket with the relational catalog that
//! describes its files.
//!
//! A run snapshots both sides, diffs them by normalized key and repairs the
//! catalog: orphan objects get a system-owned row, rows whose object is gone
//! are deleted and announced through the event notifier.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use anyhow::Context;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::{
        catalog::SqliteCatalog,
        key_codec::KeyCodec,
        notifier::{EventNotifier, TracingNotifier, WebhookNotifier},
        object_store::LocalObjectStore,
        reconciler::ReconciliationJob,
        repair::RepairExecutor,
        snapshot::SnapshotReader,
    },
};

/// Schema for the `files` catalog table.
pub const MIGRATION_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Apply the embedded catalog schema statement by statement.
pub async fn run_migrations(db: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = MIGRATION_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

/// Wire the job from config. Nothing is created on disk: a bucket directory
/// that is missing stays missing and every run aborts on the store snapshot.
pub fn build_job(cfg: &AppConfig, db: Arc<SqlitePool>) -> anyhow::Result<ReconciliationJob> {
    let codec = KeyCodec::new(&cfg.store_endpoint, &cfg.bucket)
        .with_legacy_locations(&cfg.legacy_locations);

    let store = Arc::new(LocalObjectStore::new(&cfg.storage_dir, &cfg.bucket));
    let catalog = Arc::new(SqliteCatalog::new(db));
    let notifier: Arc<dyn EventNotifier> = match &cfg.webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(url, cfg.webhook_timeout).context("building webhook client")?,
        ),
        None => Arc::new(TracingNotifier),
    };

    let reader = SnapshotReader::new(store, catalog.clone(), &cfg.prefix);
    let executor = RepairExecutor::new(catalog, notifier, codec).dry_run(cfg.dry_run);
    Ok(ReconciliationJob::new(reader, executor))
}
