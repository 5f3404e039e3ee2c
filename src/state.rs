use crate::services::reconciler::ReconciliationJob;
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Catalog pool, probed by `/readyz`.
    pub db: Arc<SqlitePool>,

    /// Directory of the reconciled bucket, probed by `/readyz`.
    pub bucket_dir: PathBuf,

    /// The one job instance shared with the scheduler.
    pub job: Arc<ReconciliationJob>,
}
