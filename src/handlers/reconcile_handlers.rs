//! Manual trigger for the reconciliation job.

use crate::{errors::AppError, models::reconciliation::RunOutcome, state::AppState};
use axum::{Json, extract::State};
use tracing::info;

/// `POST /admin/reconcile`
///
/// Runs the job in the request task and returns its outcome. A trigger that
/// lands while a run is in flight gets `{"status":"skipped"}` with 200.
/// Snapshot failures map to 502.
pub async fn trigger_reconciliation(
    State(state): State<AppState>,
) -> Result<Json<RunOutcome>, AppError> {
    info!("manual reconciliation requested");
    let outcome = state.job.run_reconciliation().await?;
    Ok(Json(outcome))
}
