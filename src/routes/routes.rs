//! Operator routes.
//!
//! - `GET  /healthz`          -> liveness
//! - `GET  /readyz`           -> catalog + bucket disk readiness
//! - `POST /admin/reconcile`  -> run a reconciliation now

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        reconcile_handlers::trigger_reconciliation,
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router. Handlers share `AppState`, which owns the job instance.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/admin/reconcile", post(trigger_reconciliation))
}
