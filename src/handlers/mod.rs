pub mod health_handlers;
pub mod reconcile_handlers;
