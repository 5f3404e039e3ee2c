//! Reconciliation engine: collaborator boundaries (store, catalog, notifier)
//! and the pipeline that snapshots, diffs and repairs them.

pub mod catalog;
pub mod diff;
pub mod key_codec;
pub mod notifier;
pub mod object_store;
pub mod reconciler;
pub mod repair;
pub mod run_guard;
pub mod scheduler;
pub mod snapshot;
