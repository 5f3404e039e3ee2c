//! Data models for the store/catalog reconciler.
//!
//! Store-side entities are rebuilt from a live listing on every run; catalog
//! rows map to the `files` table via `sqlx::FromRow` and everything serializes
//! as JSON via `serde`.

pub mod event;
pub mod metadata_record;
pub mod reconciliation;
pub mod storage_object;
