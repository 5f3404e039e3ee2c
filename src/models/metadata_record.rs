//! Represents a row of the relational file catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Identity recorded as `uploaded_by` / event actor for repairs made by the
/// reconciler. Never collides with an end-user id, which are UUIDs.
pub const SYSTEM_ACTOR: &str = "system:reconciler";

/// One file record in the metadata catalog.
///
/// Rows are created by the normal upload flow or by the reconciler's create
/// repair, and removed by the normal delete flow or the delete repair.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Catalog-assigned identifier.
    pub id: Uuid,

    /// Display name shown to users.
    pub name: String,

    /// Locator URL: `{endpoint}/{bucket}/{storage key}`.
    pub url: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Content type (MIME type).
    pub mime_type: String,

    /// Uploader identity, or [`SYSTEM_ACTOR`] for repaired rows.
    pub uploaded_by: String,

    /// When the row was inserted.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a catalog row; the catalog assigns `id` and `created_at`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NewMetadataRecord {
    pub name: String,
    pub url: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub uploaded_by: String,
}
