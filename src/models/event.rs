//! Domain events published by the reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted after a catalog row is removed because its object is gone.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeletionEvent {
    pub record_id: Uuid,
    pub display_name: String,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}
