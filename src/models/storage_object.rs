//! Represents an object (file) currently present in the object store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw entry returned by an object store listing.
///
/// This is what an `ObjectStore` implementation hands back; it carries no
/// derived fields.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ListedObject {
    /// Store-native key, e.g. `files/image/1700000000-cat.jpg`.
    pub key: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Timestamp when the object was last written.
    pub last_modified: DateTime<Utc>,
}

/// A single object observed in the store during a reconciliation run.
///
/// Built fresh from a live listing on every run and never persisted by the job.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StorageObject {
    /// Store-native identifier, unique within the store.
    pub storage_key: String,

    /// Human-facing file name derived from the key.
    pub display_name: String,

    /// Size in bytes (never negative).
    pub size_bytes: i64,

    /// Timestamp when the object was last modified.
    pub last_modified: DateTime<Utc>,
}

impl StorageObject {
    pub fn from_listing(listed: ListedObject) -> Self {
        Self {
            display_name: display_name_from_key(&listed.key),
            size_bytes: listed.size_bytes.max(0),
            last_modified: listed.last_modified,
            storage_key: listed.key,
        }
    }

    /// True for zero-length "directory" placeholders such as `files/image/`.
    pub fn is_directory_marker(&self) -> bool {
        self.storage_key.ends_with('/') && self.size_bytes == 0
    }
}

/// Derive a display name from a storage key.
///
/// Takes the last `/` segment and drops the `<digits>-` upload timestamp that
/// the upload flow prepends (`files/image/1700000000-cat.jpg` -> `cat.jpg`).
pub fn display_name_from_key(key: &str) -> String {
    let segment = key.rsplit('/').next().unwrap_or(key);

    if let Some((stamp, rest)) = segment.split_once('-') {
        if !stamp.is_empty() && !rest.is_empty() && stamp.bytes().all(|b| b.is_ascii_digit()) {
            return rest.to_string();
        }
    }

    segment.to_string()
}
