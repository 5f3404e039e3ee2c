//! Mapping between store keys and the locator URLs kept in the catalog.
//!
//! The catalog stores `{endpoint}/{bucket}/{key}`; the store only knows `key`.
//! Both sides are reduced to a [`NormalizedKey`] before they are compared.

use serde::Serialize;
use std::fmt;

/// Canonical identity of a file. Two entities are the same file iff their
/// normalized keys are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version of the derivation applied by [`KeyCodec`].
///
/// Logged with every run so a change in how keys are derived shows up in the
/// logs instead of as a wave of "missing" records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScheme {
    /// `{endpoint}/{bucket}/{key}` prefix stripping.
    V1,
}

impl KeyScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyScheme::V1 => "v1-endpoint-bucket-prefix",
        }
    }
}

/// How a catalog URL was turned into a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// Matched the current endpoint/bucket.
    Current,
    /// Matched one of the configured legacy endpoint/bucket pairs.
    Legacy,
    /// No prefix matched; the whole URL is the key.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct KeyCodec {
    scheme: KeyScheme,
    endpoint: String,
    bucket: String,
    current_prefix: String,
    legacy_prefixes: Vec<String>,
}

impl KeyCodec {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let bucket = bucket.into().trim_matches('/').to_string();
        let current_prefix = format!("{}/{}/", endpoint, bucket);
        Self {
            scheme: KeyScheme::V1,
            endpoint,
            bucket,
            current_prefix,
            legacy_prefixes: Vec::new(),
        }
    }

    /// Register `{endpoint}/{bucket}` locations that older catalog rows may
    /// still point at (e.g. before an endpoint migration).
    pub fn with_legacy_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for location in locations {
            let location = location.as_ref().trim().trim_end_matches('/');
            if location.is_empty() {
                continue;
            }
            let prefix = format!("{}/", location);
            if prefix != self.current_prefix && !self.legacy_prefixes.contains(&prefix) {
                self.legacy_prefixes.push(prefix);
            }
        }
        self
    }

    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Derive the comparison key for a catalog locator URL.
    ///
    /// Falls back to the full URL when no known prefix matches. That key is
    /// still valid, it just will not match any store object.
    pub fn derive_normalized_key(&self, locator_url: &str) -> NormalizedKey {
        self.classify(locator_url).0
    }

    /// Same as [`derive_normalized_key`](Self::derive_normalized_key) but also
    /// reports which prefix matched.
    pub fn classify(&self, locator_url: &str) -> (NormalizedKey, KeyMatch) {
        if let Some(key) = locator_url.strip_prefix(&self.current_prefix) {
            return (NormalizedKey(key.to_string()), KeyMatch::Current);
        }

        for prefix in &self.legacy_prefixes {
            if let Some(key) = locator_url.strip_prefix(prefix.as_str()) {
                return (NormalizedKey(key.to_string()), KeyMatch::Legacy);
            }
        }

        (NormalizedKey(locator_url.to_string()), KeyMatch::Fallback)
    }

    /// Store keys are already normalized.
    pub fn storage_key_as_normalized_key(&self, storage_key: &str) -> NormalizedKey {
        NormalizedKey(storage_key.to_string())
    }

    /// Build the locator URL a catalog row should carry for `storage_key`.
    pub fn locator_url(&self, storage_key: &str) -> String {
        format!("{}{}", self.current_prefix, storage_key)
    }
}
