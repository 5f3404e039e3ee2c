//! Set difference between a store snapshot and a catalog snapshot.

use crate::{
    models::{
        metadata_record::MetadataRecord, reconciliation::ReconciliationResult,
        storage_object::StorageObject,
    },
    services::key_codec::{KeyCodec, KeyMatch, NormalizedKey},
};
use std::collections::HashSet;
use tracing::warn;

/// Compute which store objects lack a catalog row and which catalog rows lack
/// a store object, joined on [`NormalizedKey`].
///
/// Pure hashed set difference in both directions. Duplicate catalog rows that
/// map to the same key are each checked on their own; nothing is deduplicated.
pub fn reconcile(
    store_objects: Vec<StorageObject>,
    catalog_records: Vec<MetadataRecord>,
    codec: &KeyCodec,
) -> ReconciliationResult {
    let mut fallback_keys = 0usize;
    let keyed_records: Vec<(NormalizedKey, MetadataRecord)> = catalog_records
        .into_iter()
        .map(|record| {
            let (key, matched) = codec.classify(&record.url);
            if matched == KeyMatch::Fallback {
                fallback_keys += 1;
            }
            (key, record)
        })
        .collect();

    if fallback_keys > 0 {
        warn!(
            count = fallback_keys,
            endpoint = codec.endpoint(),
            bucket = codec.bucket(),
            "catalog urls did not match the store location; compared by full url"
        );
    }

    let catalog_keys: HashSet<&NormalizedKey> = keyed_records.iter().map(|(key, _)| key).collect();
    let store_keys: HashSet<NormalizedKey> = store_objects
        .iter()
        .map(|obj| codec.storage_key_as_normalized_key(&obj.storage_key))
        .collect();

    let missing_in_catalog = store_objects
        .into_iter()
        .filter(|obj| !catalog_keys.contains(&codec.storage_key_as_normalized_key(&obj.storage_key)))
        .collect();

    let missing_in_store = keyed_records
        .iter()
        .filter(|(key, _)| !store_keys.contains(key))
        .map(|(_, record)| record.clone())
        .collect();

    ReconciliationResult {
        missing_in_catalog,
        missing_in_store,
    }
}
