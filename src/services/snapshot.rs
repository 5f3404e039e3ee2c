//! Full-listing readers for both sides of a reconciliation.

use crate::{
    models::{metadata_record::MetadataRecord, storage_object::StorageObject},
    services::{
        catalog::{CatalogResult, MetadataCatalog},
        object_store::{ObjectStore, StoreResult},
    },
};
use std::sync::Arc;
use tracing::debug;

/// Pulls a complete snapshot of the store (under `prefix`) and of the catalog.
///
/// No paging state survives between runs; every call is a fresh full listing.
#[derive(Clone)]
pub struct SnapshotReader {
    store: Arc<dyn ObjectStore>,
    catalog: Arc<dyn MetadataCatalog>,
    prefix: String,
}

impl SnapshotReader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        catalog: Arc<dyn MetadataCatalog>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            catalog,
            prefix: prefix.into(),
        }
    }

    /// Every object under the prefix, minus zero-length directory markers.
    pub async fn list_store_objects(&self) -> StoreResult<Vec<StorageObject>> {
        let listed = self.store.list(&self.prefix).await?;
        let total = listed.len();

        let objects: Vec<StorageObject> = listed
            .into_iter()
            .map(StorageObject::from_listing)
            .filter(|obj| !obj.is_directory_marker())
            .collect();

        debug!(
            prefix = %self.prefix,
            listed = total,
            kept = objects.len(),
            "store snapshot taken"
        );
        Ok(objects)
    }

    /// Every catalog row, unfiltered.
    pub async fn list_catalog_records(&self) -> CatalogResult<Vec<MetadataRecord>> {
        let records = self.catalog.find_all().await?;
        debug!(records = records.len(), "catalog snapshot taken");
        Ok(records)
    }
}
