//! Applies the repairs computed by the diff engine.
//!
//! Both passes isolate failures per item: a failed insert or delete is logged,
//! recorded in the [`RepairReport`] and the loop moves on.

use crate::{
    models::{
        event::DeletionEvent,
        metadata_record::{MetadataRecord, NewMetadataRecord, SYSTEM_ACTOR},
        reconciliation::{RepairDirection, RepairFailure, RepairReport, ReconciliationResult},
        storage_object::StorageObject,
    },
    services::{catalog::MetadataCatalog, key_codec::KeyCodec, notifier::EventNotifier},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("zip", "application/zip"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
];

/// Best-effort MIME type from the file extension.
pub fn guess_mime_type(name: &str) -> &'static str {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return DEFAULT_MIME_TYPE;
    };
    MIME_BY_EXTENSION
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

#[derive(Clone)]
pub struct RepairExecutor {
    catalog: Arc<dyn MetadataCatalog>,
    notifier: Arc<dyn EventNotifier>,
    codec: KeyCodec,
    dry_run: bool,
}

impl RepairExecutor {
    pub fn new(
        catalog: Arc<dyn MetadataCatalog>,
        notifier: Arc<dyn EventNotifier>,
        codec: KeyCodec,
    ) -> Self {
        Self {
            catalog,
            notifier,
            codec,
            dry_run: false,
        }
    }

    /// Codec used to build locator URLs for created rows. The diff must use
    /// the same one or created rows would never match their objects.
    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Log the repairs that would be made without touching either side.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Run the create pass, then the delete pass.
    pub async fn apply(&self, diff: ReconciliationResult) -> RepairReport {
        let mut report = RepairReport {
            dry_run: self.dry_run,
            ..Default::default()
        };
        self.create_missing_in_catalog(diff.missing_in_catalog, &mut report)
            .await;
        self.delete_missing_in_store(diff.missing_in_store, &mut report)
            .await;
        report
    }

    fn new_record_for(&self, object: &StorageObject) -> NewMetadataRecord {
        NewMetadataRecord {
            name: object.display_name.clone(),
            url: self.codec.locator_url(&object.storage_key),
            size_bytes: object.size_bytes,
            mime_type: guess_mime_type(&object.storage_key).to_string(),
            uploaded_by: SYSTEM_ACTOR.to_string(),
        }
    }

    /// Insert a catalog row for every orphan store object. No event is
    /// published for this direction.
    async fn create_missing_in_catalog(
        &self,
        objects: Vec<StorageObject>,
        report: &mut RepairReport,
    ) {
        for object in objects {
            let record = self.new_record_for(&object);
            if self.dry_run {
                info!(storage_key = %object.storage_key, url = %record.url, "dry run: would create catalog record");
                continue;
            }

            match self.catalog.insert(record).await {
                Ok(created) => {
                    info!(
                        storage_key = %object.storage_key,
                        record_id = %created.id,
                        "created catalog record for orphan object"
                    );
                    report.created += 1;
                }
                Err(err) => {
                    error!(
                        storage_key = %object.storage_key,
                        error = %err,
                        "failed to create catalog record"
                    );
                    report.failures.push(RepairFailure {
                        direction: RepairDirection::CreateInCatalog,
                        item: object.storage_key,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    /// Delete every catalog row whose object is gone, then announce it.
    ///
    /// Delete and publish are separate steps: a row stays deleted even if
    /// the notifier drops the event.
    async fn delete_missing_in_store(
        &self,
        records: Vec<MetadataRecord>,
        report: &mut RepairReport,
    ) {
        for record in records {
            if self.dry_run {
                info!(record_id = %record.id, url = %record.url, "dry run: would delete catalog record");
                continue;
            }

            if let Err(err) = self.catalog.delete_by_id(record.id).await {
                error!(
                    record_id = %record.id,
                    url = %record.url,
                    error = %err,
                    "failed to delete catalog record"
                );
                report.failures.push(RepairFailure {
                    direction: RepairDirection::DeleteFromCatalog,
                    item: record.id.to_string(),
                    error: err.to_string(),
                });
                continue;
            }

            info!(record_id = %record.id, url = %record.url, "deleted catalog record for missing object");
            report.deleted += 1;

            self.notifier
                .publish_deleted(DeletionEvent {
                    record_id: record.id,
                    display_name: record.name,
                    actor: SYSTEM_ACTOR.to_string(),
                    occurred_at: Utc::now(),
                })
                .await;
            report.events_published += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        catalog::{CatalogError, CatalogResult},
        diff::tests::{ENDPOINT, BUCKET, codec, object, record},
        notifier::MockEventNotifier,
        reconciler::tests::FakeCatalog,
    };
    use async_trait::async_trait;
    use uuid::Uuid;

    /// Catalog whose writes fail for one specific key / record.
    struct FlakyCatalog {
        inner: FakeCatalog,
        poison_url_suffix: String,
        poison_id: Option<Uuid>,
    }

    #[async_trait]
    impl MetadataCatalog for FlakyCatalog {
        async fn find_all(&self) -> CatalogResult<Vec<MetadataRecord>> {
            self.inner.find_all().await
        }

        async fn insert(&self, record: NewMetadataRecord) -> CatalogResult<MetadataRecord> {
            if record.url.ends_with(&self.poison_url_suffix) {
                return Err(CatalogError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            self.inner.insert(record).await
        }

        async fn delete_by_id(&self, id: Uuid) -> CatalogResult<()> {
            if Some(id) == self.poison_id {
                return Err(CatalogError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            self.inner.delete_by_id(id).await
        }
    }

    #[test]
    fn mime_guess_by_extension() {
        assert_eq!(guess_mime_type("files/image/123-test.jpg"), "image/jpeg");
        assert_eq!(guess_mime_type("REPORT.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("files/blob"), DEFAULT_MIME_TYPE);
        assert_eq!(guess_mime_type("archive.tar.unknown"), DEFAULT_MIME_TYPE);
    }

    #[tokio::test]
    async fn create_pass_builds_system_record() {
        let catalog = Arc::new(FakeCatalog::default());
        let mut notifier = MockEventNotifier::new();
        notifier.expect_publish_deleted().never();

        let executor = RepairExecutor::new(catalog.clone(), Arc::new(notifier), codec());
        let report = executor
            .apply(ReconciliationResult {
                missing_in_catalog: vec![object("files/image/123-test.jpg")],
                missing_in_store: vec![],
            })
            .await;

        assert_eq!(report.created, 1);
        let rows = catalog.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].url,
            format!("{}/{}/files/image/123-test.jpg", ENDPOINT, BUCKET)
        );
        assert_eq!(rows[0].name, "test.jpg");
        assert_eq!(rows[0].mime_type, "image/jpeg");
        assert_eq!(rows[0].uploaded_by, SYSTEM_ACTOR);
    }

    #[tokio::test]
    async fn delete_pass_publishes_event_per_deleted_row() {
        let stale = record("files/doc/9-old.pdf");
        let catalog = Arc::new(FakeCatalog::with_rows(vec![stale.clone()]));

        let mut notifier = MockEventNotifier::new();
        let expected_id = stale.id;
        let expected_name = stale.name.clone();
        notifier
            .expect_publish_deleted()
            .withf(move |event| {
                event.record_id == expected_id
                    && event.display_name == expected_name
                    && event.actor == SYSTEM_ACTOR
            })
            .times(1)
            .return_const(());

        let executor = RepairExecutor::new(catalog.clone(), Arc::new(notifier), codec());
        let report = executor
            .apply(ReconciliationResult {
                missing_in_catalog: vec![],
                missing_in_store: vec![stale],
            })
            .await;

        assert_eq!(report.deleted, 1);
        assert_eq!(report.events_published, 1);
        assert!(catalog.rows().is_empty());
    }

    #[tokio::test]
    async fn one_bad_item_does_not_stop_either_pass() {
        let poisoned = record("files/b.txt");
        let healthy = record("files/c.txt");
        let catalog = Arc::new(FlakyCatalog {
            inner: FakeCatalog::with_rows(vec![poisoned.clone(), healthy.clone()]),
            poison_url_suffix: "files/a-bad.txt".into(),
            poison_id: Some(poisoned.id),
        });

        let mut notifier = MockEventNotifier::new();
        let healthy_id = healthy.id;
        notifier
            .expect_publish_deleted()
            .withf(move |event| event.record_id == healthy_id)
            .times(1)
            .return_const(());

        let executor = RepairExecutor::new(catalog.clone(), Arc::new(notifier), codec());
        let report = executor
            .apply(ReconciliationResult {
                missing_in_catalog: vec![object("files/a-bad.txt"), object("files/a-good.txt")],
                missing_in_store: vec![poisoned.clone(), healthy],
            })
            .await;

        assert_eq!(report.created, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].direction, RepairDirection::CreateInCatalog);
        assert_eq!(report.failures[0].item, "files/a-bad.txt");
        assert_eq!(report.failures[1].direction, RepairDirection::DeleteFromCatalog);
        assert_eq!(report.failures[1].item, poisoned.id.to_string());

        let remaining: Vec<_> = catalog.inner.rows().into_iter().map(|r| r.url).collect();
        assert!(remaining.contains(&poisoned.url));
        assert!(remaining.iter().any(|url| url.ends_with("files/a-good.txt")));
    }

    #[tokio::test]
    async fn dry_run_touches_nothing() {
        let stale = record("files/old.txt");
        let catalog = Arc::new(FakeCatalog::with_rows(vec![stale.clone()]));
        let mut notifier = MockEventNotifier::new();
        notifier.expect_publish_deleted().never();

        let executor =
            RepairExecutor::new(catalog.clone(), Arc::new(notifier), codec()).dry_run(true);
        let report = executor
            .apply(ReconciliationResult {
                missing_in_catalog: vec![object("files/new.txt")],
                missing_in_store: vec![stale.clone()],
            })
            .await;

        assert!(report.dry_run);
        assert_eq!((report.created, report.deleted), (0, 0));
        assert_eq!(catalog.rows(), vec![stale]);
    }
}
