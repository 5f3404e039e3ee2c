//! End-to-end runs against the on-disk object store and a SQLite catalog.

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::{Arc, Mutex};
use store_reconciler::{
    build_job,
    config::{AppConfig, Args},
    models::{
        event::DeletionEvent,
        metadata_record::{NewMetadataRecord, SYSTEM_ACTOR},
        reconciliation::RunOutcome,
    },
    run_migrations,
    services::{
        catalog::{MetadataCatalog, SqliteCatalog},
        key_codec::KeyCodec,
        notifier::EventNotifier,
        object_store::LocalObjectStore,
        reconciler::{ReconcileError, ReconciliationJob},
        repair::RepairExecutor,
        snapshot::SnapshotReader,
    },
};

const ENDPOINT: &str = "https://files.example.com";
const BUCKET: &str = "uploads";

#[derive(Default)]
struct CollectingNotifier {
    events: Mutex<Vec<DeletionEvent>>,
}

#[async_trait]
impl EventNotifier for CollectingNotifier {
    async fn publish_deleted(&self, event: DeletionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: LocalObjectStore,
    catalog: Arc<SqliteCatalog>,
    notifier: Arc<CollectingNotifier>,
    job: ReconciliationJob,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(BUCKET)).unwrap();
    let store = LocalObjectStore::new(dir.path(), BUCKET);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    let catalog = Arc::new(SqliteCatalog::new(Arc::new(pool)));
    let notifier = Arc::new(CollectingNotifier::default());

    let codec = KeyCodec::new(ENDPOINT, BUCKET);
    let reader = SnapshotReader::new(Arc::new(store.clone()), catalog.clone(), "files/");
    let executor = RepairExecutor::new(catalog.clone(), notifier.clone(), codec);
    let job = ReconciliationJob::new(reader, executor);

    Fixture {
        _dir: dir,
        store,
        catalog,
        notifier,
        job,
    }
}

fn uploaded(key: &str, name: &str) -> NewMetadataRecord {
    NewMetadataRecord {
        name: name.into(),
        url: format!("{}/{}/{}", ENDPOINT, BUCKET, key),
        size_bytes: 5,
        mime_type: "text/plain".into(),
        uploaded_by: "2b9c7e0e-6a8f-4d1b-9a8e-0c4f1d2e3a4b".into(),
    }
}

#[tokio::test]
async fn repairs_both_directions_then_settles() {
    let fx = fixture().await;

    fx.store
        .put_object("files/image/123-test.jpg", Bytes::from_static(b"jpeg!"))
        .await
        .unwrap();
    fx.store
        .put_object("files/doc/77-kept.txt", Bytes::from_static(b"hello"))
        .await
        .unwrap();
    fx.catalog
        .insert(uploaded("files/doc/77-kept.txt", "kept.txt"))
        .await
        .unwrap();
    let stale = fx
        .catalog
        .insert(uploaded("files/doc/88-lost.txt", "lost.txt"))
        .await
        .unwrap();

    let outcome = fx.job.run_reconciliation().await.unwrap();
    let summary = outcome.summary().expect("run completed");
    assert_eq!(summary.store_objects, 2);
    assert_eq!(summary.catalog_records, 2);
    assert_eq!(summary.repairs.created, 1);
    assert_eq!(summary.repairs.deleted, 1);
    assert!(summary.repairs.failures.is_empty());

    let rows = fx.catalog.find_all().await.unwrap();
    assert_eq!(rows.len(), 2);
    let repaired = rows
        .iter()
        .find(|r| r.uploaded_by == SYSTEM_ACTOR)
        .expect("repaired row");
    assert_eq!(
        repaired.url,
        "https://files.example.com/uploads/files/image/123-test.jpg"
    );
    assert_eq!(repaired.name, "test.jpg");
    assert_eq!(repaired.size_bytes, 5);
    assert_eq!(repaired.mime_type, "image/jpeg");
    assert!(rows.iter().all(|r| r.id != stale.id));

    {
        let events = fx.notifier.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].record_id, stale.id);
        assert_eq!(events[0].display_name, "lost.txt");
        assert_eq!(events[0].actor, SYSTEM_ACTOR);
    }

    let second = fx.job.run_reconciliation().await.unwrap();
    let summary = second.summary().expect("run completed");
    assert_eq!(summary.missing_in_catalog + summary.missing_in_store, 0);
    assert_eq!(fx.catalog.find_all().await.unwrap().len(), 2);
    assert_eq!(fx.notifier.events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn object_deleted_from_store_is_removed_from_catalog() {
    let fx = fixture().await;
    fx.store
        .put_object("files/doc/1-a.txt", Bytes::from_static(b"a"))
        .await
        .unwrap();

    let first = fx.job.run_reconciliation().await.unwrap();
    assert!(matches!(first, RunOutcome::Completed(_)));
    assert_eq!(fx.catalog.find_all().await.unwrap().len(), 1);

    std::fs::remove_file(fx.store.object_path("files/doc/1-a.txt")).unwrap();
    fx.job.run_reconciliation().await.unwrap();

    assert!(fx.catalog.find_all().await.unwrap().is_empty());
    assert_eq!(fx.notifier.events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_bucket_aborts_run_and_leaves_catalog_untouched() {
    let fx = fixture().await;
    fx.catalog
        .insert(uploaded("files/doc/2-b.txt", "b.txt"))
        .await
        .unwrap();
    std::fs::remove_dir_all(fx.store.base_path.join(BUCKET)).unwrap();

    let err = fx.job.run_reconciliation().await.unwrap_err();
    assert!(matches!(err, ReconcileError::StoreSnapshot(_)));
    assert_eq!(fx.catalog.find_all().await.unwrap().len(), 1);
    assert!(fx.notifier.events.lock().unwrap().is_empty());
    assert!(!fx.job.is_running());
}

#[tokio::test]
async fn job_built_from_config_never_creates_the_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let storage_dir = dir.path().join("unmounted");
    let (cfg, _) = AppConfig::from_args(Args {
        storage_dir: Some(storage_dir.display().to_string()),
        store_endpoint: Some(ENDPOINT.into()),
        bucket: Some(BUCKET.into()),
        prefix: Some("files/".into()),
        legacy_locations: Some(String::new()),
        webhook_url: Some(String::new()),
        ..Default::default()
    })
    .unwrap();

    let pool = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap(),
    );
    run_migrations(&pool).await.unwrap();
    let catalog = SqliteCatalog::new(pool.clone());
    catalog
        .insert(uploaded("files/doc/3-c.txt", "c.txt"))
        .await
        .unwrap();

    let job = build_job(&cfg, pool).unwrap();
    let err = job.run_reconciliation().await.unwrap_err();

    assert!(matches!(err, ReconcileError::StoreSnapshot(_)));
    assert_eq!(catalog.find_all().await.unwrap().len(), 1);
    assert!(!storage_dir.join(BUCKET).exists());
}
