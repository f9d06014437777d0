//! Export and import through the facade.

use std::sync::Arc;

use dealfront_mirror::{LocalMirror, MemoryStorage, Storage, StorageBus};
use dealfront_remote::MemoryRemoteStore;
use dealfront_sync::prelude::*;
use dealfront_sync::{export_entities, CatalogFacade};

async fn started(remote: &MemoryRemoteStore) -> CatalogFacade {
    let catalog = CatalogFacade::builder()
        .remote(Arc::new(remote.clone()))
        .config(SyncConfig::default().with_remote_retries(0))
        .build()
        .unwrap();
    catalog.start().await;
    catalog
}

#[tokio::test(start_paused = true)]
async fn test_export_then_import_restores_collection() {
    let remote = MemoryRemoteStore::new();
    let catalog = started(&remote).await;

    let exported = catalog.export(Collection::Products).unwrap();
    let original = catalog.products().list();
    for product in &original {
        catalog.products().delete(product.id.as_str()).await.unwrap();
    }
    assert!(catalog.products().list().is_empty());

    let report = catalog.import_products(&exported).await.unwrap();
    assert_eq!(report.collection, Collection::Products);
    assert_eq!(report.imported, original.len());
    assert_eq!(report.replaced, 0);
    assert!(report.sync.is_complete());
    assert_eq!(catalog.products().list(), original);
    assert_eq!(remote.snapshot("products").len(), original.len());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_import_leaves_mirror_untouched() {
    let remote = MemoryRemoteStore::new();
    let catalog = started(&remote).await;
    let before = catalog.products().list();
    let calls = remote.calls();
    let mut notices = catalog.notices();

    let not_an_array = r#"{"id":"p1","name":"Lamp","originalPrice":10,"discountPrice":5}"#;
    assert!(matches!(
        catalog.import_products(not_an_array).await,
        Err(SyncError::ValidationFailed(ValidationError::NotASequence(_)))
    ));

    let partly_broken = r#"[
        {"id":"p1","name":"Lamp","originalPrice":10,"discountPrice":5},
        {"id":"p2","name":"","originalPrice":10,"discountPrice":5}
    ]"#;
    assert!(catalog.import_products(partly_broken).await.is_err());

    assert_eq!(catalog.products().list(), before);
    assert_eq!(remote.calls(), calls);
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Error);
}

#[tokio::test(start_paused = true)]
async fn test_import_replaces_and_notifies() {
    let remote = MemoryRemoteStore::new();
    let catalog = started(&remote).await;
    let replaced = catalog.banners().list().len();
    let mut changes = catalog.subscribe_changes();

    let payload = r#"[
        {"id":"b-imported","title":"Imported","position":"bottom","active":false}
    ]"#;
    let report = catalog
        .import_collection(Collection::Banners, payload)
        .await
        .unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.replaced, replaced);

    let banners = catalog.banners().list();
    assert_eq!(banners.len(), 1);
    assert!(!banners[0].active);
    assert_eq!(banners[0].position, BannerPosition::Bottom);

    let event = changes.try_recv().unwrap();
    assert_eq!(event.collection, Collection::Banners);
    assert_eq!(event.source, ChangeSource::Local);
}

#[tokio::test(start_paused = true)]
async fn test_import_with_offline_remote_is_kept_locally() {
    let remote = MemoryRemoteStore::new();
    let catalog = started(&remote).await;
    remote.set_online(false);

    let exported = catalog.export(Collection::DailyDeal).unwrap();
    let report = catalog.import::<DailyDeal>(&exported).await.unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.sync.pushed, 0);
    assert_eq!(report.sync.failures.len(), 1);
    assert!(catalog.current_deal().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_import_recovers_corrupt_mirror() {
    let storage = Arc::new(MemoryStorage::new());
    let catalog = CatalogFacade::builder()
        .mirror(LocalMirror::new(storage.clone(), StorageBus::new()))
        .build()
        .unwrap();
    catalog.start().await;
    storage.set_item("products", r#"[{"id":"x","name":""}]"#).unwrap();
    assert!(catalog.products().try_list().is_err());

    let backup = export_entities(&Product::defaults()).unwrap();
    let report = catalog.import_products(&backup).await.unwrap();

    assert_eq!(report.replaced, 0);
    assert_eq!(report.imported, Product::defaults().len());
    assert_eq!(catalog.products().try_list().unwrap(), Product::defaults());
}
