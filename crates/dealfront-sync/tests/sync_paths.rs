//! Load precedence, cross-tab propagation, polling and durability.

use std::sync::Arc;
use std::time::Duration;

use dealfront_mirror::{FileStorage, LocalMirror, MemoryStorage, Storage, StorageBus};
use dealfront_remote::{FileRemoteStore, MemoryRemoteStore, RemoteRecord};
use dealfront_sync::prelude::*;
use dealfront_sync::CatalogFacade;
use serde_json::json;

fn config() -> SyncConfig {
    SyncConfig::default()
        .with_remote_retries(0)
        .with_poll_interval(Duration::from_secs(2))
}

fn record(value: serde_json::Value) -> RemoteRecord {
    serde_json::from_value(value).unwrap()
}

fn widget_record() -> RemoteRecord {
    record(json!({
        "id": "r1",
        "name": "Widget",
        "originalPrice": 100,
        "discountPrice": 80,
        "affiliateLink": "https://x"
    }))
}

#[tokio::test(start_paused = true)]
async fn test_non_empty_remote_wins_at_load() {
    let remote = MemoryRemoteStore::new();
    remote.seed("products", vec![widget_record()]);
    let mirror = LocalMirror::in_memory();
    mirror.set("products", &Product::defaults()).unwrap();

    let catalog = CatalogFacade::builder()
        .mirror(mirror)
        .remote(Arc::new(remote.clone()))
        .config(config())
        .build()
        .unwrap();
    let report = catalog.start().await;

    let products = report.get(Collection::Products).unwrap();
    assert_eq!(products.source, LoadSource::Remote);
    assert_eq!(products.count, 1);
    let listed = catalog.products().list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id.as_str(), "r1");
    assert_eq!(listed[0].rounded_discount_percent(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_empty_remote_keeps_local_snapshot() {
    let remote = MemoryRemoteStore::new();
    let mirror = LocalMirror::in_memory();
    let mine = Banner::from_draft("mine".to_string(), NewBanner::new("Mine", BannerPosition::Top));
    mirror.set("banners", &vec![mine.clone()]).unwrap();

    let catalog = CatalogFacade::builder()
        .mirror(mirror)
        .remote(Arc::new(remote))
        .config(config())
        .build()
        .unwrap();
    let report = catalog.start().await;

    assert_eq!(report.get(Collection::Banners).unwrap().source, LoadSource::Local);
    assert_eq!(catalog.banners().list(), vec![mine]);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_remote_falls_back_to_local_with_notice() {
    let remote = MemoryRemoteStore::new();
    remote.set_online(false);
    let mirror = LocalMirror::in_memory();
    mirror.set("products", &Product::defaults()[..1]).unwrap();

    let catalog = CatalogFacade::builder()
        .mirror(mirror)
        .remote(Arc::new(remote))
        .config(config().with_seed_defaults(false))
        .build()
        .unwrap();
    let mut notices = catalog.notices();
    let report = catalog.start().await;

    assert!(report.is_degraded());
    let products = report.get(Collection::Products).unwrap();
    assert_eq!(products.source, LoadSource::Local);
    assert!(matches!(products.remote_error, Some(SyncError::RemoteUnavailable(_))));
    assert_eq!(report.get(Collection::Banners).unwrap().source, LoadSource::Empty);
    assert_eq!(catalog.products().list().len(), 1);

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
}

#[tokio::test(start_paused = true)]
async fn test_defaults_seeded_and_pushed_when_both_empty() {
    let remote = MemoryRemoteStore::new();
    let catalog = CatalogFacade::builder()
        .remote(Arc::new(remote.clone()))
        .config(config())
        .build()
        .unwrap();
    let report = catalog.start().await;

    for collection in Collection::ALL {
        assert_eq!(report.get(collection).unwrap().source, LoadSource::Defaults);
    }
    assert_eq!(catalog.products().list(), Product::defaults());
    assert_eq!(catalog.current_deal(), DailyDeal::defaults().into_iter().next());
    assert_eq!(remote.snapshot("products").len(), Product::defaults().len());
    assert_eq!(remote.snapshot("dailyDeals").len(), 1);

    // A second start is a no-op.
    assert_eq!(catalog.start().await, report);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_remote_records_are_skipped() {
    let remote = MemoryRemoteStore::new();
    remote.seed(
        "products",
        vec![
            widget_record(),
            record(json!({ "id": "broken", "name": "No prices" })),
        ],
    );
    let catalog = CatalogFacade::builder()
        .remote(Arc::new(remote))
        .config(config())
        .build()
        .unwrap();
    let report = catalog.start().await;

    let products = report.get(Collection::Products).unwrap();
    assert_eq!(products.source, LoadSource::Remote);
    assert_eq!(products.count, 1);
    assert_eq!(products.rejected, 1);
    assert!(catalog.products().get("broken").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_other_tab_write_refreshes_view() {
    let first = CatalogFacade::builder().config(config()).build().unwrap();
    first.start().await;
    let second = CatalogFacade::builder()
        .mirror(first.mirror().open_tab())
        .config(config())
        .build()
        .unwrap();
    second.start().await;

    let view = second.view::<Banner>();
    let mut watch = view.watch();
    let mut changes = second.subscribe_changes();

    let banner = first
        .banners()
        .create(NewBanner::new("From the other tab", BannerPosition::Middle))
        .await
        .unwrap()
        .into_value();

    tokio::time::timeout(Duration::from_millis(500), watch.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(view.snapshot().contains(&banner));
    let event = changes.try_recv().unwrap();
    assert_eq!(event.collection, Collection::Banners);
    assert_eq!(event.source, ChangeSource::CrossTab);
    view.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_polling_catches_unannounced_write() {
    let storage = Arc::new(MemoryStorage::new());
    let mirror = LocalMirror::new(storage.clone(), StorageBus::new());
    let catalog = CatalogFacade::builder()
        .mirror(mirror)
        .config(config())
        .build()
        .unwrap();
    catalog.start().await;
    let view = catalog.view::<Product>();
    let mut watch = view.watch();

    // Written behind the mirror's back: no storage event, no change event.
    let raw = serde_json::to_string(&json!([{
        "id": "silent",
        "name": "Silent",
        "originalPrice": 10,
        "discountPrice": 9
    }]))
    .unwrap();
    storage.set_item("products", &raw).unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(view.snapshot(), Product::defaults());

    tokio::time::timeout(Duration::from_secs(3), watch.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.snapshot().len(), 1);
    assert_eq!(view.snapshot()[0].id.as_str(), "silent");
}

#[tokio::test(start_paused = true)]
async fn test_key_prefix_namespaces_the_mirror() {
    let catalog = CatalogFacade::builder()
        .config(config().with_key_prefix("shop"))
        .build()
        .unwrap();
    catalog.start().await;

    let keys = catalog.mirror().keys().unwrap();
    assert!(keys.contains(&"shop:products".to_string()));
    assert!(!keys.contains(&"products".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_file_mirror_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let created = {
        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
        let catalog = CatalogFacade::builder()
            .mirror(LocalMirror::new(storage, StorageBus::new()))
            .config(config())
            .build()
            .unwrap();
        catalog.start().await;
        let draft = NewProduct::new("Lamp", Price::from_decimal(40.0), Price::from_decimal(30.0));
        let created = catalog.products().create(draft).await.unwrap().into_value();
        catalog.shutdown().await;
        created
    };

    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let catalog = CatalogFacade::builder()
        .mirror(LocalMirror::new(storage, StorageBus::new()))
        .config(config())
        .build()
        .unwrap();
    let before = catalog.products().try_list().unwrap();
    let report = catalog.start().await;

    assert_eq!(report.get(Collection::Products).unwrap().source, LoadSource::Local);
    assert!(before.contains(&created));
    assert_eq!(catalog.products().list(), before);
}

#[tokio::test]
async fn test_two_clients_share_a_file_remote() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(FileRemoteStore::open(dir.path()).unwrap());

    let first = CatalogFacade::builder()
        .remote(remote.clone())
        .config(config())
        .build()
        .unwrap();
    first.start().await;
    let banner = first
        .banners()
        .create(NewBanner::new("Shared", BannerPosition::Bottom))
        .await
        .unwrap();
    assert!(banner.is_synced());

    // A fresh client with an empty mirror loads what the first one wrote.
    let reopened = FileRemoteStore::open(dir.path()).unwrap();
    let second = CatalogFacade::builder()
        .remote(Arc::new(reopened))
        .config(config())
        .build()
        .unwrap();
    let report = second.start().await;
    assert_eq!(report.get(Collection::Banners).unwrap().source, LoadSource::Remote);
    assert!(second.banners().list().contains(&banner.value));

    first.shutdown().await;
    second.shutdown().await;
}
