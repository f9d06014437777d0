//! End-to-end behavior of the catalog facade against an in-memory remote.

use std::sync::Arc;
use std::time::Duration;

use dealfront_remote::{MemoryRemoteStore, RemoteCatalogStore, RemoteRecord};
use dealfront_sync::prelude::*;
use dealfront_sync::{CatalogFacade, RemoteOutcome};
use serde_json::json;

fn config() -> SyncConfig {
    SyncConfig::default()
        .with_remote_retries(0)
        .with_remote_timeout(Duration::from_millis(500))
}

fn facade(remote: &MemoryRemoteStore) -> CatalogFacade {
    CatalogFacade::builder()
        .remote(Arc::new(remote.clone()))
        .config(config())
        .build()
        .unwrap()
}

fn widget() -> NewProduct {
    NewProduct::new("Widget", Price::from_decimal(100.0), Price::from_decimal(80.0))
        .with_affiliate_link("https://x")
}

fn record(value: serde_json::Value) -> RemoteRecord {
    serde_json::from_value(value).unwrap()
}

/// Let spawned tasks catch up.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn test_create_reaches_mirror_and_remote() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;

    let created = catalog.products().create(widget()).await.unwrap();
    assert_eq!(created.remote, RemoteOutcome::Synced);
    let product = created.value;
    assert!(!product.id.is_blank());
    assert_eq!(product.name, "Widget");
    assert_eq!(product.rounded_discount_percent(), 20);

    let listed: Vec<_> = catalog
        .products()
        .list()
        .into_iter()
        .filter(|p| *p == product)
        .collect();
    assert_eq!(listed.len(), 1);

    let stored = remote.snapshot("products");
    let on_remote = stored.iter().find(|r| r.id == product.id.as_str()).unwrap();
    assert_eq!(on_remote.fields["name"], "Widget");
    assert_eq!(on_remote.fields["affiliateLink"], "https://x");

    settle().await;
    assert!(catalog.products().list().contains(&product));
}

#[tokio::test(start_paused = true)]
async fn test_sequential_creates_get_distinct_ids() {
    let catalog = CatalogFacade::builder().config(config()).build().unwrap();
    catalog.start().await;

    let mut ids = Vec::new();
    for _ in 0..5 {
        let created = catalog.products().create(widget()).await.unwrap();
        assert_eq!(created.remote, RemoteOutcome::LocalOnly);
        ids.push(created.value.id);
    }
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len());

    let widgets = catalog
        .products()
        .list()
        .into_iter()
        .filter(|p| p.name == "Widget")
        .count();
    assert_eq!(widgets, 5);
}

#[tokio::test(start_paused = true)]
async fn test_delete_missing_id_is_not_found() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;
    let before = catalog.products().list();

    let err = catalog.products().delete("no-such-id").await.unwrap_err();
    assert_eq!(err, SyncError::not_found(Collection::Products, "no-such-id"));
    assert_eq!(catalog.products().list(), before);
}

#[tokio::test(start_paused = true)]
async fn test_update_missing_id_is_not_found() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;
    let before = catalog.products().list();
    let calls = remote.calls();

    let ghost = Product::from_draft("ghost".to_string(), widget());
    let err = catalog.products().update(ghost).await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound { .. }));
    assert_eq!(catalog.products().list(), before);
    assert_eq!(remote.calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_update_and_delete_round_trip_remote() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;

    let mut product = catalog.products().create(widget()).await.unwrap().into_value();
    product.discount_price = Price::from_decimal(70.0);
    let updated = catalog.products().update(product.clone()).await.unwrap();
    assert!(updated.is_synced());
    assert_eq!(catalog.products().get(product.id.as_str()), Some(product.clone()));

    let on_remote = remote
        .snapshot("products")
        .into_iter()
        .find(|r| r.id == product.id.as_str())
        .unwrap();
    assert_eq!(on_remote.fields["discountPrice"], json!(70));

    let deleted = catalog.products().delete(product.id.as_str()).await.unwrap();
    assert_eq!(deleted.value, product);
    assert!(catalog.products().get(product.id.as_str()).is_none());
    assert!(remote.snapshot("products").iter().all(|r| r.id != product.id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_update_changes_nothing() {
    let catalog = CatalogFacade::builder().config(config()).build().unwrap();
    catalog.start().await;

    let mut product = catalog.products().list().remove(0);
    let before = catalog.products().list();
    product.name.clear();
    let err = catalog.products().update(product).await.unwrap_err();
    assert!(matches!(err, SyncError::ValidationFailed(_)));
    assert_eq!(catalog.products().list(), before);
}

#[tokio::test(start_paused = true)]
async fn test_offline_remote_defers_but_keeps_local_write() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;
    let mut notices = catalog.notices();

    remote.set_online(false);
    let created = catalog.products().create(widget()).await.unwrap();
    assert!(matches!(created.remote, RemoteOutcome::Deferred(SyncError::RemoteUnavailable(_))));
    assert!(catalog.products().list().contains(&created.value));

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.collection, Some(Collection::Products));

    // Converges on the next full sync.
    remote.set_online(true);
    let report = catalog.sync_all().await.unwrap();
    assert!(report.is_complete());
    assert!(remote
        .snapshot("products")
        .iter()
        .any(|r| r.id == created.value.id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn test_update_of_entity_never_pushed_falls_back_to_put() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;

    remote.set_online(false);
    let mut product = catalog.products().create(widget()).await.unwrap().into_value();
    remote.set_online(true);

    product.name = "Widget Pro".to_string();
    let updated = catalog.products().update(product.clone()).await.unwrap();
    assert!(updated.is_synced());
    let on_remote = remote
        .snapshot("products")
        .into_iter()
        .find(|r| r.id == product.id.as_str())
        .unwrap();
    assert_eq!(on_remote.fields["name"], "Widget Pro");
}

#[tokio::test(start_paused = true)]
async fn test_slow_remote_echo_does_not_roll_back_newer_writes() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;
    remote.set_latency(Duration::from_millis(100));

    let banners = catalog.banners();
    let first = banners.create(NewBanner::new("First", BannerPosition::Top));
    let second = banners.create(NewBanner::new("Second", BannerPosition::Bottom));
    let (first, second) = tokio::join!(first, second);
    let (first, second) = (first.unwrap().into_value(), second.unwrap().into_value());

    settle().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    let banners = catalog.banners().list();
    assert!(banners.contains(&first));
    assert!(banners.contains(&second));
}

#[tokio::test(start_paused = true)]
async fn test_hung_remote_does_not_delay_local_writes() {
    let remote = MemoryRemoteStore::new();
    let catalog = CatalogFacade::builder()
        .remote(Arc::new(remote.clone()))
        .config(
            SyncConfig::default()
                .with_remote_retries(1)
                .with_remote_timeout(Duration::from_secs(3)),
        )
        .build()
        .unwrap();
    catalog.start().await;
    remote.set_latency(Duration::from_secs(30));

    let banners = catalog.banners();
    let first = banners.create(NewBanner::new("A", BannerPosition::Top));
    let second = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        banners.create(NewBanner::new("B", BannerPosition::Top)).await
    };
    let check = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let titles: Vec<String> = catalog.banners().list().into_iter().map(|b| b.title).collect();
        assert!(titles.contains(&"A".to_string()));
        assert!(titles.contains(&"B".to_string()));
    };
    let (first, second, ()) = tokio::join!(first, second, check);

    assert!(matches!(first.unwrap().remote, RemoteOutcome::Deferred(_)));
    assert!(matches!(second.unwrap().remote, RemoteOutcome::Deferred(_)));
    assert_eq!(catalog.banners().list().len(), Banner::defaults().len() + 2);
}

#[tokio::test(start_paused = true)]
async fn test_echo_held_while_writes_pending_then_applied() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;
    remote.set_latency(Duration::from_millis(200));

    // The other client's write lands while ours is still in flight, so its
    // snapshot lacks our widget and must wait instead of rolling it back.
    let other_client_write = async {
        remote
            .put(
                "products",
                record(json!({"id": "r9", "name": "Remote", "originalPrice": 5, "discountPrice": 4})),
            )
            .await
            .unwrap();
    };
    let products = catalog.products();
    let ours = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let created = products.create(widget()).await.unwrap();
        assert!(catalog.products().list().contains(&created.value));
        created
    };
    let ((), created) = tokio::join!(other_client_write, ours);
    assert!(created.is_synced());

    settle().await;
    let listed = catalog.products().list();
    assert!(listed.contains(&created.value));
    assert!(catalog.products().get("r9").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_other_client_changes_arrive_by_subscription() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;
    let mut changes = catalog.subscribe_changes();

    let other_client = remote.clone();
    other_client
        .put(
            "products",
            record(json!({
                "id": "r1",
                "name": "Widget",
                "originalPrice": 100,
                "discountPrice": 80,
                "affiliateLink": "https://x"
            })),
        )
        .await
        .unwrap();
    settle().await;

    let product = catalog.products().get("r1").unwrap();
    assert_eq!(product.rounded_discount_percent(), 20);
    let event = changes.try_recv().unwrap();
    assert_eq!(event.collection, Collection::Products);
    assert_eq!(event.source, ChangeSource::Remote);
}

#[tokio::test(start_paused = true)]
async fn test_banner_changes_leave_other_collections_alone() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;
    let products = catalog.products().list();
    let deal = catalog.current_deal();

    let banner = catalog
        .banners()
        .create(NewBanner::new("Flash", BannerPosition::Middle))
        .await
        .unwrap()
        .into_value();
    let mut toggled = banner.clone();
    toggled.active = false;
    catalog.banners().update(toggled).await.unwrap();
    catalog.banners().delete(banner.id.as_str()).await.unwrap();
    settle().await;

    assert_eq!(catalog.products().list(), products);
    assert_eq!(catalog.current_deal(), deal);
}

#[tokio::test(start_paused = true)]
async fn test_discount_above_original_is_accepted() {
    let catalog = CatalogFacade::builder().config(config()).build().unwrap();
    catalog.start().await;

    let odd = NewProduct::new("Odd", Price::from_decimal(50.0), Price::from_decimal(60.0));
    let product = catalog.products().create(odd).await.unwrap().into_value();
    assert!(product.discount_percent() < 0.0);
    assert!(product.has_price_anomaly());
}

#[tokio::test(start_paused = true)]
async fn test_new_deal_replaces_current_one() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;
    let old = catalog.current_deal().unwrap();

    let draft = NewDailyDeal::new(
        NewProduct::new("Kettle", Price::from_decimal(40.0), Price::from_decimal(30.0)),
        25,
    );
    let deal = catalog.daily_deal().create(draft).await.unwrap();
    assert!(deal.is_synced());
    assert_eq!(catalog.daily_deal().list(), vec![deal.value.clone()]);

    let on_remote = remote.snapshot("dailyDeals");
    assert_eq!(on_remote.len(), 1);
    assert_eq!(on_remote[0].id, deal.value.id.as_str());
    assert_ne!(on_remote[0].id, old.id.as_str());

    let cleared = catalog.clear_deal().await.unwrap().unwrap();
    assert_eq!(cleared.value, deal.value);
    assert_eq!(catalog.current_deal(), None);
    assert!(!catalog.mirror().exists("dailyDeal").unwrap());
    assert!(catalog.clear_deal().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_full_sync_keeps_remote_only_entities() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;

    remote.seed(
        "banners",
        vec![record(json!({ "id": "remote-only", "title": "Elsewhere", "position": "top" }))],
    );
    let report = catalog.sync_all().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(
        report.pushed,
        catalog.products().list().len() + catalog.banners().list().len() + 1
    );

    let banners = remote.snapshot("banners");
    assert!(banners.iter().any(|r| r.id == "remote-only"));
    for banner in catalog.banners().list() {
        assert!(banners.iter().any(|r| r.id == banner.id.as_str()));
    }
}

#[tokio::test(start_paused = true)]
async fn test_sync_failures_are_reported_per_entity() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;

    remote.set_online(false);
    let report = catalog.sync_all().await.unwrap();
    assert_eq!(report.pushed, 0);
    assert!(!report.is_complete());
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f.error, SyncError::RemoteUnavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn test_sync_without_remote_is_empty() {
    let catalog = CatalogFacade::builder().config(config()).build().unwrap();
    catalog.start().await;
    let mut notices = catalog.notices();

    let report = catalog.sync_all().await.unwrap();
    assert_eq!(report, SyncReport::default());
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Info);
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_mirror_lists_defaults_with_notice() {
    let catalog = CatalogFacade::builder()
        .config(config().with_seed_defaults(false))
        .build()
        .unwrap();
    catalog.start().await;
    catalog
        .mirror()
        .set("products", &json!([{ "id": "x", "name": "" }]))
        .unwrap();
    let mut notices = catalog.notices();

    assert_eq!(catalog.products().list(), Product::defaults());
    assert!(catalog.products().try_list().is_err());
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Error);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_following_remote() {
    let remote = MemoryRemoteStore::new();
    let catalog = facade(&remote);
    catalog.start().await;
    catalog.shutdown().await;

    remote
        .put(
            "products",
            record(json!({ "id": "late", "name": "Late", "originalPrice": 1, "discountPrice": 1 })),
        )
        .await
        .unwrap();
    settle().await;
    assert!(catalog.products().get("late").is_none());
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = CatalogFacade::builder()
        .config(SyncConfig::default().with_poll_interval(Duration::from_millis(10)))
        .build()
        .unwrap_err();
    assert!(matches!(err, SyncError::InvalidConfig(_)));
}
