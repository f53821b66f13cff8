use std::time::Duration;

use chrono::Utc;

use porchlight_core::event::{DeviceType, NewVisitorEvent};
use porchlight_core::store::{StoreQuery, VisitorFilter, VisitorStore};
use porchlight_duckdb::DuckDbStore;

fn sample(page: &str, session: &str, browser: &str, country: Option<&str>) -> NewVisitorEvent {
    NewVisitorEvent {
        page: page.to_string(),
        session_id: session.to_string(),
        is_new_session: false,
        device_type: DeviceType::Desktop,
        browser: browser.to_string(),
        os: "Linux".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
        referrer: String::new(),
        language: "en".to_string(),
        screen_resolution: "1920x1080".to_string(),
        timezone: "UTC".to_string(),
        country: country.map(str::to_string),
        city: None,
        ip: None,
    }
}

/// Insert with a short pause so successive write timestamps are distinct at
/// microsecond resolution.
async fn insert_spaced(store: &DuckDbStore, event: NewVisitorEvent) -> String {
    let record = store.insert(event).await.expect("insert");
    tokio::time::sleep(Duration::from_millis(2)).await;
    record.id
}

#[tokio::test]
async fn insert_assigns_identity_and_round_trips() {
    let store = DuckDbStore::open_in_memory().expect("db");
    let before = Utc::now();
    let record = store
        .insert(sample("/about", "s1", "Firefox", Some("Iceland")))
        .await
        .expect("insert");

    assert!(!record.id.is_empty());
    assert!(record.timestamp >= before);

    let fetched = store
        .get(&record.id)
        .await
        .expect("get")
        .expect("record exists");
    assert_eq!(fetched.page, "/about");
    assert_eq!(fetched.session_id, "s1");
    assert_eq!(fetched.device_type, DeviceType::Desktop);
    assert_eq!(fetched.country.as_deref(), Some("Iceland"));
    assert_eq!(fetched.city, None);
}

#[tokio::test]
async fn get_unknown_id_returns_none() {
    let store = DuckDbStore::open_in_memory().expect("db");
    assert!(store.get("ghost").await.expect("get").is_none());
}

#[tokio::test]
async fn query_orders_newest_first_and_paginates() {
    let store = DuckDbStore::open_in_memory().expect("db");
    let mut ids = Vec::new();
    for n in 0..5 {
        ids.push(insert_spaced(&store, sample(&format!("/p{n}"), "s", "Chrome", None)).await);
    }

    let query = StoreQuery {
        limit: Some(2),
        offset: 0,
        ..StoreQuery::default()
    };
    let page = store.query(&query).await.expect("query");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, ids[4], "most recent insert comes first");
    assert_eq!(page[1].id, ids[3]);

    let query = StoreQuery {
        limit: Some(2),
        offset: 4,
        ..StoreQuery::default()
    };
    let tail = store.query(&query).await.expect("query");
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].id, ids[0]);
}

#[tokio::test]
async fn query_applies_since_and_equality_filters() {
    let store = DuckDbStore::open_in_memory().expect("db");
    insert_spaced(&store, sample("/", "s1", "Chrome", Some("Iceland"))).await;
    insert_spaced(&store, sample("/", "s2", "Firefox", Some("Iceland"))).await;
    insert_spaced(&store, sample("/blog", "s3", "Firefox", None)).await;

    let query = StoreQuery {
        filter: VisitorFilter {
            browser: Some("Firefox".to_string()),
            country: Some("Iceland".to_string()),
            ..VisitorFilter::default()
        },
        ..StoreQuery::default()
    };
    let rows = store.query(&query).await.expect("query");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].session_id, "s2");

    // A lower bound in the future excludes everything.
    let query = StoreQuery::since(Utc::now() + chrono::Duration::days(1));
    assert!(store.query(&query).await.expect("query").is_empty());
}

#[tokio::test]
async fn count_ignores_pagination() {
    let store = DuckDbStore::open_in_memory().expect("db");
    for n in 0..7 {
        insert_spaced(&store, sample("/", &format!("s{n}"), "Chrome", None)).await;
    }

    let query = StoreQuery {
        limit: Some(2),
        offset: 4,
        ..StoreQuery::default()
    };
    assert_eq!(store.count(&query.unpaginated()).await.expect("count"), 7);
}

#[tokio::test]
async fn ids_older_than_honours_cutoff() {
    let store = DuckDbStore::open_in_memory().expect("db");
    insert_spaced(&store, sample("/a", "s", "Chrome", None)).await;
    insert_spaced(&store, sample("/b", "s", "Chrome", None)).await;
    let cutoff = Utc::now();
    tokio::time::sleep(Duration::from_millis(2)).await;
    insert_spaced(&store, sample("/c", "s", "Chrome", None)).await;

    let old = store.ids_older_than(Some(cutoff)).await.expect("ids");
    assert_eq!(old.len(), 2);

    let all = store.ids_older_than(None).await.expect("ids");
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn delete_batch_removes_rows_and_ignores_unknown_ids() {
    let store = DuckDbStore::open_in_memory().expect("db");
    let keep = insert_spaced(&store, sample("/keep", "s", "Chrome", None)).await;
    let drop_a = insert_spaced(&store, sample("/a", "s", "Chrome", None)).await;
    let drop_b = insert_spaced(&store, sample("/b", "s", "Chrome", None)).await;

    store
        .delete_batch(&[drop_a.clone(), drop_b, "ghost".to_string()])
        .await
        .expect("delete");

    assert!(store.get(&keep).await.expect("get").is_some());
    assert!(store.get(&drop_a).await.expect("get").is_none());
    assert_eq!(store.count(&StoreQuery::default()).await.expect("count"), 1);
}

#[tokio::test]
async fn delete_batch_rejects_oversized_batches() {
    let store = DuckDbStore::open_in_memory().expect("db");
    let ids: Vec<String> = (0..501).map(|n| format!("id-{n}")).collect();
    assert!(store.delete_batch(&ids).await.is_err());
}

#[tokio::test]
async fn ping_succeeds_on_open_store() {
    let store = DuckDbStore::open_in_memory().expect("db");
    store.ping().await.expect("ping");
}
