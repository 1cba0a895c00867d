use std::time::Duration;

use serde_json::json;
use surreal::{CachePolicy, ClientConfig, Value};

use crate::setup;

fn cached_config(policy: CachePolicy) -> ClientConfig {
    ClientConfig::default().cache(policy)
}

#[tokio::test]
async fn cache_hit_skips_the_server() {
    let (server, session) = setup(cached_config(CachePolicy::default())).await;
    server.set_fixture("users", json!([{ "id": "users:a", "age": 30 }]));

    let first = session.select_value("users").await.unwrap();
    let second = session.select_value("users").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        server.calls_for("select"),
        1,
        "second select must come from the cache"
    );

    session.disconnect().await;
}

#[tokio::test]
async fn mutation_invalidates_the_table() {
    let (server, session) = setup(cached_config(CachePolicy::default())).await;
    server.set_fixture("users", json!([{ "id": "users:a", "age": 30 }]));

    session.select_value("users").await.unwrap();
    assert_eq!(server.calls_for("select"), 1);

    let _created: Value = session
        .create("users", Some(json!({ "name": "B", "age": 25 })))
        .await
        .unwrap();

    // The cached array is gone; this select must re-dispatch.
    session.select_value("users").await.unwrap();
    assert_eq!(server.calls_for("select"), 2);

    session.disconnect().await;
}

#[tokio::test]
async fn mutations_leave_other_tables_cached() {
    let (server, session) = setup(cached_config(CachePolicy::default())).await;
    server.set_fixture("users", json!([{ "id": "users:a" }]));
    server.set_fixture("orders", json!([{ "id": "orders:1" }]));

    session.select_value("users").await.unwrap();
    session.select_value("orders").await.unwrap();

    session.delete("users").await.unwrap();

    session.select_value("orders").await.unwrap();
    session.select_value("users").await.unwrap();
    // orders stayed cached; users re-dispatched.
    assert_eq!(server.calls_for("select"), 3);

    session.disconnect().await;
}

#[tokio::test]
async fn ttl_expiry_forces_a_fresh_dispatch() {
    let policy = CachePolicy {
        default_ttl: Some(Duration::from_secs(1)),
        ..CachePolicy::default()
    };
    let (server, session) = setup(cached_config(policy)).await;
    server.set_fixture("x", json!([{ "id": "x:1" }]));

    session.select_value("x").await.unwrap();
    session.select_value("x").await.unwrap();
    assert_eq!(server.calls_for("select"), 1);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    session.select_value("x").await.unwrap();
    assert_eq!(server.calls_for("select"), 2, "expired entry must miss");

    session.disconnect().await;
}

#[tokio::test]
async fn invalidate_all_clears_every_entry() {
    let (server, session) = setup(cached_config(CachePolicy::default())).await;
    server.set_fixture("a", json!([1]));
    server.set_fixture("b", json!([2]));

    session.select_value("a").await.unwrap();
    session.select_value("b").await.unwrap();

    session.cache().unwrap().invalidate_all().await;

    session.select_value("a").await.unwrap();
    session.select_value("b").await.unwrap();
    assert_eq!(server.calls_for("select"), 4);

    session.disconnect().await;
}

#[tokio::test]
async fn plain_query_is_never_cached() {
    let (server, session) = setup(cached_config(CachePolicy::default())).await;

    session.query("SELECT * FROM users", None).await.unwrap();
    session.query("SELECT * FROM users", None).await.unwrap();
    assert_eq!(server.calls_for("query"), 2);

    session.disconnect().await;
}

#[tokio::test]
async fn query_with_tables_caches_and_invalidates() {
    let (server, session) = setup(cached_config(CachePolicy::default())).await;

    session
        .query_with_tables("SELECT * FROM users", None, &["users"])
        .await
        .unwrap();
    session
        .query_with_tables("SELECT * FROM users", None, &["users"])
        .await
        .unwrap();
    assert_eq!(server.calls_for("query"), 1);

    session.delete("users").await.unwrap();

    session
        .query_with_tables("SELECT * FROM users", None, &["users"])
        .await
        .unwrap();
    assert_eq!(server.calls_for("query"), 2);

    session.disconnect().await;
}
