use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use surreal::{Action, CachePolicy, ClientConfig, Error, Value};

use crate::setup;

#[tokio::test]
async fn live_fans_out_to_every_subscriber_once() {
    let (server, session) = setup(ClientConfig::default()).await;

    let (sid, mut stream1) = session.live("products", false).await.unwrap();
    let mut stream2 = session.subscribe_live(&sid).await.unwrap();

    server.notify(&sid, "CREATE", json!({ "name": "P" }));

    for stream in [&mut stream1, &mut stream2] {
        let notification = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("notification should arrive")
            .expect("stream should be open");
        assert_eq!(notification.action, Action::Create);
        assert_eq!(notification.subscription_id, sid);
        let data = notification.data.as_object().unwrap();
        assert_eq!(data["name"], Value::Strand("P".into()));
    }

    // Exactly once: nothing further is buffered on either stream.
    for stream in [&mut stream1, &mut stream2] {
        let extra = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(extra.is_err(), "unexpected extra notification");
    }

    session.kill(&sid).await.unwrap();
    assert!(stream1.next().await.is_none());
    assert!(stream2.next().await.is_none());

    session.disconnect().await;
}

#[tokio::test]
async fn notifications_preserve_server_order() {
    let (server, session) = setup(ClientConfig::default()).await;
    let (sid, mut stream) = session.live("products", false).await.unwrap();

    for i in 0..10 {
        server.notify(&sid, "UPDATE", json!({ "seq": i }));
    }

    for i in 0..10 {
        let notification = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            notification.data.as_object().unwrap()["seq"],
            Value::Int(i),
            "out of order delivery"
        );
    }

    session.disconnect().await;
}

#[tokio::test]
async fn close_notification_finishes_the_streams() {
    let (server, session) = setup(ClientConfig::default()).await;
    let (sid, mut stream) = session.live("products", false).await.unwrap();

    server.notify(&sid, "CLOSE", json!(null));

    let last = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.action, Action::Close);
    assert!(stream.next().await.is_none(), "close must be the last item");

    session.disconnect().await;
}

#[tokio::test]
async fn disconnect_finishes_streams_without_a_close() {
    let (_server, session) = setup(ClientConfig::default()).await;
    let (_sid, mut stream) = session.live("products", false).await.unwrap();

    session.disconnect().await;

    let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("stream should finish on disconnect");
    assert!(next.is_none());
}

#[tokio::test]
async fn live_notifications_invalidate_the_cache() {
    let config = ClientConfig::default().cache(CachePolicy::default());
    let (server, session) = setup(config).await;
    server.set_fixture("products", json!([{ "id": "products:1" }]));

    session.select_value("products").await.unwrap();
    session.select_value("products").await.unwrap();
    assert_eq!(server.calls_for("select"), 1);

    let (sid, _stream) = session.live("products", false).await.unwrap();
    server.notify(&sid, "UPDATE", json!({ "id": "products:1" }));

    // The notification router invalidates asynchronously.
    let mut invalidated = false;
    for _ in 0..100 {
        if session.cache().unwrap().stats().await.entries == 0 {
            invalidated = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(invalidated, "live notification should invalidate the cache");

    session.select_value("products").await.unwrap();
    assert_eq!(server.calls_for("select"), 2);

    session.disconnect().await;
}

#[tokio::test]
async fn live_requires_the_persistent_transport() {
    use std::sync::Arc;
    use surreal::client::{HttpTransport, Session};

    // No server needed: the refusal happens before any request is sent.
    let config = ClientConfig::default();
    let transport = Arc::new(HttpTransport::new("http://127.0.0.1:9", &config).unwrap());
    let session = Session::new(transport, config);

    let err = session.live("products", false).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)), "got {err:?}");

    let err = session.set("x", 1i64).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)), "got {err:?}");

    let err = session.unset("x").await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)), "got {err:?}");
}
