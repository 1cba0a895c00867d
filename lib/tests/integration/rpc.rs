use std::time::Duration;

use futures::future;
use surreal::client::ReconnectPolicy;
use surreal::{ClientConfig, Error, Value};

use crate::{setup, wait_until};

#[tokio::test]
async fn ping_and_version_roundtrip() {
    let (server, session) = setup(ClientConfig::default()).await;

    session.ping().await.unwrap();
    assert_eq!(session.version().await.unwrap(), "mock-server-1.0");
    assert_eq!(server.calls_for("ping"), 1);

    session.disconnect().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_requests_never_cross_payloads() {
    let (_server, session) = setup(ClientConfig::default()).await;

    // Every request gets its statement echoed back; a mismatched
    // response id would surface as the wrong payload here.
    let queries: Vec<_> = (0..10_000)
        .map(|i| {
            let session = session.clone();
            async move {
                let sql = format!("RETURN {i}");
                let results = session.query(&sql, None).await.unwrap();
                assert_eq!(results, vec![Value::Strand(sql)]);
            }
        })
        .collect();
    future::join_all(queries).await;

    session.disconnect().await;
}

#[tokio::test]
async fn query_with_zero_variables_sends_one_param() {
    let (server, session) = setup(ClientConfig::default()).await;

    session.query("INFO FOR DB", None).await.unwrap();
    session
        .query("INFO FOR DB", Some(surreal::types::Object::new()))
        .await
        .unwrap();

    for params in server.params_for("query") {
        let params = params.as_array().unwrap();
        assert_eq!(params.len(), 1, "expected [sql] only, got {params:?}");
    }

    session.disconnect().await;
}

#[tokio::test]
async fn unanswered_requests_time_out() {
    let config = ClientConfig::default()
        .request_timeout(Duration::from_millis(200))
        .reconnect(ReconnectPolicy::Never);
    let (server, session) = setup(config).await;
    server.silence("ping");

    let started = tokio::time::Instant::now();
    let err = session.ping().await.unwrap_err();
    assert!(matches!(err, Error::Timeout), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(2));

    // The connection is still usable for other requests.
    assert_eq!(session.version().await.unwrap(), "mock-server-1.0");

    session.disconnect().await;
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let (_server, session) = setup(ClientConfig::default()).await;
    session.disconnect().await;
    session.disconnect().await;
    assert!(!session.is_connected());
}

#[tokio::test]
async fn operations_after_disconnect_fail_cleanly() {
    let (_server, session) = setup(ClientConfig::default()).await;
    session.disconnect().await;

    let err = session.ping().await.unwrap_err();
    assert!(
        matches!(err, Error::NotConnected | Error::TransportClosed),
        "got {err:?}"
    );
}

#[tokio::test]
async fn server_errors_surface_verbatim() {
    let (_server, session) = setup(ClientConfig::default()).await;

    let err = session
        .signin(surreal::Credentials::root("root", "wrong"))
        .await
        .unwrap_err();
    let Error::Rpc(rpc) = err else {
        panic!("expected an rpc error, got {err:?}");
    };
    assert_eq!(rpc.code, -32000);
    assert_eq!(rpc.message, "invalid credentials");

    session.disconnect().await;
}

#[tokio::test]
async fn in_flight_requests_fail_with_transport_closed_on_drop() {
    let config = ClientConfig::default()
        .request_timeout(Duration::from_secs(5))
        .reconnect(ReconnectPolicy::Never);
    let (server, session) = setup(config).await;
    server.silence("ping");

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.ping().await })
    };
    // Let the request reach the wire, then cut the connection.
    assert!(wait_until(Duration::from_secs(1), || server.calls_for("ping") == 1).await);
    server.kill_connections();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::TransportClosed), "got {err:?}");
}
