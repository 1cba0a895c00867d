use std::time::Duration;

use surreal::client::ReconnectPolicy;
use surreal::{ClientConfig, Credentials};

use crate::{setup, wait_until};

fn fast_backoff() -> ReconnectPolicy {
    ReconnectPolicy::ExponentialBackoff {
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(100),
        multiplier: 2.0,
        max_attempts: 3,
    }
}

#[tokio::test]
async fn reconnect_restores_auth_and_namespace() {
    let config = ClientConfig::default().reconnect(fast_backoff());
    let (server, session) = setup(config).await;

    session
        .signin(Credentials::root("root", "root"))
        .await
        .unwrap();
    session.use_ns_db("test", "test").await.unwrap();

    server.kill_connections();
    assert!(
        wait_until(Duration::from_secs(1), || session.is_connected()).await,
        "session should reconnect within a second"
    );

    // The restored session is usable without a fresh signin: the engine
    // replayed `authenticate` and `use` itself.
    session.query("INFO FOR DB", None).await.unwrap();

    assert_eq!(server.calls_for("signin"), 1);
    assert_eq!(server.calls_for("authenticate"), 1);
    assert_eq!(server.calls_for("use"), 2);
    assert_eq!(server.connections_accepted(), 2);

    session.disconnect().await;
}

#[tokio::test]
async fn no_reconnect_after_explicit_disconnect() {
    let config = ClientConfig::default().reconnect(ReconnectPolicy::AlwaysReconnect {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(50),
        multiplier: 2.0,
    });
    let (server, session) = setup(config).await;
    assert_eq!(server.connections_accepted(), 1);

    session.disconnect().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!session.is_connected());
    assert_eq!(
        server.connections_accepted(),
        1,
        "explicit disconnect must not trigger reconnection"
    );
}

#[tokio::test]
async fn never_policy_stays_down() {
    let config = ClientConfig::default().reconnect(ReconnectPolicy::Never);
    let (server, session) = setup(config).await;

    server.kill_connections();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!session.is_connected());
    assert_eq!(server.connections_accepted(), 1);

    session.disconnect().await;
}

#[tokio::test]
async fn reconnecting_without_auth_replays_nothing() {
    let config = ClientConfig::default().reconnect(fast_backoff());
    let (server, session) = setup(config).await;

    server.kill_connections();
    assert!(wait_until(Duration::from_secs(1), || session.is_connected()).await);

    assert_eq!(server.calls_for("authenticate"), 0);
    assert_eq!(server.calls_for("use"), 0);

    session.disconnect().await;
}

#[tokio::test]
async fn connect_after_disconnect_works() {
    let config = ClientConfig::default().reconnect(ReconnectPolicy::Never);
    let (server, session) = setup(config).await;

    session.disconnect().await;
    assert!(!session.is_connected());

    session.connect().await.unwrap();
    assert!(session.is_connected());
    session.ping().await.unwrap();
    assert_eq!(server.connections_accepted(), 2);

    session.disconnect().await;
}
