//! Integration tests against an in-process mock server.

mod utils;

mod cache;
mod live_queries;
mod reconnect;
mod rpc;

use std::sync::Arc;
use std::time::Duration;

use surreal::client::{ClientConfig, Session, WsTransport};

use utils::MockServer;

/// A connected session over a fresh mock server.
pub async fn setup(config: ClientConfig) -> (MockServer, Session) {
    let server = MockServer::spawn().await;
    let transport = Arc::new(WsTransport::new(&server.url(), &config).unwrap());
    let session = Session::new(transport, config);
    session.connect().await.unwrap();
    (server, session)
}

/// Poll until `predicate` holds or the deadline passes.
pub async fn wait_until(deadline: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
