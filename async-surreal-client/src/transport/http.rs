// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The stateless transport: each RPC is one `POST /rpc` exchange over a
//! bounded connection pool. No notification path, so live queries and
//! connection-scoped variables are refused at the session layer.

use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tokio::sync::watch;
use url::Url;

use surreal_core::handle::RequestIdGenerator;
use surreal_core::messages::{decode_message, methods};
use surreal_core::{PayloadFormat, Request, Response, ServerMessage};
use surreal_types::{Error, Result};

use super::{ConnectionState, NotificationStream, Transport};
use crate::config::ClientConfig;

/// The stateless HTTP transport.
pub struct HttpTransport {
    endpoint: Url,
    format: PayloadFormat,
    client: reqwest::Client,
    request_timeout: Duration,
    connection_timeout: Duration,
    auth_token: ArcSwapOption<String>,
    selection: ArcSwapOption<(String, String)>,
    state_tx: watch::Sender<ConnectionState>,
    probe_ids: RequestIdGenerator,
}

impl HttpTransport {
    /// Create a transport for the given `http://` or `https://` base
    /// URL. The RPC endpoint is `POST /rpc`.
    pub fn new(endpoint: &str, config: &ClientConfig) -> Result<Self> {
        let endpoint = surreal_core::url::http_endpoint(endpoint)?;
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.http_connection_pool_size)
            .build()
            .map_err(|e| Error::connection(format!("failed to build http client: {e}")))?;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            endpoint,
            format: config.payload_format,
            client,
            request_timeout: config.request_timeout,
            connection_timeout: config.connection_timeout,
            auth_token: ArcSwapOption::empty(),
            selection: ArcSwapOption::empty(),
            state_tx,
            probe_ids: RequestIdGenerator::new(),
        })
    }

    async fn dispatch(&self, request: Request, timeout: Duration) -> Result<Response> {
        let body = request.encode(self.format)?;
        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, self.format.content_type())
            .header(ACCEPT, self.format.content_type())
            .body(body);
        if let Some(selection) = self.selection.load_full() {
            builder = builder
                .header("surreal-ns", selection.0.as_str())
                .header("surreal-db", selection.1.as_str());
        }
        if let Some(token) = self.auth_token.load_full() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = tokio::time::timeout(timeout, builder.send())
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::connection(format!("http request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::connection(format!(
                "http status {status} from {}",
                self.endpoint
            )));
        }
        let bytes = tokio::time::timeout(timeout, response.bytes())
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::connection(format!("failed to read http response: {e}")))?;
        match decode_message(&bytes, self.format)? {
            ServerMessage::Response(response) => Ok(response),
            ServerMessage::Notification(_) => Err(Error::InvalidResponse(
                "stateless transport received a notification".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        // There is no channel to hold open; probe the endpoint once so
        // connect() fails up front the way the persistent transport does.
        let probe = Request::new(self.probe_ids.next_id(), methods::PING);
        self.dispatch(probe, self.connection_timeout)
            .await
            .map_err(|e| match e {
                Error::Timeout => {
                    Error::connection(format!("timed out connecting to {}", self.endpoint))
                }
                other => other,
            })?;
        self.state_tx.send_replace(ConnectionState::Connected);
        debug!("connected to {}", self.endpoint);
        Ok(())
    }

    async fn disconnect(&self) {
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    async fn send(&self, request: Request) -> Result<Response> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.dispatch(request, self.request_timeout).await
    }

    fn is_connected(&self) -> bool {
        *self.state_tx.borrow() == ConnectionState::Connected
    }

    fn supports_notifications(&self) -> bool {
        false
    }

    fn notifications(&self) -> NotificationStream {
        futures::stream::empty().boxed()
    }

    fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_auth_token(&self, token: Option<&str>) {
        self.auth_token
            .store(token.map(|t| std::sync::Arc::new(t.to_string())));
    }

    fn set_selection(&self, selection: Option<(&str, &str)>) {
        self.selection
            .store(selection.map(|(ns, db)| std::sync::Arc::new((ns.to_string(), db.to_string()))));
    }
}
