// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The persistent bidirectional transport: one WebSocket frame channel,
//! demultiplexed by request id, with server notifications fed to a
//! separate stream.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use futures::stream::Stream;
use futures::{SinkExt, StreamExt};
use hashbrown::HashMap;
use log::{debug, warn};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use surreal_core::messages::decode_message;
use surreal_core::sync::Mutex;
use surreal_core::{Notification, PayloadFormat, Request, Response, ServerMessage};
use surreal_types::{Error, Result};

use super::{ConnectionState, NotificationStream, Transport};
use crate::config::ClientConfig;

const PING_INTERVAL: Duration = Duration::from_secs(5);
const COMMAND_QUEUE_SIZE: usize = 256;
const NOTIFICATION_QUEUE_SIZE: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum RouterCommand {
    Send {
        request: Request,
        reply: oneshot::Sender<Result<Response>>,
    },
    /// Remove a pending completion whose caller timed out; a late
    /// response for that id is then dropped.
    Cancel { id: String },
    Close,
}

/// The persistent WebSocket transport.
pub struct WsTransport {
    endpoint: Url,
    format: PayloadFormat,
    request_timeout: Duration,
    connection_timeout: Duration,
    /// Serializes connect/disconnect cycles.
    connect_lock: tokio::sync::Mutex<()>,
    request_send: ArcSwapOption<mpsc::Sender<RouterCommand>>,
    router_task: Mutex<Option<JoinHandle<()>>>,
    notifications_slot: Mutex<Option<mpsc::Receiver<Notification>>>,
    state_tx: watch::Sender<ConnectionState>,
}

impl WsTransport {
    /// Create a transport for the given `ws://` or `wss://` endpoint. An
    /// empty or `/` path is rewritten to `/rpc`.
    pub fn new(endpoint: &str, config: &ClientConfig) -> Result<Self> {
        let endpoint = surreal_core::url::ws_endpoint(endpoint)?;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            endpoint,
            format: config.payload_format,
            request_timeout: config.request_timeout,
            connection_timeout: config.connection_timeout,
            connect_lock: tokio::sync::Mutex::new(()),
            request_send: ArcSwapOption::empty(),
            router_task: Mutex::new(None),
            notifications_slot: Mutex::new(None),
            state_tx,
        })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self) -> Result<()> {
        let _guard = self.connect_lock.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        let connect = connect_async(self.endpoint.as_str());
        let (stream, _) = tokio::time::timeout(self.connection_timeout, connect)
            .await
            .map_err(|_| {
                Error::connection(format!("timed out connecting to {}", self.endpoint))
            })?
            .map_err(|e| {
                Error::connection(format!("failed to connect to {}: {e}", self.endpoint))
            })?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let (notification_tx, notification_rx) = mpsc::channel(NOTIFICATION_QUEUE_SIZE);

        let router = WsRouter {
            stream,
            commands: command_rx,
            notifications: notification_tx,
            state: self.state_tx.clone(),
            format: self.format,
            pending: HashMap::new(),
        };
        let task = tokio::spawn(router.run());

        *self.notifications_slot.lock() = Some(notification_rx);
        *self.router_task.lock() = Some(task);
        self.request_send.store(Some(Arc::new(command_tx)));
        self.state_tx.send_replace(ConnectionState::Connected);
        debug!("connected to {}", self.endpoint);
        Ok(())
    }

    async fn disconnect(&self) {
        let _guard = self.connect_lock.lock().await;
        let Some(sender) = self.request_send.swap(None) else {
            return;
        };
        let _ = sender.send(RouterCommand::Close).await;
        let task = self.router_task.lock().take();
        if let Some(task) = task {
            // The router drains pending completions and flips the state
            // watch before it exits.
            let _ = task.await;
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let Some(sender) = self.request_send.load_full() else {
            return Err(Error::NotConnected);
        };
        let id = request.id.clone();
        let (reply_tx, reply_rx) = oneshot::channel();
        if sender
            .send(RouterCommand::Send {
                request,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            return Err(Error::TransportClosed);
        }
        match tokio::time::timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::TransportClosed),
            Err(_) => {
                let _ = sender.try_send(RouterCommand::Cancel { id });
                Err(Error::Timeout)
            }
        }
    }

    fn is_connected(&self) -> bool {
        *self.state_tx.borrow() == ConnectionState::Connected
    }

    fn supports_notifications(&self) -> bool {
        true
    }

    fn notifications(&self) -> NotificationStream {
        match self.notifications_slot.lock().take() {
            Some(receiver) => ReceiverStream(receiver).boxed(),
            None => futures::stream::empty().boxed(),
        }
    }

    fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(task) = self.router_task.lock().take() {
            task.abort();
        }
    }
}

struct ReceiverStream(mpsc::Receiver<Notification>);

impl Stream for ReceiverStream {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Notification>> {
        self.0.poll_recv(cx)
    }
}

/// One router per connection lifecycle. Owns the socket, the
/// pending-request table and the notification queue; everything else
/// talks to it through the command channel.
struct WsRouter {
    stream: WsStream,
    commands: mpsc::Receiver<RouterCommand>,
    notifications: mpsc::Sender<Notification>,
    state: watch::Sender<ConnectionState>,
    format: PayloadFormat,
    pending: HashMap<String, oneshot::Sender<Result<Response>>>,
}

impl WsRouter {
    async fn run(mut self) {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(RouterCommand::Send { request, reply }) => {
                            if self.handle_send(request, reply).await.is_err() {
                                break;
                            }
                        }
                        Some(RouterCommand::Cancel { id }) => {
                            self.pending.remove(&id);
                        }
                        Some(RouterCommand::Close) | None => break,
                    }
                }
                frame = self.stream.next() => {
                    match frame {
                        Some(Ok(message)) => self.handle_frame(message),
                        Some(Err(e)) => {
                            warn!("websocket read failed: {e}");
                            break;
                        }
                        None => {
                            debug!("websocket closed by server");
                            break;
                        }
                    }
                }
                _ = ping.tick() => {
                    if self.stream.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = self.stream.close(None).await;
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(Error::TransportClosed));
        }
        self.state.send_replace(ConnectionState::Disconnected);
        // Dropping `self.notifications` here finishes the notification
        // stream for this connection lifecycle.
    }

    async fn handle_send(
        &mut self,
        request: Request,
        reply: oneshot::Sender<Result<Response>>,
    ) -> std::result::Result<(), ()> {
        let frame = match encode_frame(&request, self.format) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = reply.send(Err(e));
                return Ok(());
            }
        };
        if self.stream.send(frame).await.is_err() {
            let _ = reply.send(Err(Error::TransportClosed));
            return Err(());
        }
        self.pending.insert(request.id, reply);
        Ok(())
    }

    fn handle_frame(&mut self, message: Message) {
        let bytes = match message {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            // Pings are answered by the protocol layer; pongs and close
            // frames need no action here.
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => return,
        };
        match decode_message(&bytes, self.format) {
            Ok(ServerMessage::Response(response)) => {
                let Some(id) = response.id.clone() else {
                    debug!("dropping response frame without an id");
                    return;
                };
                match self.pending.remove(&id) {
                    Some(reply) => {
                        let _ = reply.send(Ok(response));
                    }
                    None => debug!("dropping response for unknown or timed out request {id}"),
                }
            }
            Ok(ServerMessage::Notification(notification)) => {
                match self.notifications.try_send(notification) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(n)) => {
                        warn!(
                            "notification queue full, dropping notification for subscription {}",
                            n.subscription_id
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!("notification consumer gone");
                    }
                }
            }
            Err(e) => {
                debug!("ignoring frame that is neither response nor notification: {e}");
            }
        }
    }
}

fn encode_frame(request: &Request, format: PayloadFormat) -> Result<Message> {
    let bytes = request.encode(format)?;
    if format.is_binary() {
        Ok(Message::Binary(bytes))
    } else {
        let text = String::from_utf8(bytes)
            .map_err(|e| Error::encoding(format!("request is not valid utf-8: {e}")))?;
        Ok(Message::Text(text))
    }
}
