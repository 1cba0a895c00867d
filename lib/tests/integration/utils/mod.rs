//! An in-process mock server speaking the text protocol over WebSocket.
//!
//! Tests drive it through [`MockServer`]: seed `select` fixtures, silence
//! methods to provoke timeouts, kill connections to provoke reconnects,
//! and push live-query notifications.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value as Json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;

pub struct MockServer {
    pub addr: SocketAddr,
    state: Arc<ServerState>,
}

struct ServerState {
    /// `select` target → response value.
    fixtures: Mutex<HashMap<String, Json>>,
    /// Methods that get no reply at all.
    silent: Mutex<HashSet<String>>,
    /// Every request seen: (method, params).
    calls: Mutex<Vec<(String, Json)>>,
    /// Outgoing handles for every open connection.
    conns: Mutex<Vec<mpsc::UnboundedSender<Message>>>,
    kill_tx: broadcast::Sender<()>,
    connections_accepted: AtomicUsize,
}

impl MockServer {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (kill_tx, _) = broadcast::channel(8);
        let state = Arc::new(ServerState {
            fixtures: Mutex::new(HashMap::new()),
            silent: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            conns: Mutex::new(Vec::new()),
            kill_tx,
            connections_accepted: AtomicUsize::new(0),
        });
        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                accept_state
                    .connections_accepted
                    .fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle_connection(stream, accept_state.clone()));
            }
        });
        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn set_fixture(&self, target: &str, value: Json) {
        self.state
            .fixtures
            .lock()
            .unwrap()
            .insert(target.to_string(), value);
    }

    pub fn silence(&self, method: &str) {
        self.state
            .silent
            .lock()
            .unwrap()
            .insert(method.to_string());
    }

    pub fn calls_for(&self, method: &str) -> usize {
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub fn params_for(&self, method: &str) -> Vec<Json> {
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn connections_accepted(&self) -> usize {
        self.state.connections_accepted.load(Ordering::SeqCst)
    }

    /// Abruptly drop every open connection.
    pub fn kill_connections(&self) {
        let _ = self.state.kill_tx.send(());
        self.state.conns.lock().unwrap().clear();
    }

    /// Push a live notification to every open connection, using the
    /// wrapped envelope shape.
    pub fn notify(&self, subscription_id: &str, action: &str, data: Json) {
        let frame = json!({
            "result": { "action": action, "id": subscription_id, "result": data }
        });
        let text = frame.to_string();
        for conn in self.state.conns.lock().unwrap().iter() {
            let _ = conn.send(Message::Text(text.clone()));
        }
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<ServerState>) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(_) => return,
    };
    let (mut sink, mut read) = ws.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    state.conns.lock().unwrap().push(out_tx);
    let mut kill_rx = state.kill_tx.subscribe();

    loop {
        tokio::select! {
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = respond(&state, &text) {
                            if sink.send(Message::Text(reply)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
            outgoing = out_rx.recv() => {
                match outgoing {
                    Some(message) => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = kill_rx.recv() => break,
        }
    }
}

fn respond(state: &ServerState, text: &str) -> Option<String> {
    let frame: Json = serde_json::from_str(text).ok()?;
    let id = frame.get("id")?.clone();
    let method = frame.get("method")?.as_str()?.to_string();
    let params = frame.get("params").cloned().unwrap_or(Json::Null);
    state
        .calls
        .lock()
        .unwrap()
        .push((method.clone(), params.clone()));
    if state.silent.lock().unwrap().contains(&method) {
        return None;
    }

    let result = match method.as_str() {
        "ping" | "use" | "authenticate" | "invalidate" | "let" | "unset" | "delete" | "kill" => {
            Json::Null
        }
        "version" => json!("mock-server-1.0"),
        "info" => json!({}),
        "signin" | "signup" => {
            let creds = params.get(0)?;
            let user = creds.get("user").and_then(Json::as_str);
            let pass = creds.get("pass").and_then(Json::as_str);
            if (user, pass) == (Some("root"), Some("root")) || creds.get("ac").is_some() {
                json!("mock-token")
            } else {
                let error = json!({
                    "id": id,
                    "error": { "code": -32000, "message": "invalid credentials" }
                });
                return Some(error.to_string());
            }
        }
        // Echo the query string back as the single statement result, so
        // tests can check request/response correlation.
        "query" => json!([params.get(0).cloned().unwrap_or(Json::Null)]),
        "select" => {
            let target = params.get(0)?.as_str()?.to_string();
            state
                .fixtures
                .lock()
                .unwrap()
                .get(&target)
                .cloned()
                .unwrap_or_else(|| json!([]))
        }
        "create" | "update" | "upsert" | "merge" | "patch" => {
            json!([params.get(1).cloned().unwrap_or(Json::Null)])
        }
        "relate" => json!([params.get(3).cloned().unwrap_or(Json::Null)]),
        "insert" => params.get(1).cloned().unwrap_or_else(|| json!([])),
        "live" => json!(uuid::Uuid::new_v4().to_string()),
        other => {
            let error = json!({
                "id": id,
                "error": { "code": -32601, "message": format!("unknown method {other}") }
            });
            return Some(error.to_string());
        }
    };
    Some(json!({ "id": id, "result": result }).to_string())
}
