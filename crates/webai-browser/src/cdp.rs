//! Chrome DevTools Protocol plumbing.
//!
//! [`CdpClient`] talks to the `/json/*` HTTP endpoints to discover and
//! manage tabs. [`CdpSession`] holds one long-lived WebSocket per page:
//!
//! ```text
//!   caller ──send()──▶ sink ──────────────▶ Chrome
//!     ▲                                       │
//!     │ oneshot (by id)                       ▼
//!   pending ◀──── reader task ◀──── stream ◀──┘
//!                    │
//!                    └──▶ subscribers (by event method)
//! ```

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};
use webai_core::{Result, WebAiError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;
type SubscriberMap = Arc<Mutex<HashMap<String, Vec<oneshot::Sender<Value>>>>>;
type ListenerMap = Arc<Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Value>>>>>;

// ─── HTTP endpoints ──────────────────────────────────────────────

/// Information about a browser tab/page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: String,
    pub url: String,
    pub title: String,
    /// WebSocket URL for a page-level CDP session.
    pub ws_url: Option<String>,
}

impl TabInfo {
    fn from_json(t: &Value) -> Self {
        Self {
            id: t["id"].as_str().unwrap_or("").to_string(),
            url: t["url"].as_str().unwrap_or("").to_string(),
            title: t["title"].as_str().unwrap_or("").to_string(),
            ws_url: t["webSocketDebuggerUrl"].as_str().map(str::to_string),
        }
    }
}

/// Client for the DevTools HTTP endpoints on `127.0.0.1:<port>`.
#[derive(Clone)]
pub struct CdpClient {
    base_url: String,
    http: reqwest::Client,
}

impl CdpClient {
    pub fn new(port: u16) -> Self {
        Self::with_base_url(format!("http://127.0.0.1:{port}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// `/json/version`: polled after launch until the browser answers.
    pub async fn version(&self) -> Result<Value> {
        self.get_json("/json/version").await
    }

    /// List all open page tabs.
    pub async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        let resp = self.get_json("/json/list").await?;
        Ok(resp
            .as_array()
            .map(|tabs| {
                tabs.iter()
                    .filter(|t| t["type"].as_str() == Some("page"))
                    .map(TabInfo::from_json)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Open a new tab. Recent Chrome versions require `PUT` here.
    pub async fn new_tab(&self, url: &str) -> Result<TabInfo> {
        let api_url = format!("{}/json/new?{}", self.base_url, url);
        let resp: Value = self
            .http
            .put(&api_url)
            .send()
            .await
            .map_err(|e| WebAiError::Browser(format!("CDP new tab failed: {e}")))?
            .json()
            .await
            .map_err(|e| WebAiError::Browser(format!("CDP parse new tab failed: {e}")))?;
        Ok(TabInfo::from_json(&resp))
    }

    /// Close a tab by its ID.
    pub async fn close_tab(&self, tab_id: &str) -> Result<()> {
        let url = format!("{}/json/close/{}", self.base_url, tab_id);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| WebAiError::Browser(format!("CDP close tab failed: {e}")))?;
        Ok(())
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| WebAiError::Browser(format!("GET {path} failed: {e}")))?
            .json()
            .await
            .map_err(|e| WebAiError::Browser(format!("GET {path} returned bad JSON: {e}")))
    }
}

// ─── Persistent session ──────────────────────────────────────────

/// A live CDP WebSocket connection to one page target.
pub struct CdpSession {
    sink: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    next_id: AtomicU64,
    pending: PendingMap,
    subscribers: SubscriberMap,
    listeners: ListenerMap,
    reader: JoinHandle<()>,
    command_timeout: Duration,
}

impl CdpSession {
    /// Connect to a page's `webSocketDebuggerUrl` and start the reader task.
    pub async fn connect(ws_url: &str, command_timeout: Duration) -> Result<Self> {
        let (ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| WebAiError::Browser(format!("WebSocket connect failed: {e}")))?;
        let (sink, stream) = ws.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let subscribers: SubscriberMap = Arc::new(Mutex::new(HashMap::new()));
        let listeners: ListenerMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_loop(
            stream,
            Arc::clone(&pending),
            Arc::clone(&subscribers),
            Arc::clone(&listeners),
        ));

        debug!(ws_url, "CDP session connected");

        Ok(Self {
            sink: tokio::sync::Mutex::new(sink),
            next_id: AtomicU64::new(1),
            pending,
            subscribers,
            listeners,
            reader,
            command_timeout,
        })
    }

    /// Send a command and wait for its `result` object.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let command = json!({ "id": id, "method": method, "params": params });
        trace!(id, method, "cdp →");

        let sent = self
            .sink
            .lock()
            .await
            .send(Message::Text(command.to_string().into()))
            .await;
        if let Err(e) = sent {
            self.pending.lock().remove(&id);
            return Err(WebAiError::cdp(method, format!("send failed: {e}")));
        }

        let response = match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(WebAiError::cdp(method, "connection closed before response"));
            }
            Err(_) => {
                self.pending.lock().remove(&id);
                return Err(WebAiError::CdpTimeout {
                    method: method.to_string(),
                    secs: self.command_timeout.as_secs(),
                });
            }
        };

        if let Some(err) = response.get("error") {
            let message = err["message"].as_str().unwrap_or("unknown error");
            return Err(WebAiError::cdp(method, message));
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Register interest in the next occurrence of `method`.
    ///
    /// Must be called before the action that fires the event.
    pub fn subscribe(&self, method: &str) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.subscribers
            .lock()
            .entry(method.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Receive every occurrence of `method` until the receiver is dropped.
    pub fn listen(&self, method: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .entry(method.to_string())
            .or_default()
            .push(tx);
        rx
    }

    pub async fn close(&self) {
        let _ = self.sink.lock().await.close().await;
        self.reader.abort();
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    pending: PendingMap,
    subscribers: SubscriberMap,
    listeners: ListenerMap,
) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                    warn!("ignoring non-JSON CDP frame");
                    continue;
                };
                dispatch(frame, &pending, &subscribers, &listeners);
            }
            Ok(Message::Close(_)) => {
                debug!("CDP WebSocket closed by browser");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "CDP WebSocket read error");
                break;
            }
        }
    }
    // Dropping the senders wakes every waiter with a closed-channel error.
    pending.lock().clear();
    subscribers.lock().clear();
    listeners.lock().clear();
}

/// Route one incoming frame to the waiting command or event subscribers.
fn dispatch(
    frame: Value,
    pending: &PendingMap,
    subscribers: &SubscriberMap,
    listeners: &ListenerMap,
) {
    if let Some(id) = frame.get("id").and_then(Value::as_u64) {
        if let Some(tx) = pending.lock().remove(&id) {
            let _ = tx.send(frame);
        }
        return;
    }

    if let Some(method) = frame.get("method").and_then(Value::as_str) {
        trace!(method, "cdp event");
        let params = frame.get("params").cloned().unwrap_or(Value::Null);

        let waiting = subscribers.lock().remove(method);
        if let Some(senders) = waiting {
            for tx in senders {
                let _ = tx.send(params.clone());
            }
        }

        if let Some(senders) = listeners.lock().get_mut(method) {
            senders.retain(|tx| tx.send(params.clone()).is_ok());
        }
    }
}
