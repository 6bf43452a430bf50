//! In-process stand-in for the reader service.
//!
//! Serves `GET /version`, `GET /` and the `/ws` upgrade on an ephemeral
//! port, records every live-update connection URI, and lets tests push
//! card lists, drop sockets, refuse upgrades and fail HTTP queries.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
enum Control {
    Push(String),
    Drop,
}

struct MockState {
    version: serde_json::Value,
    cards: Mutex<serde_json::Value>,
    http_failure: Mutex<Option<(StatusCode, String)>>,
    http_delay: Mutex<Duration>,
    refuse_ws: AtomicBool,
    ws_delay: Mutex<Duration>,
    accepted: AtomicUsize,
    serving: AtomicUsize,
    ws_uris: Mutex<Vec<String>>,
    received: Mutex<Vec<String>>,
    close_codes: Mutex<Vec<u16>>,
    control: broadcast::Sender<Control>,
}

pub struct MockReader {
    pub addr: SocketAddr,
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockReader {
    pub async fn start() -> Self {
        let (control, _) = broadcast::channel(16);
        let state = Arc::new(MockState {
            version: serde_json::json!({
                "major": 1, "minor": 2, "patch": 3, "pre": "", "text": "1.2.3"
            }),
            cards: Mutex::new(sample_cards()),
            http_failure: Mutex::new(None),
            http_delay: Mutex::new(Duration::ZERO),
            refuse_ws: AtomicBool::new(false),
            ws_delay: Mutex::new(Duration::ZERO),
            accepted: AtomicUsize::new(0),
            serving: AtomicUsize::new(0),
            ws_uris: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            close_codes: Mutex::new(Vec::new()),
            control,
        });

        let app = Router::new()
            .route("/", get(card_list))
            .route("/version", get(version))
            .route("/ws", get(live))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            base_url: format!("http://{addr}"),
            state,
        }
    }

    // ── HTTP knobs ───────────────────────────────────────────────────

    pub fn set_cards(&self, cards: serde_json::Value) {
        *self.state.cards.lock() = cards;
    }

    pub fn fail_http(&self, status: StatusCode, body: &str) {
        *self.state.http_failure.lock() = Some((status, body.to_owned()));
    }

    pub fn delay_http(&self, delay: Duration) {
        *self.state.http_delay.lock() = delay;
    }

    // ── WebSocket knobs ──────────────────────────────────────────────

    pub fn refuse_ws(&self, refuse: bool) {
        self.state.refuse_ws.store(refuse, Ordering::SeqCst);
    }

    /// Hold every `/ws` upgrade this long before answering it.
    pub fn delay_ws(&self, delay: Duration) {
        *self.state.ws_delay.lock() = delay;
    }

    /// Wait until every accepted upgrade has a socket task listening for
    /// control messages.
    pub async fn serving(&self) {
        eventually(Duration::from_secs(5), || {
            self.state.serving.load(Ordering::SeqCst) >= self.state.accepted.load(Ordering::SeqCst)
        })
        .await;
    }

    /// Push a raw text frame to every connected socket.
    pub async fn push_raw(&self, text: &str) {
        self.serving().await;
        let _ = self.state.control.send(Control::Push(text.to_owned()));
    }

    pub async fn push(&self, cards: &serde_json::Value) {
        self.push_raw(&cards.to_string()).await;
    }

    /// Drop every connected socket without a close handshake.
    pub async fn drop_connections(&self) {
        self.serving().await;
        let _ = self.state.control.send(Control::Drop);
    }

    /// Request URIs (path + query) of every `/ws` upgrade attempt.
    pub fn ws_uris(&self) -> Vec<String> {
        self.state.ws_uris.lock().clone()
    }

    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().clone()
    }

    pub fn close_codes(&self) -> Vec<u16> {
        self.state.close_codes.lock().clone()
    }

    pub async fn wait_for_ws_uris(&self, n: usize) -> Vec<String> {
        eventually(Duration::from_secs(10), || self.ws_uris().len() >= n).await;
        self.ws_uris()
    }
}

/// Poll `cond` every 20ms until it holds, panicking after `limit`.
pub async fn eventually(limit: Duration, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + limit;
    while !cond() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {limit:?}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Base URL of a listener that accepts TCP connections but never answers
/// the WebSocket handshake. The counter tracks accepted connections.
pub async fn silent_base_url() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });
    (format!("http://{addr}"), accepted)
}

pub fn wire_card(reader: &str, full_name: &str, sex: &str) -> serde_json::Value {
    serde_json::json!({
        "reader_name": reader,
        "card_no": "1234567890123",
        "full_name": full_name,
        "id_no": "AB1234567",
        "birth_date": "1990-03-14",
        "birth_date_timestamp": 637_372_800_000_i64,
        "sex": sex,
        "issue_date": "2020-06-01",
        "issue_date_timestamp": 1_590_969_600_000_i64,
    })
}

pub fn sample_cards() -> serde_json::Value {
    serde_json::json!([
        wire_card("Reader A", "Somchai Jaidee", "M"),
        wire_card("Reader B", "Malee Srisuk", "F"),
    ])
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn http_reply(state: &MockState, body: serde_json::Value) -> Response {
    let delay = *state.http_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let failure = state.http_failure.lock().clone();
    match failure {
        Some((status, text)) => (status, text).into_response(),
        None => axum::Json(body).into_response(),
    }
}

async fn version(State(state): State<Arc<MockState>>) -> Response {
    let body = state.version.clone();
    http_reply(&state, body).await
}

async fn card_list(State(state): State<Arc<MockState>>) -> Response {
    let body = state.cards.lock().clone();
    http_reply(&state, body).await
}

async fn live(State(state): State<Arc<MockState>>, uri: Uri, ws: WebSocketUpgrade) -> Response {
    state.ws_uris.lock().push(uri.to_string());
    let delay = *state.ws_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if state.refuse_ws.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    state.accepted.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<MockState>) {
    let mut control = state.control.subscribe();
    state.serving.fetch_add(1, Ordering::SeqCst);

    // A failed snapshot still falls through so a pending Close is recorded.
    let snapshot = state.cards.lock().to_string();
    let _ = socket.send(Message::Text(snapshot)).await;

    loop {
        tokio::select! {
            ctl = control.recv() => match ctl {
                Ok(Control::Push(text)) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                Ok(Control::Drop) | Err(_) => return,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => state.received.lock().push(text),
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = frame {
                        state.close_codes.lock().push(frame.code);
                    }
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return,
            },
        }
    }
}
