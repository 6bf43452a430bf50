//! Live update channel: one long-lived WebSocket to the reader service,
//! with an explicit reconnect state machine.
//!
//! ```text
//!            open()                 connected
//! Closed ───────────▶ Connecting ─────────────▶ Open ◀──────────┐
//!   ▲                     │ failed                 │ dropped      │ reconnected
//!   │◀────────────────────┘                        ▼              │
//!   │◀──────── close() / RetryPolicy veto ──── Retrying ──────────┘
//! ```
//!
//! Each `open()` starts a session: one driver task that owns the socket,
//! pumps inbound pushes to the update callback, writes outbound interval
//! changes, and runs the reconnect loop when the socket drops. The session
//! carries a `CancellationToken` that `close()` trips; the driver checks it
//! at every suspension point and every state change it makes is keyed by the
//! session id, so a reconnect finishing after `close()` changes nothing.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, SinkExt, StreamExt};
use parking_lot::Mutex;
use scl_domain::card::{decode_card_list, CardRecord};
use scl_domain::error::{Error, Result};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::endpoint::{clamp_interval, ServiceEndpoint};
use crate::events::{ChannelEvent, EventHook};
use crate::retry::{ReconnectPacing, RetryPolicy};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Caller hook receiving every pushed card list.
///
/// An `Err` (or a panic) is logged and never affects the channel.
pub type UpdateCallback = Arc<dyn Fn(Vec<CardRecord>) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Retrying,
}

/// Caller-supplied hooks, fixed at construction.
#[derive(Clone, Default)]
pub struct ChannelHooks {
    pub on_update: Option<UpdateCallback>,
    pub retry_policy: Option<Arc<dyn RetryPolicy>>,
    pub on_event: Option<EventHook>,
}

/// Handle to the live-update channel. Clones share the same channel.
#[derive(Clone)]
pub struct LiveChannel {
    inner: Arc<Inner>,
}

struct Inner {
    endpoint: Arc<ServiceEndpoint>,
    hooks: ChannelHooks,
    connect_timeout: Option<Duration>,
    pacing: ReconnectPacing,
    state: watch::Sender<ConnectionState>,
    interval: Mutex<Option<u32>>,
    session: Mutex<Option<Session>>,
    next_session: AtomicU64,
}

struct Session {
    id: u64,
    cancel: CancellationToken,
    outbound: mpsc::Sender<String>,
}

/// Why a connected socket stopped being read.
enum Exit {
    Cancelled,
    Dropped(String),
}

impl LiveChannel {
    pub fn new(
        endpoint: Arc<ServiceEndpoint>,
        hooks: ChannelHooks,
        connect_timeout: Option<Duration>,
        pacing: ReconnectPacing,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Closed);
        Self {
            inner: Arc::new(Inner {
                endpoint,
                hooks,
                connect_timeout,
                pacing,
                state,
                interval: Mutex::new(None),
                session: Mutex::new(None),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Receiver for state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// True only while `Open`.
    pub fn is_running(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Interval that the next (re)connect will request.
    pub fn interval(&self) -> Option<u32> {
        *self.inner.interval.lock()
    }

    /// Connect to the live-update address.
    ///
    /// `interval` (seconds) is clamped with [`clamp_interval`]; `None` omits
    /// the parameter so the service default applies. A no-op while a session
    /// is already live. A failed first connect is not retried: it returns
    /// `Error::Network` (or `Error::Timeout`) and leaves the channel `Closed`.
    pub async fn open(&self, interval: Option<f64>) -> Result<()> {
        let interval = interval.map(clamp_interval);

        let (id, cancel, outbound_rx) = {
            let mut session = self.inner.session.lock();
            if session.is_some() {
                return Ok(());
            }
            let id = self.inner.next_session.fetch_add(1, Ordering::Relaxed);
            let cancel = CancellationToken::new();
            let (outbound, outbound_rx) = mpsc::channel(16);
            *session = Some(Session {
                id,
                cancel: cancel.clone(),
                outbound,
            });
            *self.inner.interval.lock() = interval;
            self.inner.state.send_replace(ConnectionState::Connecting);
            (id, cancel, outbound_rx)
        };

        // Ends the session unless the connect below reaches `Open`, including
        // when the caller drops this future mid-connect.
        let guard = PendingOpen {
            inner: &self.inner,
            id,
        };

        let url = self.inner.endpoint.live_url(interval);
        tracing::info!(url = %url, "opening live-update channel");

        let ws = tokio::select! {
            r = self.inner.connect(&url) => r?,
            _ = cancel.cancelled() => return Err(Error::Closed),
        };
        if !self.inner.transition(id, ConnectionState::Open) {
            return Err(Error::Closed);
        }
        std::mem::forget(guard);

        self.inner.emit(ChannelEvent::Connected { url });
        tokio::spawn(drive(self.inner.clone(), id, ws, outbound_rx, cancel));
        Ok(())
    }

    /// Close the channel. Idempotent.
    ///
    /// The socket is closed with a normal-closure frame and any reconnect
    /// sequence in flight is abandoned.
    pub fn close(&self) {
        let mut session = self.inner.session.lock();
        let Some(s) = session.take() else {
            return;
        };
        s.cancel.cancel();
        self.inner.state.send_replace(ConnectionState::Closed);
        drop(session);
        self.inner.emit(ChannelEvent::Closed);
    }

    /// Change the push interval of the live connection.
    ///
    /// `None` forgets the stored interval so later reconnects omit it, and
    /// sends nothing. Otherwise the clamped value is queued for the live
    /// socket and remembered for reconnects. Returns whether a message was
    /// queued, which only happens while `Open`. If that socket drops before
    /// the message is written it is discarded, not replayed on the next
    /// connection.
    pub fn set_interval(&self, interval: Option<f64>) -> bool {
        let Some(secs) = interval.map(clamp_interval) else {
            *self.inner.interval.lock() = None;
            self.inner.emit(ChannelEvent::IntervalChanged { interval: None });
            return false;
        };

        {
            let session = self.inner.session.lock();
            let Some(s) = session.as_ref() else {
                return false;
            };
            if *self.inner.state.borrow() != ConnectionState::Open {
                return false;
            }
            if s.outbound.try_send(secs.to_string()).is_err() {
                return false;
            }
            *self.inner.interval.lock() = Some(secs);
        }

        self.inner.emit(ChannelEvent::IntervalChanged {
            interval: Some(secs),
        });
        true
    }
}

/// Session installed by `open` that has not reached `Open` yet.
struct PendingOpen<'a> {
    inner: &'a Inner,
    id: u64,
}

impl Drop for PendingOpen<'_> {
    fn drop(&mut self) {
        self.inner.end_session(self.id);
    }
}

impl Inner {
    fn emit(&self, event: ChannelEvent) {
        event.dispatch(self.hooks.on_event.as_ref());
    }

    /// Set `state` only if session `id` is still the live one.
    fn transition(&self, id: u64, state: ConnectionState) -> bool {
        let session = self.session.lock();
        match session.as_ref() {
            Some(s) if s.id == id && !s.cancel.is_cancelled() => {
                self.state.send_replace(state);
                true
            }
            _ => false,
        }
    }

    /// Drop session `id` (if still current) and go to `Closed`.
    fn end_session(&self, id: u64) {
        let mut session = self.session.lock();
        if session.as_ref().is_some_and(|s| s.id == id) {
            if let Some(s) = session.take() {
                s.cancel.cancel();
            }
            self.state.send_replace(ConnectionState::Closed);
            drop(session);
            self.emit(ChannelEvent::Closed);
        }
    }

    async fn connect(&self, url: &str) -> Result<WsStream> {
        let attempt = tokio_tungstenite::connect_async(url);
        let result = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt).await.map_err(|_| {
                Error::Timeout(format!(
                    "connecting to {url} exceeded {}ms",
                    limit.as_millis()
                ))
            })?,
            None => attempt.await,
        };
        let (ws, _response) =
            result.map_err(|e| Error::Network(format!("failed to connect to {url}: {e}")))?;
        Ok(ws)
    }

    /// Decode one push and hand it to the update callback.
    fn deliver(&self, text: &str) {
        let cards = match decode_card_list(text) {
            Ok(cards) => cards,
            Err(e) => {
                self.emit(ChannelEvent::MalformedMessage {
                    error: e.to_string(),
                });
                return;
            }
        };
        tracing::debug!(cards = cards.len(), "card list pushed");

        let Some(callback) = &self.hooks.on_update else {
            return;
        };
        let error = match std::panic::catch_unwind(AssertUnwindSafe(|| callback(cards))) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "update callback panicked".to_owned(),
        };
        self.emit(ChannelEvent::UpdateCallbackFailed { error });
    }

    /// Reconnect loop. Returns the new socket, or `None` once the session
    /// is closed or the retry policy vetoed.
    async fn reconnect(&self, id: u64, cancel: &CancellationToken) -> Option<WsStream> {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            attempt = attempt.saturating_add(1);
            let started = Instant::now();

            if let Some(policy) = &self.hooks.retry_policy {
                let verdict = AssertUnwindSafe(policy.should_retry(attempt))
                    .catch_unwind()
                    .await;
                match verdict {
                    Ok(Ok(true)) => {}
                    Ok(Ok(false)) => {
                        self.emit(ChannelEvent::RetryVetoed { attempt });
                        self.end_session(id);
                        return None;
                    }
                    Ok(Err(e)) => self.emit(ChannelEvent::RetryPolicyFailed {
                        attempt,
                        error: e.to_string(),
                    }),
                    Err(_) => self.emit(ChannelEvent::RetryPolicyFailed {
                        attempt,
                        error: "retry policy panicked".into(),
                    }),
                }
            }

            if let Some(wait) = self.pacing.remaining(started.elapsed()) {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = cancel.cancelled() => return None,
                }
            }
            if cancel.is_cancelled() {
                return None;
            }

            // Interval may have changed since the socket dropped.
            let url = self.endpoint.live_url(*self.interval.lock());
            self.emit(ChannelEvent::ReconnectAttempt {
                attempt,
                url: url.clone(),
            });

            let result = tokio::select! {
                r = self.connect(&url) => r,
                _ = cancel.cancelled() => return None,
            };
            match result {
                Ok(ws) => {
                    self.emit(ChannelEvent::Connected { url });
                    return Some(ws);
                }
                Err(e) => self.emit(ChannelEvent::ReconnectFailed {
                    attempt,
                    error: e.to_string(),
                }),
            }
        }
    }
}

/// Session driver: pump the socket, reconnect when it drops, repeat until
/// the session is closed or vetoed.
async fn drive(
    inner: Arc<Inner>,
    id: u64,
    mut ws: WsStream,
    mut outbound: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        match pump(&inner, &mut ws, &mut outbound, &cancel).await {
            Exit::Cancelled => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "".into(),
                };
                if let Err(e) = ws.close(Some(frame)).await {
                    tracing::debug!(error = %e, "close handshake failed");
                }
                return;
            }
            Exit::Dropped(reason) => {
                inner.emit(ChannelEvent::Disconnected { reason });
            }
        }

        if !inner.transition(id, ConnectionState::Retrying) {
            return;
        }
        ws = match inner.reconnect(id, &cancel).await {
            Some(next) => next,
            None => return,
        };
        let stale = discard_stale(&mut outbound);
        if stale > 0 {
            tracing::debug!(stale, "dropped interval messages queued for the old socket");
        }
        if !inner.transition(id, ConnectionState::Open) {
            // Closed between connect and now; discard the new socket.
            let _ = ws.close(None).await;
            return;
        }
    }
}

/// Empty the outbound queue. Messages still queued when a socket drops
/// are not replayed; the reconnect URL already carries the interval.
fn discard_stale(outbound: &mut mpsc::Receiver<String>) -> usize {
    let mut dropped = 0;
    while outbound.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}

async fn pump(
    inner: &Inner,
    ws: &mut WsStream,
    outbound: &mut mpsc::Receiver<String>,
    cancel: &CancellationToken,
) -> Exit {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Exit::Cancelled,
            Some(text) = outbound.recv() => {
                if let Err(e) = ws.send(Message::Text(text)).await {
                    return Exit::Dropped(format!("send failed: {e}"));
                }
            }
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => inner.deliver(&text),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("closed by service ({}): {}", u16::from(f.code), f.reason))
                        .unwrap_or_else(|| "closed by service".into());
                    return Exit::Dropped(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Exit::Dropped(e.to_string()),
                None => return Exit::Dropped("connection ended".into()),
            },
        }
    }
}
