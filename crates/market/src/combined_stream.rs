//! Combined-stream WebSocket client.
//!
//! One socket carries every subscribed stream. A supervisor task owns the read
//! half, routes each `{stream, data}` frame to the matching subscriber channel,
//! and on any read failure (including the idle timeout) redials and replays the
//! subscription ledger before resuming.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected -> Reconnecting -> Connected
//!                                   any state --close()--> Closed
//! ```

use crate::error::StreamError;
use crate::protocol::{kline_stream, ControlRequest, InboundFrame};
use crate::proxy::{connect_tunnel, proxy_from_env};
use crate::registry::{DispatchOutcome, Payload, StreamRegistry};
use crate::retry::RetryPolicy;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use perp_trader_core::StreamSettings;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: String,
    /// Streams per SUBSCRIBE frame.
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    /// Maximum silence on the socket before it is considered dead.
    pub idle_timeout: Duration,
    pub handshake_timeout: Duration,
    /// Buffer used by [`CombinedStreamClient::add_subscriber`] callers that take the default.
    pub subscriber_buffer: usize,
    pub reconnect: RetryPolicy,
    pub proxy: Option<Url>,
}

impl StreamConfig {
    /// Builds a config from loaded settings, resolving the proxy from the environment.
    #[must_use]
    pub fn from_settings(settings: &StreamSettings) -> Self {
        Self {
            url: settings.url.clone(),
            batch_size: settings.batch_size.max(1),
            inter_batch_delay: Duration::from_millis(settings.inter_batch_delay_ms),
            idle_timeout: Duration::from_secs(settings.idle_timeout_secs),
            handshake_timeout: Duration::from_secs(settings.handshake_timeout_secs),
            subscriber_buffer: settings.subscriber_buffer.max(1),
            reconnect: RetryPolicy::from(&settings.reconnect),
            proxy: proxy_from_env(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::from_settings(&StreamSettings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// Point-in-time counters for a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub frames_received: u64,
    pub ticks_delivered: u64,
    pub ticks_dropped: u64,
    pub unroutable_frames: u64,
    pub parse_errors: u64,
    pub reconnects: u64,
}

#[derive(Default)]
struct Counters {
    frames_received: AtomicU64,
    ticks_delivered: AtomicU64,
    ticks_dropped: AtomicU64,
    unroutable_frames: AtomicU64,
    parse_errors: AtomicU64,
    reconnects: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StreamStats {
        StreamStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            ticks_delivered: self.ticks_delivered.load(Ordering::Relaxed),
            ticks_dropped: self.ticks_dropped.load(Ordering::Relaxed),
            unroutable_frames: self.unroutable_frames.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Every stream ever requested, deduplicated, in first-seen order.
#[derive(Debug, Default)]
struct Ledger {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl Ledger {
    fn extend(&mut self, streams: &[String]) {
        for stream in streams {
            if self.seen.insert(stream.clone()) {
                self.order.push(stream.clone());
            }
        }
    }

    fn remove(&mut self, streams: &[String]) {
        for stream in streams {
            self.seen.remove(stream);
        }
        let seen = &self.seen;
        self.order.retain(|s| seen.contains(s));
    }
}

/// Writer half and ledger share one lock so a reconnect swaps both atomically.
struct Connection {
    writer: Option<WsSink>,
    ledger: Ledger,
}

struct Shared {
    config: StreamConfig,
    conn: Mutex<Connection>,
    registry: parking_lot::Mutex<StreamRegistry>,
    counters: Counters,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    closed: AtomicBool,
    next_id: AtomicU64,
    /// Pong owed to the server while another task held the writer.
    pending_pong: parking_lot::Mutex<Option<Vec<u8>>>,
}

enum ReadEnd {
    Cancelled,
    Failed(String),
}

pub struct CombinedStreamClient {
    shared: Arc<Shared>,
    supervisor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl CombinedStreamClient {
    #[must_use]
    pub fn new(config: StreamConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        // Request ids start at the wall clock and increase monotonically.
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(1, |d| d.as_millis() as u64);

        Self {
            shared: Arc::new(Shared {
                config,
                conn: Mutex::new(Connection {
                    writer: None,
                    ledger: Ledger::default(),
                }),
                registry: parking_lot::Mutex::new(StreamRegistry::new()),
                counters: Counters::default(),
                state,
                cancel: CancellationToken::new(),
                closed: AtomicBool::new(false),
                next_id: AtomicU64::new(seed),
                pending_pong: parking_lot::Mutex::new(None),
            }),
            supervisor: parking_lot::Mutex::new(None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.shared.config
    }

    /// Opens the socket and starts the read supervisor.
    ///
    /// Calling this while a supervisor is already running is a no-op.
    ///
    /// # Errors
    /// Returns [`StreamError::ConnectionFailed`] (or [`StreamError::Proxy`] /
    /// [`StreamError::InvalidUrl`]) if the first dial fails, and
    /// [`StreamError::Closed`] if [`Self::close`] ran before or during the dial.
    /// The first dial is never retried here.
    pub async fn connect(&self) -> Result<(), StreamError> {
        if self.shared.is_closed() {
            return Err(StreamError::Closed);
        }
        if self.supervisor.lock().is_some() {
            tracing::debug!("Combined stream already connected");
            return Ok(());
        }

        self.shared.set_state(ConnectionState::Connecting);
        let dialed = tokio::select! {
            () = self.shared.cancel.cancelled() => Err(StreamError::Closed),
            dialed = dial(&self.shared.config) => dialed,
        };
        let ws = match dialed {
            Ok(ws) => ws,
            Err(e) => {
                if self.shared.is_closed() {
                    self.shared.set_state(ConnectionState::Closed);
                    return Err(StreamError::Closed);
                }
                self.shared.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let (mut write, read) = ws.split();
        let mut conn = self.shared.conn.lock().await;
        // close() flags shutdown before it takes this lock.
        if self.shared.is_closed() {
            drop(conn);
            let goodbye = async {
                let _ = write.send(Message::Close(None)).await;
                let _ = write.close().await;
            };
            let _ = tokio::time::timeout(CLOSE_FRAME_TIMEOUT, goodbye).await;
            self.shared.set_state(ConnectionState::Closed);
            tracing::debug!("Discarded connection opened during shutdown");
            return Err(StreamError::Closed);
        }

        conn.writer = Some(write);
        self.shared.set_state(ConnectionState::Connected);
        tracing::info!(url = %self.shared.config.url, "Combined stream connected");

        let handle = tokio::spawn(supervise(Arc::clone(&self.shared), read));
        *self.supervisor.lock() = Some(handle);
        drop(conn);
        Ok(())
    }

    /// Subscribes to `<symbol>@kline_<interval>` for every symbol.
    ///
    /// # Errors
    /// See [`Self::subscribe_streams`].
    pub async fn batch_subscribe<S: AsRef<str>>(
        &self,
        symbols: &[S],
        interval: &str,
    ) -> Result<(), StreamError> {
        let streams: Vec<String> = symbols
            .iter()
            .map(|s| kline_stream(s.as_ref(), interval))
            .collect();
        self.subscribe_streams(&streams).await
    }

    /// Sends SUBSCRIBE frames of at most `batch_size` streams each, pausing
    /// `inter_batch_delay` between frames.
    ///
    /// Streams are recorded in the ledger before sending, so a failed send is
    /// still replayed on the next reconnect.
    ///
    /// # Errors
    /// Returns [`StreamError::BatchFailed`] naming the first batch (1-based)
    /// whose send failed; later batches are not attempted.
    pub async fn subscribe_streams(&self, streams: &[String]) -> Result<(), StreamError> {
        if self.shared.is_closed() {
            return Err(StreamError::Closed);
        }
        if streams.is_empty() {
            return Ok(());
        }

        let mut conn = self.shared.conn.lock().await;
        conn.ledger.extend(streams);

        let batch_size = self.shared.config.batch_size.max(1);
        let total = streams.len().div_ceil(batch_size);
        for (index, batch) in streams.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.shared.config.inter_batch_delay).await;
            }
            let request = ControlRequest::subscribe(batch, self.shared.next_id());
            self.shared
                .send_control(&mut conn, &request)
                .await
                .map_err(|e| StreamError::batch(index + 1, e))?;
            tracing::debug!(batch = index + 1, total, streams = batch.len(), "Sent SUBSCRIBE");
        }

        tracing::info!(streams = streams.len(), batches = total, "Subscribed to market streams");
        Ok(())
    }

    /// Removes streams from the ledger and sends UNSUBSCRIBE when connected.
    ///
    /// # Errors
    /// Returns [`StreamError::BatchFailed`] if a send fails.
    pub async fn unsubscribe(&self, streams: &[String]) -> Result<(), StreamError> {
        if self.shared.is_closed() {
            return Err(StreamError::Closed);
        }

        let mut conn = self.shared.conn.lock().await;
        conn.ledger.remove(streams);
        if conn.writer.is_none() || streams.is_empty() {
            return Ok(());
        }

        let batch_size = self.shared.config.batch_size.max(1);
        for (index, batch) in streams.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.shared.config.inter_batch_delay).await;
            }
            let request = ControlRequest::unsubscribe(batch, self.shared.next_id());
            self.shared
                .send_control(&mut conn, &request)
                .await
                .map_err(|e| StreamError::batch(index + 1, e))?;
        }
        Ok(())
    }

    /// Asks the server for its active subscriptions. The reply is logged by the
    /// read loop; the returned id correlates it.
    ///
    /// # Errors
    /// Returns [`StreamError::NotConnected`] without a live socket.
    pub async fn list_subscriptions(&self) -> Result<u64, StreamError> {
        let id = self.shared.next_id();
        let mut conn = self.shared.conn.lock().await;
        self.shared
            .send_control(&mut conn, &ControlRequest::list_subscriptions(id))
            .await?;
        Ok(id)
    }

    /// Registers a bounded channel for `stream`, replacing any previous one.
    ///
    /// After shutdown the returned receiver is already closed.
    pub fn add_subscriber(&self, stream: impl Into<String>, buffer: usize) -> mpsc::Receiver<Payload> {
        if self.shared.is_closed() {
            let (_, rx) = mpsc::channel(1);
            return rx;
        }
        let stream = stream.into();
        tracing::debug!(stream = %stream, buffer, "Registered subscriber");
        self.shared.registry.lock().insert(stream, buffer)
    }

    pub fn remove_subscriber(&self, stream: &str) -> bool {
        self.shared.registry.lock().remove(stream)
    }

    pub async fn subscribed_streams(&self) -> Vec<String> {
        self.shared.conn.lock().await.ledger.order.clone()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.shared.counters.snapshot()
    }

    /// Stops the supervisor, closes the socket and every subscriber channel.
    ///
    /// Safe to call any number of times; only the first call does work.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.cancel.cancel();
        self.join_supervisor().await;

        let writer = self.shared.conn.lock().await.writer.take();
        // A connect() that passed its shutdown check may have spawned one meanwhile.
        self.join_supervisor().await;
        if let Some(mut writer) = writer {
            let goodbye = async {
                let _ = writer.send(Message::Close(None)).await;
                let _ = writer.close().await;
            };
            if tokio::time::timeout(CLOSE_FRAME_TIMEOUT, goodbye).await.is_err() {
                tracing::debug!("Timed out sending close frame");
            }
        }

        let channels = self.shared.registry.lock().drain();
        self.shared.set_state(ConnectionState::Closed);
        tracing::info!(channels, "Combined stream closed");
    }
}

impl CombinedStreamClient {
    async fn join_supervisor(&self) {
        let handle = self.supervisor.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Stream supervisor ended abnormally");
            }
        }
    }
}

impl Drop for CombinedStreamClient {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    async fn send_control(
        &self,
        conn: &mut Connection,
        request: &ControlRequest<'_>,
    ) -> Result<(), StreamError> {
        let text = serde_json::to_string(request)?;
        if conn.writer.is_none() {
            return Err(StreamError::NotConnected);
        }
        self.flush_pending_pong(conn).await;
        let writer = conn.writer.as_mut().ok_or(StreamError::NotConnected)?;
        writer.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn flush_pending_pong(&self, conn: &mut Connection) {
        let pending = self.pending_pong.lock().take();
        let (Some(data), Some(writer)) = (pending, conn.writer.as_mut()) else {
            return;
        };
        if let Err(e) = writer.send(Message::Pong(data)).await {
            tracing::debug!(error = %e, "Failed to answer ping");
        }
    }

    /// Sends an owed pong if the writer is free. A busy writer sends it ahead
    /// of its next control frame instead.
    async fn try_flush_pong(&self) {
        if self.pending_pong.lock().is_none() {
            return;
        }
        if let Ok(mut conn) = self.conn.try_lock() {
            self.flush_pending_pong(&mut conn).await;
        }
    }

    /// Replays the ledger after a reconnect. Failed batches are logged and skipped.
    async fn resubscribe(&self, conn: &mut Connection) {
        let streams = conn.ledger.order.clone();
        if streams.is_empty() {
            return;
        }

        let batch_size = self.config.batch_size.max(1);
        let mut failed = 0usize;
        for (index, batch) in streams.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.inter_batch_delay).await;
            }
            let request = ControlRequest::subscribe(batch, self.next_id());
            if let Err(e) = self.send_control(conn, &request).await {
                failed += 1;
                tracing::warn!(batch = index + 1, error = %e, "Resubscribe batch failed");
            }
        }

        tracing::info!(streams = streams.len(), failed_batches = failed, "Resubscribed after reconnect");
    }

    fn handle_text(&self, text: &str) {
        Counters::bump(&self.counters.frames_received);

        match InboundFrame::parse(text) {
            Ok(InboundFrame::Stream(frame)) => {
                let outcome = self.registry.lock().dispatch(&frame.stream, frame.payload());
                match outcome {
                    DispatchOutcome::Delivered => Counters::bump(&self.counters.ticks_delivered),
                    DispatchOutcome::Dropped => {
                        Counters::bump(&self.counters.ticks_dropped);
                        tracing::warn!(stream = %frame.stream, "Subscriber buffer full, dropping tick");
                    }
                    DispatchOutcome::Closed => {
                        tracing::debug!(stream = %frame.stream, "Subscriber gone, removed from registry");
                    }
                    DispatchOutcome::NoSubscriber => {
                        Counters::bump(&self.counters.unroutable_frames);
                        tracing::trace!(stream = %frame.stream, "No subscriber for stream");
                    }
                }
            }
            Ok(InboundFrame::Reply(reply)) => {
                tracing::debug!(id = reply.id, result = %reply.result, "Control request acknowledged");
            }
            Ok(InboundFrame::Error(err)) => {
                tracing::warn!(
                    id = ?err.id,
                    code = err.error.code,
                    msg = %err.error.msg,
                    "Control request rejected"
                );
            }
            Err(e) => {
                Counters::bump(&self.counters.parse_errors);
                tracing::debug!(error = %e, "Skipping unrecognized frame");
            }
        }
    }

    fn shutdown_after_exhaustion(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let channels = self.registry.lock().drain();
        self.set_state(ConnectionState::Closed);
        tracing::error!(channels, "Reconnect attempts exhausted, combined stream closed");
    }
}

async fn dial(config: &StreamConfig) -> Result<WsStream, StreamError> {
    let url = Url::parse(&config.url)
        .map_err(|e| StreamError::InvalidUrl(format!("{}: {e}", config.url)))?;

    let handshake = async {
        let (ws, _response) = match &config.proxy {
            Some(proxy) => {
                let tunnel = connect_tunnel(proxy, &url).await?;
                tokio_tungstenite::client_async_tls(url.as_str(), tunnel)
                    .await
                    .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?
            }
            None => connect_async(url.as_str())
                .await
                .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?,
        };
        Ok::<_, StreamError>(ws)
    };

    tokio::time::timeout(config.handshake_timeout, handshake)
        .await
        .map_err(|_| {
            StreamError::ConnectionFailed(format!(
                "handshake timed out after {:?}",
                config.handshake_timeout
            ))
        })?
}

async fn supervise(shared: Arc<Shared>, mut read: WsRead) {
    loop {
        let reason = match read_loop(&shared, &mut read).await {
            ReadEnd::Cancelled => break,
            ReadEnd::Failed(reason) => reason,
        };

        tracing::warn!(reason = %reason, "Combined stream disconnected");
        shared.conn.lock().await.writer = None;
        shared.pending_pong.lock().take();
        shared.set_state(ConnectionState::Disconnected);

        match reconnect(&shared).await {
            Ok(fresh) => read = fresh,
            Err(StreamError::Closed) => break,
            Err(e) => {
                tracing::error!(error = %e, "Giving up on combined stream");
                shared.shutdown_after_exhaustion();
                break;
            }
        }
    }
    tracing::debug!("Stream supervisor stopped");
}

async fn read_loop(shared: &Shared, read: &mut WsRead) -> ReadEnd {
    let idle = shared.config.idle_timeout;
    loop {
        let next = tokio::select! {
            () = shared.cancel.cancelled() => return ReadEnd::Cancelled,
            next = tokio::time::timeout(idle, read.next()) => next,
        };

        let message = match next {
            Err(_) => return ReadEnd::Failed(format!("no data for {idle:?}")),
            Ok(None) => return ReadEnd::Failed("stream ended".to_string()),
            Ok(Some(Err(e))) => return ReadEnd::Failed(e.to_string()),
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => shared.handle_text(&text),
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => shared.handle_text(text),
                Err(_) => Counters::bump(&shared.counters.parse_errors),
            },
            Message::Ping(data) => *shared.pending_pong.lock() = Some(data),
            Message::Close(frame) => {
                return ReadEnd::Failed(format!("server sent close: {frame:?}"));
            }
            Message::Pong(_) | Message::Frame(_) => {}
        }
        shared.try_flush_pong().await;
    }
}

async fn reconnect(shared: &Shared) -> Result<WsRead, StreamError> {
    let policy = &shared.config.reconnect;
    let mut attempt: u32 = 0;

    loop {
        if shared.cancel.is_cancelled() {
            return Err(StreamError::Closed);
        }
        if !policy.allows(attempt) {
            return Err(StreamError::RetriesExhausted(attempt));
        }
        attempt += 1;
        shared.set_state(ConnectionState::Reconnecting);

        let delay = policy.delay_for(attempt);
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting combined stream");
        tokio::select! {
            () = shared.cancel.cancelled() => return Err(StreamError::Closed),
            () = tokio::time::sleep(delay) => {}
        }

        let dialed = tokio::select! {
            () = shared.cancel.cancelled() => return Err(StreamError::Closed),
            dialed = dial(&shared.config) => dialed,
        };

        match dialed {
            Ok(ws) => {
                let (write, read) = ws.split();
                let mut conn = shared.conn.lock().await;
                conn.writer = Some(write);
                shared.resubscribe(&mut conn).await;
                drop(conn);

                Counters::bump(&shared.counters.reconnects);
                shared.set_state(ConnectionState::Connected);
                tracing::info!(attempt, "Combined stream reconnected");
                return Ok(read);
            }
            Err(e) => {
                tracing::error!(attempt, error = %e, "Reconnect attempt failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_dedups_in_first_seen_order() {
        let mut ledger = Ledger::default();
        ledger.extend(&["a".to_string(), "b".to_string()]);
        ledger.extend(&["b".to_string(), "c".to_string()]);
        assert_eq!(ledger.order, vec!["a", "b", "c"]);

        ledger.remove(&["b".to_string()]);
        assert_eq!(ledger.order, vec!["a", "c"]);
        ledger.extend(&["b".to_string()]);
        assert_eq!(ledger.order, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = StreamSettings {
            batch_size: 0,
            ..StreamSettings::default()
        };
        let config = StreamConfig::from_settings(&settings);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.handshake_timeout, Duration::from_secs(45));
        assert_eq!(config.inter_batch_delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_subscribe_without_connection_reports_first_batch() {
        let client = CombinedStreamClient::new(StreamConfig {
            proxy: None,
            ..StreamConfig::default()
        });

        let err = client
            .batch_subscribe(&["BTCUSDT", "ETHUSDT"], "1m")
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::BatchFailed { batch: 1, .. }));
        assert_eq!(
            client.subscribed_streams().await,
            vec!["btcusdt@kline_1m", "ethusdt@kline_1m"]
        );
    }

    #[tokio::test]
    async fn test_close_before_connect() {
        let client = CombinedStreamClient::new(StreamConfig {
            proxy: None,
            ..StreamConfig::default()
        });
        let mut rx = client.add_subscriber("btcusdt@kline_1m", 4);

        client.close().await;
        client.close().await;

        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(rx.recv().await.is_none());
        assert!(matches!(client.connect().await, Err(StreamError::Closed)));
        assert!(client.add_subscriber("x", 1).recv().await.is_none());
    }
}
