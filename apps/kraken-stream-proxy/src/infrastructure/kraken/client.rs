//! Kraken WebSocket Client
//!
//! Connects to Kraken's public ticker stream and drives the price
//! pipeline.
//!
//! # Lifecycle
//!
//! The client runs for the process lifetime and always works its way back
//! to `Connected`. A remote close tears the session down and schedules a
//! reconnect after a fixed delay; a local `disconnect` does not reconnect.
//! After the handshake the client waits out a short settling delay before
//! sending its first subscribe request.
//!
//! # Exclusive section
//!
//! The write half of the socket and the subscription set live behind one
//! async mutex. Every subscribe request and every teardown runs inside
//! that critical section, which is what prevents double-subscribes between
//! the post-connect path and the periodic reconciliation path.
//!
//! Read-side transport errors are logged and skipped; only a close frame
//! or stream end ends the session.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::codec::{CodecError, KrakenMessage, TickerWireCodec};
use super::fallback;
use crate::application::ports::MarketStream;
use crate::domain::instrument::InstrumentCatalog;
use crate::domain::subscription::{ConnectionState, SubscriptionSet};
use crate::domain::ticker::TickerUpdate;
use crate::infrastructure::config::KrakenSettings;
use crate::infrastructure::price_store::PriceStore;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

// =============================================================================
// Error Type
// =============================================================================

/// Errors internal to the streaming client. Nothing here escapes to
/// callers; the public surface logs and recovers.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The write half is gone; the session is being torn down.
    #[error("connection has no open sink")]
    NoSink,
}

// =============================================================================
// Connection Internals
// =============================================================================

/// State guarded by the connection's exclusive section.
struct ConnectionInner {
    sink: Option<WsSink>,
    subscriptions: SubscriptionSet,
}

impl ConnectionInner {
    fn new() -> Self {
        Self {
            sink: None,
            subscriptions: SubscriptionSet::new(),
        }
    }
}

// =============================================================================
// Kraken Client
// =============================================================================

/// WebSocket client for Kraken's public ticker stream.
///
/// Decoded ticker frames are pushed straight into the price store; control
/// frames are logged. Construction does not connect; call
/// [`MarketStream::connect`] to start the session.
pub struct KrakenClient {
    settings: KrakenSettings,
    codec: TickerWireCodec,
    catalog: Arc<InstrumentCatalog>,
    store: Arc<PriceStore>,
    state: parking_lot::RwLock<ConnectionState>,
    conn: tokio::sync::Mutex<ConnectionInner>,
    /// Set by a local `disconnect`; suppresses the scheduled reconnect.
    local_close: AtomicBool,
    /// Bumped on every connect and local disconnect so a read loop from a
    /// torn-down session cannot clobber its successor.
    epoch: AtomicU64,
    shutdown: CancellationToken,
    self_ref: Weak<Self>,
}

impl KrakenClient {
    /// Create a new client. Does not connect.
    #[must_use]
    pub fn new(
        settings: KrakenSettings,
        catalog: Arc<InstrumentCatalog>,
        store: Arc<PriceStore>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            settings,
            codec: TickerWireCodec::new(),
            catalog,
            store,
            state: parking_lot::RwLock::new(ConnectionState::Disconnected),
            conn: tokio::sync::Mutex::new(ConnectionInner::new()),
            local_close: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            shutdown: shutdown.clone(),
            self_ref: self_ref.clone(),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Number of pairs subscribed on the live connection.
    pub async fn subscription_count(&self) -> usize {
        self.conn.lock().await.subscriptions.len()
    }

    /// Subscribe to every tracked catalog pair.
    ///
    /// An empty catalog means no live data can ever arrive, so the
    /// synthetic fallback fills the store instead.
    pub async fn subscribe_from_catalog(&self) {
        let pairs: Vec<String> = self
            .catalog
            .list()
            .into_iter()
            .map(|instrument| instrument.symbol)
            .collect();

        if pairs.is_empty() {
            fallback::publish_synthetic(&self.store);
            return;
        }

        self.subscribe_to_pairs(&pairs).await;
    }

    /// Periodic reconciliation pass: subscribe to any tracked pair the
    /// live connection is missing. Runs the synthetic fallback if the
    /// subscription set is still empty afterwards.
    pub async fn reconcile_subscriptions(&self) {
        if !self.is_connected() {
            tracing::debug!("Skipping reconciliation while disconnected");
            return;
        }

        self.subscribe_from_catalog().await;

        let still_empty = self.conn.lock().await.subscriptions.is_empty();
        if still_empty {
            fallback::publish_synthetic(&self.store);
        }
    }

    /// Open the transport and start the session tasks.
    async fn open_session(self: &Arc<Self>) {
        tracing::info!(url = %self.settings.ws_url, "Connecting to Kraken stream");

        let ws_stream = match tokio_tungstenite::connect_async(&self.settings.ws_url).await {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                tracing::error!(error = %e, "Kraken connection failed");
                *self.state.write() = ConnectionState::Disconnected;
                // Consumers still need something to render while the
                // next attempt is pending.
                fallback::publish_synthetic(&self.store);
                if !self.local_close.load(Ordering::SeqCst) {
                    self.schedule_reconnect();
                }
                return;
            }
        };

        let (write, read) = ws_stream.split();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut conn = self.conn.lock().await;
            conn.sink = Some(write);
            conn.subscriptions.clear();
        }
        *self.state.write() = ConnectionState::Connected;
        tracing::info!("Kraken stream connected");

        let reader = Arc::clone(self);
        tokio::spawn(async move {
            reader.read_loop(read, epoch).await;
        });

        let subscriber = Arc::clone(self);
        let settle_delay = self.settings.settle_delay;
        tokio::spawn(async move {
            tokio::select! {
                () = subscriber.shutdown.cancelled() => {}
                () = tokio::time::sleep(settle_delay) => {
                    subscriber.subscribe_from_catalog().await;
                }
            }
        });
    }

    /// Consume frames until the session ends.
    async fn read_loop(self: Arc<Self>, mut read: WsSource, epoch: u64) {
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    tracing::info!("Kraken read loop cancelled");
                    return;
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            self.send_pong(data).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::warn!("Kraken sent close frame");
                            self.on_transport_closed(epoch).await;
                            return;
                        }
                        Some(Ok(_)) => {
                            // Binary and pong frames carry nothing for us.
                        }
                        Some(Err(e)) => {
                            // Transport hiccups do not end the session.
                            tracing::warn!(error = %e, "Kraken transport error");
                        }
                        None => {
                            tracing::warn!("Kraken stream ended");
                            self.on_transport_closed(epoch).await;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Decode one text frame and route it.
    fn handle_frame(&self, text: &str) {
        match self.codec.decode(text) {
            KrakenMessage::Ticker(ticker) => {
                self.store.update(TickerUpdate::exchange(
                    ticker.pair,
                    ticker.last_price,
                    ticker.ask_price,
                    ticker.bid_price,
                    ticker.volume_24h,
                    Utc::now(),
                ));
            }
            KrakenMessage::Heartbeat => {
                tracing::trace!("Kraken heartbeat");
            }
            KrakenMessage::SystemStatus {
                status,
                connection_id,
            } => {
                tracing::info!(status, connection_id, "Kraken system status");
            }
            KrakenMessage::SubscriptionAck {
                status,
                channel,
                pair,
            } => {
                if status == "error" {
                    tracing::warn!(channel, pair, "Kraken rejected a subscription");
                } else {
                    tracing::debug!(status, channel, pair, "Kraken subscription status");
                }
            }
            KrakenMessage::Unrecognized(diagnostic) => {
                tracing::debug!(
                    code = diagnostic.code(),
                    frame = text,
                    "Skipping unrecognized frame"
                );
            }
        }
    }

    /// Answer a transport ping on the shared sink.
    async fn send_pong(&self, data: tokio_tungstenite::tungstenite::Bytes) {
        let mut conn = self.conn.lock().await;
        if let Some(sink) = conn.sink.as_mut()
            && let Err(e) = sink.send(Message::Pong(data)).await
        {
            tracing::warn!(error = %e, "Failed to answer ping");
        }
    }

    /// Tear down after the remote side closed the transport, then
    /// schedule a reconnect unless the close was local.
    async fn on_transport_closed(&self, epoch: u64) {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("Ignoring close from a superseded session");
            return;
        }

        *self.state.write() = ConnectionState::ClosingForReconnect;
        {
            let mut conn = self.conn.lock().await;
            conn.sink = None;
            conn.subscriptions.clear();
        }
        *self.state.write() = ConnectionState::Disconnected;
        tracing::warn!("Kraken stream disconnected");

        if !self.local_close.load(Ordering::SeqCst) {
            self.schedule_reconnect();
        }
    }

    /// Spawn a delayed reconnect attempt, cancellable by shutdown.
    fn schedule_reconnect(&self) {
        let Some(client) = self.self_ref.upgrade() else {
            return;
        };
        let delay = self.settings.reconnect_delay;
        tracing::info!(delay_ms = delay.as_millis(), "Scheduling reconnect");

        tokio::spawn(async move {
            tokio::select! {
                () = client.shutdown.cancelled() => {
                    tracing::info!("Reconnect cancelled by shutdown");
                }
                () = tokio::time::sleep(delay) => {
                    client.connect().await;
                }
            }
        });
    }
}

#[async_trait]
impl MarketStream for KrakenClient {
    async fn connect(&self) {
        {
            let mut state = self.state.write();
            match *state {
                ConnectionState::Connecting | ConnectionState::Connected => {
                    tracing::debug!(state = state.as_str(), "Connect is a no-op");
                    return;
                }
                ConnectionState::Disconnected | ConnectionState::ClosingForReconnect => {
                    *state = ConnectionState::Connecting;
                }
            }
        }
        self.local_close.store(false, Ordering::SeqCst);

        let Some(client) = self.self_ref.upgrade() else {
            return;
        };
        client.open_session().await;
    }

    async fn disconnect(&self) {
        self.local_close.store(true, Ordering::SeqCst);
        // Invalidate the running read loop so its close handling is stale.
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let mut conn = self.conn.lock().await;
        if let Some(mut sink) = conn.sink.take() {
            if let Err(e) = sink.send(Message::Close(None)).await {
                tracing::debug!(error = %e, "Close frame not delivered");
            }
            let _ = sink.close().await;
        }
        conn.subscriptions.clear();
        drop(conn);

        *self.state.write() = ConnectionState::Disconnected;
        tracing::info!("Kraken stream disconnected locally");
    }

    async fn subscribe_to_pairs(&self, pairs: &[String]) {
        if !self.is_connected() {
            tracing::debug!(requested = pairs.len(), "Not connected; subscribe skipped");
            return;
        }

        let mut conn = self.conn.lock().await;
        let missing = conn.subscriptions.missing_from(pairs);
        if missing.is_empty() {
            tracing::debug!(requested = pairs.len(), "All pairs already subscribed");
            return;
        }

        let result: Result<(), StreamClientError> = async {
            let frame = self.codec.encode_subscribe(&missing)?;
            let sink = conn.sink.as_mut().ok_or(StreamClientError::NoSink)?;
            sink.send(Message::Text(frame.into())).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!(count = missing.len(), "Subscribed to ticker pairs");
                // Recorded only after the send succeeded, so a failed
                // batch is retried by the next reconciliation pass.
                conn.subscriptions.insert_all(missing);
            }
            Err(e) => {
                tracing::warn!(error = %e, count = missing.len(), "Subscribe request failed");
            }
        }
    }

    async fn unsubscribe_from_pairs(&self, pairs: &[String]) {
        if !self.is_connected() {
            tracing::debug!(requested = pairs.len(), "Not connected; unsubscribe skipped");
            return;
        }

        let mut conn = self.conn.lock().await;
        let known = conn.subscriptions.known(pairs);
        if known.is_empty() {
            tracing::debug!(requested = pairs.len(), "No matching subscriptions");
            return;
        }

        let result: Result<(), StreamClientError> = async {
            let frame = self.codec.encode_unsubscribe(&known)?;
            let sink = conn.sink.as_mut().ok_or(StreamClientError::NoSink)?;
            sink.send(Message::Text(frame.into())).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!(count = known.len(), "Unsubscribed from ticker pairs");
                conn.subscriptions.remove_all(&known);
            }
            Err(e) => {
                tracing::warn!(error = %e, count = known.len(), "Unsubscribe request failed");
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.state.read().is_connected()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockBroadcastGateway;

    fn test_client() -> Arc<KrakenClient> {
        let mut gateway = MockBroadcastGateway::new();
        gateway.expect_publish().return_const(());
        let catalog = Arc::new(InstrumentCatalog::new(20));
        let store = Arc::new(PriceStore::new(Arc::clone(&catalog), Arc::new(gateway)));
        KrakenClient::new(
            KrakenSettings::default(),
            catalog,
            store,
            CancellationToken::new(),
        )
    }

    #[test]
    fn new_client_starts_disconnected() {
        let client = test_client();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn subscribe_while_disconnected_is_a_noop() {
        let client = test_client();
        client
            .subscribe_to_pairs(&["XBT/USD".to_string()])
            .await;
        assert_eq!(client.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn unsubscribe_while_disconnected_is_a_noop() {
        let client = test_client();
        client
            .unsubscribe_from_pairs(&["XBT/USD".to_string()])
            .await;
        assert_eq!(client.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn disconnect_while_disconnected_is_idempotent() {
        let client = test_client();
        client.disconnect().await;
        client.disconnect().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn reconcile_while_disconnected_does_nothing() {
        let client = test_client();
        client.reconcile_subscriptions().await;
        assert_eq!(client.subscription_count().await, 0);
    }

    #[test]
    fn ticker_frame_updates_the_store() {
        let client = test_client();
        client.handle_frame(
            r#"[340,{"c":["50000.1","0.5"]},"ticker","XBT/USD"]"#,
        );
        let snapshot = client.store.get("XBT/USD").unwrap();
        assert_eq!(snapshot.last_price, rust_decimal::Decimal::new(500_001, 1));
        assert_eq!(snapshot.display_name, "Bitcoin");
    }

    #[test]
    fn control_and_garbage_frames_do_not_update_the_store() {
        let client = test_client();
        client.handle_frame(r#"{"event":"heartbeat"}"#);
        client.handle_frame(r#"{"event":"systemStatus","status":"online"}"#);
        client.handle_frame("not json");
        assert!(client.store.is_empty());
    }

    #[tokio::test]
    async fn empty_catalog_triggers_synthetic_fallback() {
        let mut gateway = MockBroadcastGateway::new();
        gateway.expect_publish().return_const(());
        let catalog = Arc::new(InstrumentCatalog::new(0));
        let store = Arc::new(PriceStore::new(Arc::clone(&catalog), Arc::new(gateway)));
        let client = KrakenClient::new(
            KrakenSettings::default(),
            catalog,
            Arc::clone(&store),
            CancellationToken::new(),
        );

        client.subscribe_from_catalog().await;
        assert_eq!(store.len(), 20);
    }
}
