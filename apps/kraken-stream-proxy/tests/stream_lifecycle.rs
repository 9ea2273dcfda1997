//! Connection lifecycle tests against an in-process WebSocket server:
//! subscribe-after-settle, dedup, remote-close reconnect, local close,
//! and the synthetic fallback when the exchange is unreachable.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kraken_stream_proxy::KrakenClient;
use kraken_stream_proxy::{
    BroadcastGateway, InstrumentCatalog, KrakenSettings, MarketStream, PriceSource, PriceStore,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Gateway that drops everything; these tests assert against the store.
struct NullGateway;

impl BroadcastGateway for NullGateway {
    fn publish(&self, _topic: &str, _payload: serde_json::Value) {}
}

struct Harness {
    client: Arc<KrakenClient>,
    store: Arc<PriceStore>,
    catalog: Arc<InstrumentCatalog>,
}

fn harness(url: String, tracked: usize) -> Harness {
    let settings = KrakenSettings {
        ws_url: url,
        settle_delay: Duration::from_millis(50),
        reconnect_delay: Duration::from_millis(100),
        tracked_pair_count: tracked,
        ..KrakenSettings::default()
    };
    let catalog = Arc::new(InstrumentCatalog::new(tracked));
    let store = Arc::new(PriceStore::new(Arc::clone(&catalog), Arc::new(NullGateway)));
    let client = KrakenClient::new(
        settings,
        Arc::clone(&catalog),
        Arc::clone(&store),
        CancellationToken::new(),
    );
    Harness {
        client,
        store,
        catalog,
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

/// Next text frame, skipping everything else. `None` on stream end or
/// close.
async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> Option<String> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Some(text.to_string()),
            Some(Ok(Message::Close(_))) | None => return None,
            Some(_) => {}
        }
    }
}

/// Wait until `check` holds, polling every 10ms.
async fn wait_for(check: impl Fn() -> bool) {
    timeout(Duration::from_secs(3), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn subscribes_after_settle_and_applies_ticker_frames() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let frame = next_text(&mut ws).await.expect("no subscribe frame");
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "subscribe");
        assert_eq!(value["subscription"]["name"], "ticker");
        assert_eq!(value["pair"].as_array().unwrap().len(), 20);

        ws.send(Message::Text(
            r#"[340,{"a":["50010.5","1","1.000"],"b":["49990.2","2","2.000"],"c":["50000.1","0.5"],"v":["120.5","3400.7"]},"ticker","XBT/USD"]"#.into(),
        ))
        .await
        .unwrap();

        // Hold the connection open until the assertions are done.
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let h = harness(url, 20);
    h.client.connect().await;

    let store = Arc::clone(&h.store);
    wait_for(move || store.get("XBT/USD").is_some()).await;

    let snapshot = h.store.get("XBT/USD").unwrap();
    assert_eq!(snapshot.last_price, rust_decimal::Decimal::new(500_001, 1));
    assert_eq!(snapshot.display_name, "Bitcoin");
    assert_eq!(snapshot.source, PriceSource::Exchange);
    assert!(h.client.is_connected());
    assert_eq!(h.client.subscription_count().await, 20);

    server.abort();
}

#[tokio::test]
async fn duplicate_subscribe_requests_send_only_new_pairs() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let first = next_text(&mut ws).await.expect("no subscribe frame");
        let second = next_text(&mut ws).await.expect("no second frame");
        let third = next_text(&mut ws).await.expect("no third frame");
        (first, second, third)
    });

    let h = harness(url, 2);
    h.client.connect().await;

    let client = Arc::clone(&h.client);
    wait_for(move || client.is_connected()).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Everything already subscribed: must not produce a frame.
    let tracked: Vec<String> = h.catalog.list().into_iter().map(|i| i.symbol).collect();
    h.client.subscribe_to_pairs(&tracked).await;

    // One new pair mixed with a known one: only the new pair goes out.
    h.client
        .subscribe_to_pairs(&["XBT/USD".to_string(), "SOL/USD".to_string()])
        .await;

    // Unsubscribe filters to subscribed pairs only.
    h.client
        .unsubscribe_from_pairs(&["XBT/USD".to_string(), "NOPE/USD".to_string()])
        .await;

    let (first, second, third) = timeout(Duration::from_secs(3), server)
        .await
        .unwrap()
        .unwrap();

    let first: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(first["pair"].as_array().unwrap().len(), 2);

    let second: serde_json::Value = serde_json::from_str(&second).unwrap();
    let pairs = second["pair"].as_array().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0], "SOL/USD");

    let third: serde_json::Value = serde_json::from_str(&third).unwrap();
    assert_eq!(third["event"], "unsubscribe");
    assert_eq!(third["pair"].as_array().unwrap().len(), 1);
    assert_eq!(third["pair"][0], "XBT/USD");

    assert_eq!(h.client.subscription_count().await, 2);
}

#[tokio::test]
async fn remote_close_schedules_a_reconnect_and_resubscribes() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _ = next_text(&mut ws).await;
        ws.close(None).await.unwrap();
        while ws.next().await.is_some() {}
        drop(ws);

        // The reconnect arrives after the fixed delay.
        let (stream, _) = timeout(Duration::from_secs(3), listener.accept())
            .await
            .expect("no reconnect attempt")
            .unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let frame = next_text(&mut ws).await.expect("no resubscribe frame");
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "subscribe");
        assert_eq!(value["pair"].as_array().unwrap().len(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let h = harness(url, 2);
    h.client.connect().await;

    // The session drops and comes back; wait until usable again with a
    // fresh subscription set.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let client = Arc::clone(&h.client);
    wait_for(move || client.is_connected()).await;

    timeout(Duration::from_secs(3), async {
        while h.client.subscription_count().await != 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("resubscription did not complete");

    server.abort();
}

#[tokio::test]
async fn local_disconnect_suppresses_the_reconnect() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _ = next_text(&mut ws).await;
        // Drain until the client closes locally.
        while ws.next().await.is_some() {}

        // No reconnect may follow a local close.
        timeout(Duration::from_millis(600), listener.accept())
            .await
            .is_ok()
    });

    let h = harness(url, 2);
    h.client.connect().await;

    let client = Arc::clone(&h.client);
    wait_for(move || client.is_connected()).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    h.client.disconnect().await;
    assert!(!h.client.is_connected());
    assert_eq!(h.client.subscription_count().await, 0);

    let reconnected = timeout(Duration::from_secs(3), server)
        .await
        .unwrap()
        .unwrap();
    assert!(!reconnected, "client reconnected after a local close");
}

#[tokio::test]
async fn unreachable_exchange_falls_back_to_synthetic_data() {
    // Nothing listens on this address; the connect attempt fails fast.
    let h = harness("ws://127.0.0.1:9".to_string(), 20);
    h.client.connect().await;

    assert!(!h.client.is_connected());
    assert_eq!(h.store.len(), 20);
    for snapshot in h.store.list() {
        assert_eq!(snapshot.source, PriceSource::Synthetic);
    }
}
