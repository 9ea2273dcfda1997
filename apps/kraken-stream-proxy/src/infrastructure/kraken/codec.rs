//! Ticker Wire Codec
//!
//! Pure, stateless translation between Kraken's WebSocket frames and typed
//! messages.
//!
//! # Protocol
//!
//! Kraken uses two incompatible framing shapes:
//!
//! - Control frames are JSON objects with an `event` discriminator
//!   (`heartbeat`, `systemStatus`, `subscriptionStatus`).
//! - Ticker data frames are JSON arrays mixing the payload object, the
//!   channel name, and the pair string as separate elements whose
//!   positions are not fixed. Detection scans for an object carrying the
//!   `"c"` close-price field, the literal `"ticker"` channel token, and a
//!   string containing the pair delimiter, rather than assuming indices.
//!
//! Decoding is total: malformed or ambiguous frames become
//! [`KrakenMessage::Unrecognized`] with a diagnostic code, never an error.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// Channel name for ticker subscriptions.
pub const TICKER_CHANNEL: &str = "ticker";

// =============================================================================
// Error Type
// =============================================================================

/// Encoding errors. Decoding never errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON serialization failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// A subscribe/unsubscribe request needs at least one pair.
    #[error("empty pair batch")]
    EmptyBatch,
}

// =============================================================================
// Request Frames
// =============================================================================

/// A batched subscribe or unsubscribe request frame.
///
/// Batching avoids one-message-per-symbol chatter on the wire.
#[derive(Debug, Clone, Serialize)]
struct SubscriptionRequest<'a> {
    event: &'static str,
    subscription: SubscriptionDetail,
    pair: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
struct SubscriptionDetail {
    name: &'static str,
}

// =============================================================================
// Decoded Messages
// =============================================================================

/// Why a frame could not be decoded into a typed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeDiagnostic {
    /// The frame was not valid JSON.
    InvalidJson,
    /// Object frame with a missing or unknown `event` discriminator.
    UnknownEvent,
    /// Array frame without an object element carrying a `"c"` field.
    NoTickerPayload,
    /// Ticker payload present but `c[0]` missing or unparseable.
    MissingClosePrice,
    /// Array frame without the literal channel-name token.
    MissingChannelToken,
    /// Array frame without a pair token containing the delimiter.
    MissingPairToken,
    /// Valid JSON of a shape this protocol never produces.
    UnexpectedShape,
}

impl DecodeDiagnostic {
    /// Stable short code for logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::UnknownEvent => "unknown_event",
            Self::NoTickerPayload => "no_ticker_payload",
            Self::MissingClosePrice => "missing_close_price",
            Self::MissingChannelToken => "missing_channel_token",
            Self::MissingPairToken => "missing_pair_token",
            Self::UnexpectedShape => "unexpected_shape",
        }
    }
}

/// A decoded ticker payload. `last_price` is mandatory; the rest of the
/// fields are individually optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerMessage {
    /// Pair the update applies to, e.g. `"XBT/USD"`.
    pub pair: String,
    /// Last trade price (`c[0]`).
    pub last_price: Decimal,
    /// Best ask price (`a[0]`), if present.
    pub ask_price: Option<Decimal>,
    /// Best bid price (`b[0]`), if present.
    pub bid_price: Option<Decimal>,
    /// Rolling 24-hour volume (`v[1]`), if present.
    pub volume_24h: Option<Decimal>,
}

/// Tagged variant over everything Kraken sends on the ticker stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KrakenMessage {
    /// Keep-alive frame; no payload.
    Heartbeat,
    /// Connection-level status announcement.
    SystemStatus {
        /// Exchange-reported status, e.g. `"online"`.
        status: String,
        /// Connection identifier, if present.
        connection_id: Option<String>,
    },
    /// Reply to a subscribe/unsubscribe request.
    SubscriptionAck {
        /// `"subscribed"`, `"unsubscribed"`, or `"error"`.
        status: String,
        /// Channel the ack refers to, if present.
        channel: Option<String>,
        /// Pair the ack refers to, if present.
        pair: Option<String>,
    },
    /// A usable ticker update.
    Ticker(TickerMessage),
    /// Anything else, downgraded with a diagnostic code.
    Unrecognized(DecodeDiagnostic),
}

// =============================================================================
// Codec
// =============================================================================

/// Stateless codec for Kraken's ticker stream.
#[derive(Debug, Default, Clone)]
pub struct TickerWireCodec;

impl TickerWireCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode a batched ticker subscribe request.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyBatch`] for an empty pair list.
    pub fn encode_subscribe(&self, pairs: &[String]) -> Result<String, CodecError> {
        Self::encode_request("subscribe", pairs)
    }

    /// Encode a batched ticker unsubscribe request.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyBatch`] for an empty pair list.
    pub fn encode_unsubscribe(&self, pairs: &[String]) -> Result<String, CodecError> {
        Self::encode_request("unsubscribe", pairs)
    }

    fn encode_request(event: &'static str, pairs: &[String]) -> Result<String, CodecError> {
        if pairs.is_empty() {
            return Err(CodecError::EmptyBatch);
        }
        let request = SubscriptionRequest {
            event,
            subscription: SubscriptionDetail {
                name: TICKER_CHANNEL,
            },
            pair: pairs,
        };
        Ok(serde_json::to_string(&request)?)
    }

    /// Decode a frame into a typed message. Total: never panics, never
    /// errors; ambiguity downgrades to [`KrakenMessage::Unrecognized`].
    #[must_use]
    pub fn decode(&self, frame: &str) -> KrakenMessage {
        let Ok(value) = serde_json::from_str::<Value>(frame) else {
            return KrakenMessage::Unrecognized(DecodeDiagnostic::InvalidJson);
        };

        match value {
            Value::Object(ref object) => Self::decode_control(object),
            Value::Array(ref elements) => Self::decode_ticker_array(elements),
            _ => KrakenMessage::Unrecognized(DecodeDiagnostic::UnexpectedShape),
        }
    }

    /// Decode an object-shaped control frame via its `event` field.
    fn decode_control(object: &serde_json::Map<String, Value>) -> KrakenMessage {
        match object.get("event").and_then(Value::as_str) {
            Some("heartbeat") => KrakenMessage::Heartbeat,
            Some("systemStatus") => KrakenMessage::SystemStatus {
                status: field_string(object, "status").unwrap_or_else(|| "unknown".to_string()),
                connection_id: field_string(object, "connectionID"),
            },
            Some("subscriptionStatus") => KrakenMessage::SubscriptionAck {
                status: field_string(object, "status").unwrap_or_else(|| "unknown".to_string()),
                channel: field_string(object, "channelName"),
                pair: field_string(object, "pair"),
            },
            _ => KrakenMessage::Unrecognized(DecodeDiagnostic::UnknownEvent),
        }
    }

    /// Decode an array-shaped data frame by scanning for the payload
    /// object, channel token, and pair token in any order.
    fn decode_ticker_array(elements: &[Value]) -> KrakenMessage {
        let mut payload: Option<&serde_json::Map<String, Value>> = None;
        let mut channel_seen = false;
        let mut pair: Option<&str> = None;

        for element in elements {
            match element {
                Value::Object(object) if object.contains_key("c") => {
                    payload = Some(object);
                }
                Value::String(text) if text == TICKER_CHANNEL => {
                    channel_seen = true;
                }
                Value::String(text) if text.contains('/') => {
                    pair = Some(text);
                }
                _ => {}
            }
        }

        let Some(payload) = payload else {
            return KrakenMessage::Unrecognized(DecodeDiagnostic::NoTickerPayload);
        };
        if !channel_seen {
            return KrakenMessage::Unrecognized(DecodeDiagnostic::MissingChannelToken);
        }
        let Some(pair) = pair else {
            return KrakenMessage::Unrecognized(DecodeDiagnostic::MissingPairToken);
        };

        // A ticker is only usable with a close price; the rest may be
        // absent or null independently.
        let Some(last_price) = array_decimal(payload, "c", 0) else {
            return KrakenMessage::Unrecognized(DecodeDiagnostic::MissingClosePrice);
        };

        KrakenMessage::Ticker(TickerMessage {
            pair: pair.to_string(),
            last_price,
            ask_price: array_decimal(payload, "a", 0),
            bid_price: array_decimal(payload, "b", 0),
            volume_24h: array_decimal(payload, "v", 1),
        })
    }
}

/// String value of an object field, accepting numbers for fields like
/// `connectionID` that Kraken sends as integers.
fn field_string(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Decimal at `object[key][index]`, where the element may be a string or
/// a bare number. Returns `None` on absence or parse failure.
fn array_decimal(object: &serde_json::Map<String, Value>, key: &str, index: usize) -> Option<Decimal> {
    let element = object.get(key)?.as_array()?.get(index)?;
    match element {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
