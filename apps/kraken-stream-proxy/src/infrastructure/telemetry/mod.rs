//! Tracing Setup
//!
//! Structured logging via `tracing` with an env-filtered fmt subscriber.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter directives (default: this crate at `info`)
//!
//! # Usage
//!
//! ```ignore
//! use kraken_stream_proxy::infrastructure::telemetry;
//!
//! // Initialize once at startup.
//! telemetry::init();
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber.
///
/// Respects `RUST_LOG`; noisy transport internals default to `warn`.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(
            "kraken_stream_proxy=info"
                .parse()
                .expect("static directive 'kraken_stream_proxy=info' is valid"),
        )
        .add_directive(
            "tungstenite=warn"
                .parse()
                .expect("static directive 'tungstenite=warn' is valid"),
        )
        .add_directive(
            "tokio_tungstenite=warn"
                .parse()
                .expect("static directive 'tokio_tungstenite=warn' is valid"),
        );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
