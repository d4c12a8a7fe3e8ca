//! Live market data over a single combined-stream WebSocket.
//!
//! This crate provides:
//! - A stream registry mapping stream keys to bounded delivery channels
//! - A self-healing combined-stream client with batched subscriptions
//! - Reconnect backoff and HTTP proxy tunnelling
//! - Typed kline payloads
//!
//! # Example
//!
//! ```no_run
//! use perp_trader_market::{CombinedStreamClient, KlineEvent, StreamConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CombinedStreamClient::new(StreamConfig::default());
//!     let mut ticks = client.add_subscriber("btcusdt@kline_1m", 100);
//!
//!     client.connect().await?;
//!     client.batch_subscribe(&["BTCUSDT"], "1m").await?;
//!
//!     if let Some(payload) = ticks.recv().await {
//!         let event = KlineEvent::from_slice(&payload)?;
//!         println!("{} close {}", event.symbol, event.kline.close);
//!     }
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod combined_stream;
pub mod error;
pub mod kline;
pub mod protocol;
pub mod proxy;
pub mod registry;
pub mod retry;

pub use combined_stream::{CombinedStreamClient, ConnectionState, StreamConfig, StreamStats};
pub use error::{FrameError, StreamError};
pub use kline::{Kline, KlineEvent};
pub use protocol::{kline_stream as stream_name, ControlRequest, InboundFrame};
pub use proxy::proxy_from_env;
pub use registry::{DispatchOutcome, Payload, StreamRegistry};
pub use retry::RetryPolicy;
