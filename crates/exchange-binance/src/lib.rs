//! Binance USD-M futures trade history.
//!
//! [`BinanceFuturesClient`] signs `USER_DATA` requests with HMAC-SHA256,
//! pages through `userTrades` in seven-day windows and implements
//! [`ExchangeHistory`](perp_trader_core::ExchangeHistory) for the analytics
//! service.

pub mod client;
pub mod error;
pub mod history;
pub mod models;
pub mod signing;

pub use client::{BinanceClientConfig, BinanceFuturesClient, BINANCE_FUTURES_URL, MAX_PAGE_LIMIT};
pub use error::{BinanceError, Result};
pub use history::MAX_WINDOW_MS;
pub use models::{IncomeRecord, UserTrade};
pub use signing::{RequestSigner, API_KEY_HEADER};
