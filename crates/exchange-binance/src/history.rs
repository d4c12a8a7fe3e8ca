//! Paged trade-history retrieval and the [`ExchangeHistory`] implementation.
//!
//! `userTrades` only accepts ranges of up to seven days, so longer lookbacks
//! are split into consecutive windows. A full page is followed up with
//! `fromId` paging (which Binance does not allow together with a time range)
//! until the page comes back short or runs past the window end.

use crate::client::BinanceFuturesClient;
use crate::error::Result;
use crate::models::{IncomeRecord, UserTrade};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use perp_trader_core::{ExchangeHistory, Fill};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Longest range a single `userTrades` request may span.
pub const MAX_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;

const USER_TRADES_PATH: &str = "/fapi/v1/userTrades";
const INCOME_PATH: &str = "/fapi/v1/income";

/// Splits the inclusive range `[start_ms, end_ms]` into windows no longer than
/// [`MAX_WINDOW_MS`].
pub(crate) fn windows(start_ms: i64, end_ms: i64) -> Vec<(i64, i64)> {
    let mut out = Vec::new();
    let mut window_start = start_ms;
    while window_start <= end_ms {
        let window_end = (window_start + MAX_WINDOW_MS - 1).min(end_ms);
        out.push((window_start, window_end));
        window_start = window_end + 1;
    }
    out
}

impl BinanceFuturesClient {
    /// All fills for `symbol` between `start` and `end`, oldest first.
    ///
    /// # Errors
    /// Returns error if any page request fails or a row cannot be converted.
    pub async fn user_trades(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Fill>> {
        let limit = self.config.page_limit;
        let mut fills = Vec::new();
        let mut seen = HashSet::new();

        for (window_start, window_end) in windows(start.timestamp_millis(), end.timestamp_millis()) {
            let mut page: Vec<UserTrade> = self
                .signed_get(
                    USER_TRADES_PATH,
                    &[
                        ("symbol", symbol.to_string()),
                        ("startTime", window_start.to_string()),
                        ("endTime", window_end.to_string()),
                        ("limit", limit.to_string()),
                    ],
                )
                .await?;
            let mut pages = 1;

            loop {
                let full = page.len() >= limit as usize;
                let last_id = page.last().map(|trade| trade.id);
                let mut past_window = false;

                for trade in page {
                    if trade.time > window_end {
                        past_window = true;
                        continue;
                    }
                    if seen.insert(trade.id) {
                        fills.push(Fill::try_from(trade)?);
                    }
                }

                match last_id {
                    Some(id) if full && !past_window => {
                        page = self
                            .signed_get(
                                USER_TRADES_PATH,
                                &[
                                    ("symbol", symbol.to_string()),
                                    ("fromId", (id + 1).to_string()),
                                    ("limit", limit.to_string()),
                                ],
                            )
                            .await?;
                        pages += 1;
                    }
                    _ => break,
                }
            }

            tracing::debug!(symbol, window_start, window_end, pages, "Fetched trade window");
        }

        fills.sort_by_key(|fill| fill.time_ms);
        Ok(fills)
    }

    /// Symbols with realized PnL between `start` and `end`, discovered from
    /// the income history.
    ///
    /// # Errors
    /// Returns error if any page request fails.
    pub async fn traded_symbols(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BTreeSet<String>> {
        let limit = self.config.page_limit;
        let mut symbols = BTreeSet::new();

        for (window_start, window_end) in windows(start.timestamp_millis(), end.timestamp_millis()) {
            let mut cursor = window_start;
            loop {
                let page: Vec<IncomeRecord> = self
                    .signed_get(
                        INCOME_PATH,
                        &[
                            ("incomeType", "REALIZED_PNL".to_string()),
                            ("startTime", cursor.to_string()),
                            ("endTime", window_end.to_string()),
                            ("limit", limit.to_string()),
                        ],
                    )
                    .await?;

                let full = page.len() >= limit as usize;
                let last_time = page.last().map(|record| record.time);
                symbols.extend(
                    page.into_iter()
                        .filter(|record| !record.symbol.is_empty())
                        .map(|record| record.symbol),
                );

                match last_time {
                    Some(time) if full && time < window_end => cursor = time + 1,
                    _ => break,
                }
            }
        }

        Ok(symbols)
    }
}

fn lookback_range(lookback_days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = Utc::now();
    (end - Duration::days(i64::from(lookback_days)), end)
}

#[async_trait]
impl ExchangeHistory for BinanceFuturesClient {
    async fn fills(&self, symbol: &str, lookback_days: u32) -> anyhow::Result<Vec<Fill>> {
        let (start, end) = lookback_range(lookback_days);
        self.user_trades(symbol, start, end)
            .await
            .with_context(|| format!("Failed to fetch trade history for {symbol}"))
    }

    async fn all_fills(&self, lookback_days: u32) -> anyhow::Result<BTreeMap<String, Vec<Fill>>> {
        let (start, end) = lookback_range(lookback_days);
        let symbols = self
            .traded_symbols(start, end)
            .await
            .context("Failed to discover traded symbols")?;

        tracing::info!(symbols = symbols.len(), lookback_days, "Fetching trade history");

        let mut by_symbol = BTreeMap::new();
        for symbol in symbols {
            let fills = self
                .user_trades(&symbol, start, end)
                .await
                .with_context(|| format!("Failed to fetch trade history for {symbol}"))?;
            if !fills.is_empty() {
                by_symbol.insert(symbol, fills);
            }
        }
        Ok(by_symbol)
    }
}
