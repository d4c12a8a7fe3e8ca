//! Wire types for the futures `USER_DATA` endpoints.
//!
//! Binance sends every monetary field as a decimal string; these are parsed
//! with `rust_decimal` and only narrowed to `f64` when building a [`Fill`].

use crate::error::BinanceError;
use perp_trader_core::{Fill, FillSide, PositionSide};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

/// One row of `GET /fapi/v1/userTrades`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTrade {
    pub symbol: String,
    pub id: u64,
    pub order_id: u64,
    pub side: String,
    pub position_side: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub realized_pnl: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub commission: Decimal,
    #[serde(default)]
    pub commission_asset: String,
    pub time: i64,
    #[serde(default)]
    pub maker: bool,
}

/// One row of `GET /fapi/v1/income`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRecord {
    #[serde(default)]
    pub symbol: String,
    pub income_type: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub income: Decimal,
    #[serde(default)]
    pub asset: String,
    pub time: i64,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

impl TryFrom<UserTrade> for Fill {
    type Error = BinanceError;

    fn try_from(trade: UserTrade) -> Result<Self, Self::Error> {
        let side: FillSide = trade
            .side
            .parse()
            .map_err(|e| BinanceError::Decode(format!("trade {}: {e}", trade.id)))?;
        let position_side: PositionSide = trade
            .position_side
            .parse()
            .map_err(|e| BinanceError::Decode(format!("trade {}: {e}", trade.id)))?;

        Ok(Fill {
            side,
            position_side,
            quantity: to_f64(trade.qty, "qty", trade.id)?,
            price: to_f64(trade.price, "price", trade.id)?,
            // Negative for maker rebates; subtracting it raises net PnL.
            commission: to_f64(trade.commission, "commission", trade.id)?,
            realized_pnl: to_f64(trade.realized_pnl, "realizedPnl", trade.id)?,
            time_ms: trade.time,
            symbol: trade.symbol,
        })
    }
}

fn to_f64(value: Decimal, field: &str, id: u64) -> Result<f64, BinanceError> {
    value
        .to_f64()
        .ok_or_else(|| BinanceError::Decode(format!("trade {id}: {field} out of range")))
}
