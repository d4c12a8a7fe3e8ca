use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side of an executed leg.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum FillSide {
    Buy,
    Sell,
}

/// Hedge-mode position bucket. `Both` is what one-way accounts report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
    Both,
}

/// A single executed trade leg as returned by the exchange. Immutable once retrieved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fill {
    pub symbol: String,
    pub side: FillSide,
    pub position_side: PositionSide,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    /// Realized PnL contributed by this leg, before commission.
    pub realized_pnl: f64,
    /// Exchange timestamp in milliseconds.
    pub time_ms: i64,
}

impl Fill {
    /// True when this leg grows its position bucket (BUY into LONG, SELL into SHORT).
    #[must_use]
    pub fn is_opening(&self) -> bool {
        matches!(
            (self.side, self.position_side),
            (FillSide::Buy, PositionSide::Long) | (FillSide::Sell, PositionSide::Short)
        )
    }
}

impl PositionSide {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(anyhow::anyhow!("invalid fill side: '{other}'")),
        }
    }
}

impl FromStr for PositionSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LONG" => Ok(Self::Long),
            "SHORT" => Ok(Self::Short),
            "BOTH" => Ok(Self::Both),
            other => Err(anyhow::anyhow!("invalid position side: '{other}'")),
        }
    }
}
