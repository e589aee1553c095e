use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Volatile,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Falling => "falling",
            TrendDirection::Volatile => "volatile",
            TrendDirection::Stable => "stable",
        }
    }

    /// Lenient parse for values coming from the aggregation job
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "rising" => TrendDirection::Rising,
            "falling" => TrendDirection::Falling,
            "volatile" => TrendDirection::Volatile,
            _ => TrendDirection::Stable,
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily market aggregate for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub asset_id: Uuid,
    pub asset_type: String,
    pub snapshot_date: NaiveDate,
    pub average_price: f64,
    pub price_target: Option<f64>,
    /// Normalized buyer interest in [0, 1]
    pub demand_score: f64,
    /// Normalized volatility in [0, 1]
    pub price_volatility: f64,
    pub trend_direction: TrendDirection,
    pub liquidity: f64,
    pub trading_volume: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetOwnershipRecord {
    pub asset_id: Uuid,
    pub asset_type: String,
    pub original_price: f64,
    pub current_valuation: Option<f64>,
}

impl AssetOwnershipRecord {
    /// Price the engine starts from when repricing listings of this asset
    pub fn base_price(&self) -> f64 {
        self.current_valuation.unwrap_or(self.original_price)
    }
}
