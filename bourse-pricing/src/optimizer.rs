use bourse_shared::TrendDirection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::analysis::{self, percent_change, round2};
use crate::engine::{PricingEngine, PricingError};
use crate::rules::{self, PriceConstraints};

/// Suggested asking price for an asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRecommendation {
    pub asset_id: Uuid,
    pub current_price: f64,
    pub suggested_price: f64,
    pub expected_change_percent: f64,
    pub confidence: f64,
    pub trend: TrendDirection,
    pub reasoning: Vec<String>,
}

impl PricingEngine {
    /// Recommend a price from competitor listings, market snapshots and the
    /// rule bounds for the asset type. Missing market data lowers confidence
    /// rather than failing.
    pub async fn optimize_pricing(
        &self,
        asset_type: &str,
        asset_id: Uuid,
        current_price: f64,
    ) -> Result<PriceRecommendation, PricingError> {
        self.optimize_pricing_at(asset_type, asset_id, current_price, Utc::now()).await
    }

    /// Recommend a price at a given instant; bounds come from the rules
    /// whose active hours admit `now`, as in `compute_price_at`.
    pub async fn optimize_pricing_at(
        &self,
        asset_type: &str,
        asset_id: Uuid,
        current_price: f64,
        now: DateTime<Utc>,
    ) -> Result<PriceRecommendation, PricingError> {
        if asset_type.trim().is_empty() {
            return Err(PricingError::InvalidInput("asset_type is required".to_string()));
        }
        if !current_price.is_finite() || current_price < 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "current_price must be a non-negative number, got {}",
                current_price
            )));
        }

        let config = self.config();

        let snapshots = self
            .market_repository()
            .snapshot_history(asset_id, config.analysis_window_days)
            .await
            .unwrap_or_else(|e| {
                warn!("Snapshot history unavailable for asset {}: {}", asset_id, e);
                Vec::new()
            });

        let competitor_prices = self
            .listing_repository()
            .competitor_prices(asset_id, None)
            .await
            .unwrap_or_else(|e| {
                warn!("Competitor prices unavailable for asset {}: {}", asset_id, e);
                Vec::new()
            });

        let market = analysis::analyze(asset_id, &snapshots, &competitor_prices);
        let mut reasoning = Vec::new();

        let anchor = if let Some(stats) = &market.competitor_stats {
            reasoning.push(format!(
                "Anchored on competitor median {:.2} across {} listings",
                stats.median, stats.count
            ));
            stats.median
        } else if let Some(target) = market.latest_snapshot.as_ref().and_then(|s| s.price_target) {
            reasoning.push(format!("Anchored on market price target {:.2}", target));
            target
        } else if let Some(snapshot) = &market.latest_snapshot {
            reasoning.push(format!("Anchored on market average {:.2}", snapshot.average_price));
            snapshot.average_price
        } else {
            reasoning.push("No market data, keeping current price as anchor".to_string());
            current_price
        };

        let mut suggested = anchor;

        if let Some(snapshot) = &market.latest_snapshot {
            let tilt = (snapshot.demand_score - 0.5) * config.demand_weight;
            suggested *= 1.0 + tilt;
            reasoning.push(format!(
                "Demand score {:.2} shifts price by {:+.1}%",
                snapshot.demand_score,
                tilt * 100.0
            ));
        }

        let trend_factor = match market.price_trend {
            TrendDirection::Rising => 1.0 + config.trend_tilt,
            TrendDirection::Falling => 1.0 - config.trend_tilt,
            TrendDirection::Volatile | TrendDirection::Stable => 1.0,
        };
        if trend_factor != 1.0 {
            suggested *= trend_factor;
            reasoning.push(format!(
                "Market {} ({:+.2}% over window)",
                market.price_trend, market.trend_change_percent
            ));
        }

        let active_rules = self
            .rule_repository()
            .list_active_rules(asset_type)
            .await
            .map_err(|e| PricingError::Repository(e.to_string()))?;
        let in_window = active_rules
            .iter()
            .filter(|r| r.is_active() && r.applies_to(asset_type) && rules::within_active_hours(r, now));

        let suggested = round2(suggested);
        let constraints = PriceConstraints::resolve(in_window, suggested);
        let bounded = constraints.clamp(suggested);
        if bounded != suggested {
            reasoning.push(format!(
                "Clamped to rule bounds [{:.2}, {:.2}]",
                constraints.min_price, constraints.max_price
            ));
        }

        Ok(PriceRecommendation {
            asset_id,
            current_price,
            suggested_price: bounded,
            expected_change_percent: round2(percent_change(current_price, bounded)),
            confidence: market.confidence,
            trend: market.price_trend,
            reasoning,
        })
    }
}
