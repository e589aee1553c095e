use bourse_shared::{
    ActiveHours, CompetitorConditions, DemandConditions, InventoryConditions, MarketSnapshot,
    PricingRule, RuleConditions, TimeConditions,
};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::mean;

/// Price change produced by one rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub adjustment: f64,
    pub reason: String,
}

/// Market data a rule set needs, fetched once per computation.
///
/// `None` means the data was not requested or is unavailable; rules that
/// depend on it do not apply.
#[derive(Debug, Clone, Default)]
pub struct MarketSignals {
    pub snapshot: Option<MarketSnapshot>,
    pub active_listings: Option<i64>,
    pub competitor_prices: Option<Vec<f64>>,
}

/// Whether the rule's active-hours window (if any) admits `now`
pub fn within_active_hours(rule: &PricingRule, now: DateTime<Utc>) -> bool {
    rule.active_hours.map_or(true, |hours| hours.contains(now.hour()))
}

/// Evaluate a single rule against the running price
pub fn evaluate(rule: &PricingRule, current_price: f64, signals: &MarketSignals) -> Option<RuleOutcome> {
    match &rule.conditions {
        RuleConditions::DemandBased(c) => evaluate_demand(c, current_price, signals.snapshot.as_ref()),
        RuleConditions::InventoryBased(c) => evaluate_inventory(c, current_price, signals.active_listings),
        RuleConditions::CompetitorBased(c) => {
            evaluate_competitor(c, current_price, signals.competitor_prices.as_deref())
        }
        RuleConditions::TimeBased(c) => evaluate_time(c, current_price, rule.active_hours),
    }
}

pub fn evaluate_demand(
    conditions: &DemandConditions,
    current_price: f64,
    snapshot: Option<&MarketSnapshot>,
) -> Option<RuleOutcome> {
    let snapshot = snapshot?;
    if snapshot.demand_score <= conditions.demand_threshold {
        return None;
    }

    Some(RuleOutcome {
        adjustment: current_price * conditions.demand_multiplier,
        reason: format!("High demand ({})", snapshot.demand_score),
    })
}

pub fn evaluate_inventory(
    conditions: &InventoryConditions,
    current_price: f64,
    active_listings: Option<i64>,
) -> Option<RuleOutcome> {
    let count = active_listings?;
    if count >= conditions.inventory_threshold {
        return None;
    }

    Some(RuleOutcome {
        adjustment: current_price * conditions.scarcity_multiplier,
        reason: format!("Low inventory ({} listings)", count),
    })
}

pub fn evaluate_competitor(
    conditions: &CompetitorConditions,
    current_price: f64,
    competitor_prices: Option<&[f64]>,
) -> Option<RuleOutcome> {
    let prices = competitor_prices.filter(|p| !p.is_empty())?;
    let market_avg = mean(prices);

    if current_price <= market_avg * (1.0 + conditions.competitiveness_threshold) {
        return None;
    }

    // Close half the gap to the market average
    Some(RuleOutcome {
        adjustment: -(current_price - market_avg) / 2.0,
        reason: format!("Competitive adjustment (market avg: {:.2})", market_avg),
    })
}

/// Time rules only carry meaning inside a window; the window itself is
/// checked by the time gate before evaluation.
pub fn evaluate_time(
    conditions: &TimeConditions,
    current_price: f64,
    active_hours: Option<ActiveHours>,
) -> Option<RuleOutcome> {
    let hours = active_hours?;
    if conditions.time_multiplier == 0.0 {
        return None;
    }

    Some(RuleOutcome {
        adjustment: current_price * conditions.time_multiplier,
        reason: format!("Time window ({:02}:00-{:02}:00)", hours.start, hours.end),
    })
}

/// Resolved price bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceConstraints {
    pub min_price: f64,
    pub max_price: f64,
}

impl PriceConstraints {
    /// Resolve bounds from the rules in scope.
    ///
    /// Each rule contributes its `min_price` and `max_price`, with an
    /// undeclared side standing in as `current_price`. The floor is the lowest
    /// contribution and the ceiling the highest; no rules pins both to
    /// `current_price`. When rules conflict (floor above ceiling) the ceiling
    /// wins.
    pub fn resolve<'a, I>(rules: I, current_price: f64) -> Self
    where
        I: IntoIterator<Item = &'a PricingRule>,
    {
        let mut floor: Option<f64> = None;
        let mut ceiling: Option<f64> = None;

        for rule in rules {
            let min = rule.min_price.unwrap_or(current_price);
            let max = rule.max_price.unwrap_or(current_price);
            floor = Some(floor.map_or(min, |f| f.min(min)));
            ceiling = Some(ceiling.map_or(max, |c| c.max(max)));
        }

        let mut min_price = floor.unwrap_or(current_price);
        let max_price = ceiling.unwrap_or(current_price);

        if min_price > max_price {
            min_price = max_price;
        }

        Self { min_price, max_price }
    }

    pub fn clamp(&self, price: f64) -> f64 {
        price.max(self.min_price).min(self.max_price)
    }
}
