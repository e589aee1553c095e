use std::collections::HashSet;
use std::sync::Arc;

use bourse_core::{ListingRepository, MarketDataRepository, PricingRuleRepository};
use bourse_shared::{Listing, PriceHistoryEntry, PricingRule, RuleType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analysis::{self, percent_change, round2, MarketAnalysis};
use crate::rules::{self, MarketSignals, PriceConstraints};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Days of market snapshots considered for trends and optimization
    pub analysis_window_days: u32,

    /// How strongly demand moves an optimized price around its anchor
    pub demand_weight: f64,

    /// Price tilt applied for a rising or falling market
    pub trend_tilt: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            analysis_window_days: 30,
            demand_weight: 0.2,
            trend_tilt: 0.02,
        }
    }
}

/// A rule that changed the price, in evaluation order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedRule {
    pub rule_id: Uuid,
    pub name: String,
    pub rule_type: RuleType,
    pub adjustment: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceComputation {
    pub asset_type: String,
    pub asset_id: Uuid,
    pub base_price: f64,
    pub adjusted_price: f64,
    pub adjustment: f64,
    pub adjustment_percent: f64,
    pub applied_rules: Vec<AppliedRule>,
    pub price_constraints: PriceConstraints,
    pub evaluated_at: DateTime<Utc>,
}

impl PriceComputation {
    /// The rule whose adjustment came last
    pub fn triggering_rule(&self) -> Option<&AppliedRule> {
        self.applied_rules.last()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedListing {
    pub listing_id: Uuid,
    pub error: String,
}

/// Outcome of a batch repricing run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPricingReport {
    pub updated: Vec<Listing>,
    /// Listings where no rule applied; left untouched
    pub skipped: Vec<Uuid>,
    pub failed: Vec<FailedListing>,
}

/// Priority-ordered pricing rule engine.
///
/// Rules run one after another, each seeing the price as left by the rules
/// before it, and the result is clamped to the bounds the rules declare.
pub struct PricingEngine {
    rules: Arc<dyn PricingRuleRepository>,
    market: Arc<dyn MarketDataRepository>,
    listings: Arc<dyn ListingRepository>,
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(
        rules: Arc<dyn PricingRuleRepository>,
        market: Arc<dyn MarketDataRepository>,
        listings: Arc<dyn ListingRepository>,
        config: PricingConfig,
    ) -> Self {
        Self { rules, market, listings, config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub(crate) fn rule_repository(&self) -> &dyn PricingRuleRepository {
        self.rules.as_ref()
    }

    pub(crate) fn market_repository(&self) -> &dyn MarketDataRepository {
        self.market.as_ref()
    }

    pub(crate) fn listing_repository(&self) -> &dyn ListingRepository {
        self.listings.as_ref()
    }

    pub async fn compute_price(
        &self,
        asset_type: &str,
        asset_id: Uuid,
        base_price: f64,
    ) -> Result<PriceComputation, PricingError> {
        self.compute_price_at(asset_type, asset_id, base_price, None, Utc::now()).await
    }

    /// Compute a price at a given instant.
    ///
    /// `exclude_listing` keeps a listing out of its own competitor set.
    pub async fn compute_price_at(
        &self,
        asset_type: &str,
        asset_id: Uuid,
        base_price: f64,
        exclude_listing: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<PriceComputation, PricingError> {
        if asset_type.trim().is_empty() {
            return Err(PricingError::InvalidInput("asset_type is required".to_string()));
        }
        if !base_price.is_finite() || base_price < 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "base_price must be a non-negative number, got {}",
                base_price
            )));
        }

        let mut active_rules = self
            .rules
            .list_active_rules(asset_type)
            .await
            .map_err(|e| PricingError::Repository(e.to_string()))?;

        // Repositories already order; a stable re-sort guards the contract
        active_rules.retain(|r| r.is_active() && r.applies_to(asset_type));
        active_rules.sort_by_key(|r| std::cmp::Reverse(r.priority));

        let in_window: Vec<&PricingRule> = active_rules
            .iter()
            .filter(|r| {
                let open = rules::within_active_hours(r, now);
                if !open {
                    debug!("Rule {} ({}) outside active hours, skipped", r.name, r.id);
                }
                open
            })
            .collect();

        let signals = self.load_signals(&in_window, asset_type, asset_id, exclude_listing).await;

        let mut current_price = base_price;
        let mut applied_rules = Vec::new();

        for rule in &in_window {
            let Some(outcome) = rules::evaluate(rule, current_price, &signals) else {
                continue;
            };

            // Carried unrounded; only the reported figures are in cents
            current_price += outcome.adjustment;
            let adjustment = round2(outcome.adjustment);
            debug!(
                "Rule {} applied to asset {}: {:+} ({})",
                rule.name, asset_id, adjustment, outcome.reason
            );

            applied_rules.push(AppliedRule {
                rule_id: rule.id,
                name: rule.name.clone(),
                rule_type: rule.rule_type(),
                adjustment,
                reason: outcome.reason,
            });
        }

        let current_price = round2(current_price);
        let price_constraints = PriceConstraints::resolve(in_window.iter().copied(), current_price);
        let adjusted_price = price_constraints.clamp(current_price);
        let adjustment = round2(adjusted_price - base_price);

        Ok(PriceComputation {
            asset_type: asset_type.to_string(),
            asset_id,
            base_price,
            adjusted_price,
            adjustment,
            adjustment_percent: round2(percent_change(base_price, adjusted_price)),
            applied_rules,
            price_constraints,
            evaluated_at: now,
        })
    }

    /// Fetch only the data the rule set needs. Failures leave the signal
    /// empty so the dependent rules do not apply.
    async fn load_signals(
        &self,
        rules: &[&PricingRule],
        asset_type: &str,
        asset_id: Uuid,
        exclude_listing: Option<Uuid>,
    ) -> MarketSignals {
        let needed: HashSet<RuleType> = rules.iter().map(|r| r.rule_type()).collect();
        let mut signals = MarketSignals::default();

        if needed.contains(&RuleType::DemandBased) {
            signals.snapshot = match self.market.latest_snapshot(asset_id).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Market snapshot unavailable for asset {}: {}", asset_id, e);
                    None
                }
            };
        }

        if needed.contains(&RuleType::InventoryBased) {
            signals.active_listings = match self.listings.count_active_listings(asset_type).await {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!("Inventory count unavailable for {}: {}", asset_type, e);
                    None
                }
            };
        }

        if needed.contains(&RuleType::CompetitorBased) {
            signals.competitor_prices = match self.listings.competitor_prices(asset_id, exclude_listing).await {
                Ok(prices) => Some(prices),
                Err(e) => {
                    warn!("Competitor prices unavailable for asset {}: {}", asset_id, e);
                    None
                }
            };
        }

        signals
    }

    pub async fn apply_pricing_to_listings(&self, listing_ids: &[Uuid]) -> BatchPricingReport {
        self.apply_pricing_at(listing_ids, Utc::now()).await
    }

    /// Reprice each listing independently; one failure never stops the batch.
    pub async fn apply_pricing_at(&self, listing_ids: &[Uuid], now: DateTime<Utc>) -> BatchPricingReport {
        let mut report = BatchPricingReport::default();

        for &listing_id in listing_ids {
            match self.reprice_listing(listing_id, now).await {
                Ok(Some(listing)) => report.updated.push(listing),
                Ok(None) => report.skipped.push(listing_id),
                Err(e) => {
                    error!("Failed to reprice listing {}: {}", listing_id, e);
                    report.failed.push(FailedListing {
                        listing_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Repricing batch finished: {} updated, {} skipped, {} failed",
            report.updated.len(),
            report.skipped.len(),
            report.failed.len()
        );

        report
    }

    /// Reprice one listing. `Ok(None)` when no rule applied.
    pub async fn reprice_listing(
        &self,
        listing_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Listing>, PricingError> {
        let listing = self
            .listings
            .get_listing(listing_id)
            .await
            .map_err(|e| PricingError::Repository(e.to_string()))?
            .ok_or_else(|| PricingError::NotFound(format!("listing {}", listing_id)))?;

        let base_price = match self.market.get_ownership(listing.asset_id).await {
            Ok(Some(record)) => record.base_price(),
            Ok(None) => listing.asking_price,
            Err(e) => {
                warn!("Ownership record unavailable for asset {}: {}", listing.asset_id, e);
                listing.asking_price
            }
        };

        let computation = self
            .compute_price_at(&listing.asset_type, listing.asset_id, base_price, Some(listing.id), now)
            .await?;

        let Some(trigger) = computation.triggering_rule() else {
            debug!("No pricing rule applied to listing {}", listing_id);
            return Ok(None);
        };

        let entry = PriceHistoryEntry {
            price: computation.adjusted_price,
            previous_price: listing.asking_price,
            timestamp: now,
            reason: trigger.reason.clone(),
            rule_id: trigger.rule_id,
        };

        let updated = self
            .listings
            .apply_price_change(listing_id, &entry)
            .await
            .map_err(|e| PricingError::Repository(e.to_string()))?;

        if let Err(e) = self.rules.record_rule_trigger(trigger.rule_id, now).await {
            warn!("Failed to record trigger for rule {}: {}", trigger.rule_id, e);
        }

        info!(
            "Listing {} repriced {:.2} -> {:.2} by rule {}",
            listing_id, entry.previous_price, entry.price, trigger.name
        );

        Ok(Some(updated))
    }

    /// Market picture for one asset over the configured window
    pub async fn market_analysis(&self, asset_id: Uuid) -> Result<MarketAnalysis, PricingError> {
        let snapshots = self
            .market
            .snapshot_history(asset_id, self.config.analysis_window_days)
            .await
            .map_err(|e| PricingError::Repository(e.to_string()))?;

        let competitor_prices = self
            .listings
            .competitor_prices(asset_id, None)
            .await
            .map_err(|e| PricingError::Repository(e.to_string()))?;

        Ok(analysis::analyze(asset_id, &snapshots, &competitor_prices))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Invalid pricing input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository error: {0}")]
    Repository(String),
}
