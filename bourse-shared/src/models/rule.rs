use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of market signal a rule reacts to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    DemandBased,
    InventoryBased,
    CompetitorBased,
    TimeBased,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::DemandBased => "demand_based",
            RuleType::InventoryBased => "inventory_based",
            RuleType::CompetitorBased => "competitor_based",
            RuleType::TimeBased => "time_based",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Active,
    Inactive,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Active => "active",
            RuleStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleStatus {
    type Err = RuleValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RuleStatus::Active),
            "inactive" => Ok(RuleStatus::Inactive),
            other => Err(RuleValidationError::UnknownStatus(other.to_string())),
        }
    }
}

fn default_demand_threshold() -> f64 { 0.7 }
fn default_demand_multiplier() -> f64 { 0.1 }
fn default_inventory_threshold() -> i64 { 10 }
fn default_scarcity_multiplier() -> f64 { 0.15 }
fn default_competitiveness_threshold() -> f64 { 0.05 }
fn default_time_multiplier() -> f64 { 0.05 }
fn default_adjustment_factor() -> f64 { 1.0 }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DemandConditions {
    #[serde(default = "default_demand_threshold")]
    pub demand_threshold: f64,
    #[serde(default = "default_demand_multiplier")]
    pub demand_multiplier: f64,
}

impl Default for DemandConditions {
    fn default() -> Self {
        Self {
            demand_threshold: default_demand_threshold(),
            demand_multiplier: default_demand_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InventoryConditions {
    #[serde(default = "default_inventory_threshold")]
    pub inventory_threshold: i64,
    #[serde(default = "default_scarcity_multiplier")]
    pub scarcity_multiplier: f64,
}

impl Default for InventoryConditions {
    fn default() -> Self {
        Self {
            inventory_threshold: default_inventory_threshold(),
            scarcity_multiplier: default_scarcity_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CompetitorConditions {
    #[serde(default = "default_competitiveness_threshold")]
    pub competitiveness_threshold: f64,
}

impl Default for CompetitorConditions {
    fn default() -> Self {
        Self {
            competitiveness_threshold: default_competitiveness_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimeConditions {
    #[serde(default = "default_time_multiplier")]
    pub time_multiplier: f64,
}

impl Default for TimeConditions {
    fn default() -> Self {
        Self {
            time_multiplier: default_time_multiplier(),
        }
    }
}

/// Rule conditions, one variant per rule type.
///
/// Serialized with the rule type as tag, e.g.
/// `{"rule_type": "demand_based", "demand_threshold": 0.8}`. Missing fields
/// take their defaults, unknown fields are rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleConditions {
    DemandBased(DemandConditions),
    InventoryBased(InventoryConditions),
    CompetitorBased(CompetitorConditions),
    TimeBased(TimeConditions),
}

impl RuleConditions {
    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleConditions::DemandBased(_) => RuleType::DemandBased,
            RuleConditions::InventoryBased(_) => RuleType::InventoryBased,
            RuleConditions::CompetitorBased(_) => RuleType::CompetitorBased,
            RuleConditions::TimeBased(_) => RuleType::TimeBased,
        }
    }
}

/// Hour-of-day window (UTC, inclusive on both ends). `start > end` wraps midnight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveHours {
    pub start: u32,
    pub end: u32,
}

impl ActiveHours {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            hour >= self.start && hour <= self.end
        } else {
            hour >= self.start || hour <= self.end
        }
    }
}

/// Administrator-defined pricing rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: Uuid,
    pub name: String,
    pub conditions: RuleConditions,
    /// Free-form administrator notes on follow-up actions
    #[serde(default)]
    pub actions: serde_json::Value,
    pub asset_types: BTreeSet<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    pub base_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    #[serde(default = "default_adjustment_factor")]
    pub adjustment_factor: f64,
    pub active_hours: Option<ActiveHours>,
    pub priority: i32,
    pub status: RuleStatus,
    pub usage_count: i64,
    pub last_triggered: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PricingRule {
    /// Create an active rule with priority 0 and no bounds
    pub fn new<I, S>(name: impl Into<String>, conditions: RuleConditions, asset_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            conditions,
            actions: serde_json::json!({}),
            asset_types: asset_types.into_iter().map(Into::into).collect(),
            categories: BTreeSet::new(),
            base_price: None,
            min_price: None,
            max_price: None,
            adjustment_factor: default_adjustment_factor(),
            active_hours: None,
            priority: 0,
            status: RuleStatus::Active,
            usage_count: 0,
            last_triggered: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_bounds(mut self, min_price: Option<f64>, max_price: Option<f64>) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }

    pub fn with_active_hours(mut self, start: u32, end: u32) -> Self {
        self.active_hours = Some(ActiveHours::new(start, end));
        self
    }

    pub fn with_status(mut self, status: RuleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn rule_type(&self) -> RuleType {
        self.conditions.rule_type()
    }

    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }

    pub fn applies_to(&self, asset_type: &str) -> bool {
        self.asset_types.contains(asset_type)
    }

    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.name.trim().is_empty() {
            return Err(RuleValidationError::MissingField("name"));
        }
        if self.asset_types.is_empty() {
            return Err(RuleValidationError::MissingField("asset_types"));
        }

        for (field, value) in [
            ("base_price", self.base_price),
            ("min_price", self.min_price),
            ("max_price", self.max_price),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(RuleValidationError::InvalidValue {
                        field,
                        reason: format!("must be a non-negative number, got {}", v),
                    });
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(RuleValidationError::InvertedBounds { min, max });
            }
        }

        if let Some(hours) = self.active_hours {
            if hours.start > 23 || hours.end > 23 {
                return Err(RuleValidationError::InvalidValue {
                    field: "active_hours",
                    reason: format!("hours must be within 0-23, got {}-{}", hours.start, hours.end),
                });
            }
        }

        match &self.conditions {
            RuleConditions::DemandBased(c) => {
                check_unit("demand_threshold", c.demand_threshold)?;
                check_finite("demand_multiplier", c.demand_multiplier)?;
            }
            RuleConditions::InventoryBased(c) => {
                if c.inventory_threshold < 0 {
                    return Err(RuleValidationError::InvalidValue {
                        field: "inventory_threshold",
                        reason: "must not be negative".to_string(),
                    });
                }
                check_finite("scarcity_multiplier", c.scarcity_multiplier)?;
            }
            RuleConditions::CompetitorBased(c) => {
                check_finite("competitiveness_threshold", c.competitiveness_threshold)?;
                if c.competitiveness_threshold < 0.0 {
                    return Err(RuleValidationError::InvalidValue {
                        field: "competitiveness_threshold",
                        reason: "must not be negative".to_string(),
                    });
                }
            }
            RuleConditions::TimeBased(c) => {
                check_finite("time_multiplier", c.time_multiplier)?;
            }
        }

        Ok(())
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), RuleValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RuleValidationError::InvalidValue {
            field,
            reason: "must be a finite number".to_string(),
        })
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), RuleValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RuleValidationError::InvalidValue {
            field,
            reason: format!("must be within [0, 1], got {}", value),
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RuleValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    #[error("min_price {min} exceeds max_price {max}")]
    InvertedBounds {
        min: f64,
        max: f64,
    },

    #[error("Unknown rule status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditions_fill_defaults() {
        let conditions: RuleConditions =
            serde_json::from_value(serde_json::json!({"rule_type": "demand_based"})).unwrap();

        assert_eq!(conditions, RuleConditions::DemandBased(DemandConditions::default()));
        assert_eq!(conditions.rule_type(), RuleType::DemandBased);
    }

    #[test]
    fn test_conditions_reject_unknown_keys() {
        let result: Result<RuleConditions, _> = serde_json::from_value(serde_json::json!({
            "rule_type": "inventory_based",
            "inventory_treshold": 5
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_active_hours_window() {
        let day = ActiveHours::new(9, 17);
        assert!(day.contains(9));
        assert!(day.contains(17));
        assert!(!day.contains(8));
        assert!(!day.contains(18));

        // Overnight
        let night = ActiveHours::new(22, 4);
        assert!(night.contains(23));
        assert!(night.contains(0));
        assert!(night.contains(4));
        assert!(!night.contains(12));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let rule = PricingRule::new(
            "Bad bounds",
            RuleConditions::DemandBased(DemandConditions::default()),
            ["ticket"],
        )
        .with_bounds(Some(200.0), Some(100.0));

        assert_eq!(
            rule.validate(),
            Err(RuleValidationError::InvertedBounds { min: 200.0, max: 100.0 })
        );
    }

    #[test]
    fn test_validate_requires_asset_types() {
        let rule = PricingRule::new(
            "No assets",
            RuleConditions::TimeBased(TimeConditions::default()),
            Vec::<String>::new(),
        );

        assert_eq!(rule.validate(), Err(RuleValidationError::MissingField("asset_types")));
    }
}
