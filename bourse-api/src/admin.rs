use std::collections::BTreeSet;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use bourse_shared::{ActiveHours, PricingRule, RuleConditions, RuleStatus};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::{decode_body, AppError};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Editable rule fields, used for both create and full update
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleRequest {
    pub name: String,
    pub conditions: RuleConditions,
    #[serde(default)]
    pub actions: Option<Value>,
    pub asset_types: BTreeSet<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    pub base_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub adjustment_factor: Option<f64>,
    pub active_hours: Option<ActiveHours>,
    #[serde(default)]
    pub priority: i32,
    pub status: Option<RuleStatus>,
}

impl RuleRequest {
    fn apply_to(self, rule: &mut PricingRule) {
        rule.name = self.name;
        rule.conditions = self.conditions;
        if let Some(actions) = self.actions {
            rule.actions = actions;
        }
        rule.asset_types = self.asset_types;
        rule.categories = self.categories;
        rule.base_price = self.base_price;
        rule.min_price = self.min_price;
        rule.max_price = self.max_price;
        if let Some(factor) = self.adjustment_factor {
            rule.adjustment_factor = factor;
        }
        rule.active_hours = self.active_hours;
        rule.priority = self.priority;
        if let Some(status) = self.status {
            rule.status = status;
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusRequest {
    pub status: RuleStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListRulesQuery {
    pub asset_type: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/pricing/rules", get(list_rules).post(create_rule))
        .route("/v1/pricing/rules/{id}", get(get_rule).put(update_rule))
        .route("/v1/pricing/rules/{id}/status", patch(set_rule_status))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/pricing/rules
async fn list_rules(
    State(state): State<AppState>,
    Query(query): Query<ListRulesQuery>,
) -> Result<Json<Vec<PricingRule>>, AppError> {
    let rules = state.rules.list_rules(query.asset_type.as_deref()).await?;
    Ok(Json(rules))
}

/// POST /v1/pricing/rules
async fn create_rule(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<PricingRule>), AppError> {
    let req: RuleRequest = decode_body(payload)?;

    let mut rule = PricingRule::new(req.name.clone(), req.conditions.clone(), req.asset_types.clone());
    req.apply_to(&mut rule);
    rule.validate()?;

    let id = state.rules.create_rule(&rule).await?;
    info!("Pricing rule created: {} ({}, {})", rule.name, id, rule.rule_type());

    Ok((StatusCode::CREATED, Json(rule)))
}

/// GET /v1/pricing/rules/{id}
async fn get_rule(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<PricingRule>, AppError> {
    let rule = state
        .rules
        .get_rule(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pricing rule {} not found", id)))?;
    Ok(Json(rule))
}

/// PUT /v1/pricing/rules/{id}
async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PricingRule>, AppError> {
    let req: RuleRequest = decode_body(payload)?;

    let mut rule = state
        .rules
        .get_rule(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pricing rule {} not found", id)))?;

    req.apply_to(&mut rule);
    rule.updated_at = Utc::now();
    rule.validate()?;

    if !state.rules.update_rule(&rule).await? {
        return Err(AppError::NotFound(format!("Pricing rule {} not found", id)));
    }
    info!("Pricing rule updated: {} ({})", rule.name, id);

    Ok(Json(rule))
}

/// PATCH /v1/pricing/rules/{id}/status
async fn set_rule_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PricingRule>, AppError> {
    let req: StatusRequest = decode_body(payload)?;

    if !state.rules.set_rule_status(id, req.status).await? {
        return Err(AppError::NotFound(format!("Pricing rule {} not found", id)));
    }
    info!("Pricing rule {} set to {}", id, req.status);

    let rule = state
        .rules
        .get_rule(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pricing rule {} not found", id)))?;
    Ok(Json(rule))
}
