use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bourse_pricing::BatchPricingReport;
use bourse_shared::ListingRepricedEvent;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::{decode_body, AppError};
use crate::state::AppState;

/// Largest batch accepted by `apply_pricing`
const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PricingAction {
    CalculatePrice {
        asset_type: String,
        asset_id: Uuid,
        base_price: f64,
    },
    ApplyPricing {
        listing_ids: Vec<Uuid>,
    },
    OptimizePricing {
        asset_type: String,
        asset_id: Uuid,
        current_price: f64,
    },
    MarketAnalysis {
        asset_id: Uuid,
    },
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/pricing", post(handle_pricing))
}

/// POST /v1/pricing
async fn handle_pricing(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let action: PricingAction = decode_body(payload)?;

    match action {
        PricingAction::CalculatePrice { asset_type, asset_id, base_price } => {
            let computation = state.engine.compute_price(&asset_type, asset_id, base_price).await?;
            Ok(Json(computation).into_response())
        }
        PricingAction::ApplyPricing { listing_ids } => {
            if listing_ids.len() > MAX_BATCH_SIZE {
                return Err(AppError::Validation(format!(
                    "At most {} listings per batch, got {}",
                    MAX_BATCH_SIZE,
                    listing_ids.len()
                )));
            }

            let report = state.engine.apply_pricing_to_listings(&listing_ids).await;
            publish_repriced(&state, &report);
            Ok(Json(report).into_response())
        }
        PricingAction::OptimizePricing { asset_type, asset_id, current_price } => {
            let recommendation = state
                .engine
                .optimize_pricing(&asset_type, asset_id, current_price)
                .await?;
            Ok(Json(recommendation).into_response())
        }
        PricingAction::MarketAnalysis { asset_id } => {
            let analysis = state.engine.market_analysis(asset_id).await?;
            Ok(Json(analysis).into_response())
        }
    }
}

/// Fire-and-forget: the response does not wait on the broker
fn publish_repriced(state: &AppState, report: &BatchPricingReport) {
    let Some(events) = state.events.clone() else {
        return;
    };

    let batch: Vec<ListingRepricedEvent> = report
        .updated
        .iter()
        .filter_map(ListingRepricedEvent::from_listing)
        .collect();
    if batch.is_empty() {
        return;
    }

    info!("Publishing {} repriced events to {}", batch.len(), state.repriced_topic);
    let topic = state.repriced_topic.clone();
    tokio::spawn(async move {
        for event in &batch {
            events.publish_repriced(&topic, event).await;
        }
    });
}
