use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use bourse_api::{app, AppState};
use bourse_core::{InMemoryStore, PricingRuleRepository};
use bourse_pricing::PricingConfig;
use bourse_shared::{
    AssetOwnershipRecord, DemandConditions, Listing, MarketSnapshot, PricingRule, RuleConditions,
    TrendDirection,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn test_app() -> (Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::in_memory(store.clone(), PricingConfig::default());
    (app(state), store)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

fn snapshot(asset_id: Uuid, demand_score: f64) -> MarketSnapshot {
    MarketSnapshot {
        asset_id,
        asset_type: "ticket".to_string(),
        snapshot_date: Utc::now().date_naive(),
        average_price: 100.0,
        price_target: None,
        demand_score,
        price_volatility: 0.1,
        trend_direction: TrendDirection::Stable,
        liquidity: 0.5,
        trading_volume: 12,
    }
}

fn demand_rule_body() -> Value {
    json!({
        "name": "Demand surge",
        "conditions": { "rule_type": "demand_based", "demand_threshold": 0.7, "demand_multiplier": 0.1 },
        "asset_types": ["ticket"],
        "priority": 5
    })
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_and_list_rules() {
    let (app, _) = test_app();

    let (status, created) = send(&app, Method::POST, "/v1/pricing/rules", Some(demand_rule_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Demand surge");
    assert_eq!(created["status"], "active");
    assert_eq!(created["conditions"]["rule_type"], "demand_based");

    let (status, listed) = send(&app, Method::GET, "/v1/pricing/rules?asset_type=ticket", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (_, other) = send(&app, Method::GET, "/v1/pricing/rules?asset_type=voucher", None).await;
    assert!(other.as_array().unwrap().is_empty());

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&app, Method::GET, &format!("/v1/pricing/rules/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["priority"], 5);
}

#[tokio::test]
async fn test_create_rule_rejects_bad_input() {
    let (app, _) = test_app();

    // Typo in a condition key
    let mut typo = demand_rule_body();
    typo["conditions"] = json!({ "rule_type": "demand_based", "demand_treshold": 0.7 });
    let (status, body) = send(&app, Method::POST, "/v1/pricing/rules", Some(typo)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid request body"));

    let mut inverted = demand_rule_body();
    inverted["min_price"] = json!(200.0);
    inverted["max_price"] = json!(100.0);
    let (status, _) = send(&app, Method::POST, "/v1/pricing/rules", Some(inverted)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut no_types = demand_rule_body();
    no_types["asset_types"] = json!([]);
    let (status, _) = send(&app, Method::POST, "/v1/pricing/rules", Some(no_types)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_type = demand_rule_body();
    bad_type["conditions"] = json!({ "rule_type": "weather_based" });
    let (status, _) = send(&app, Method::POST, "/v1/pricing/rules", Some(bad_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_rule_is_404() {
    let (app, _) = test_app();
    let id = Uuid::new_v4();

    let (status, _) = send(&app, Method::GET, &format!("/v1/pricing/rules/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/v1/pricing/rules/{}/status", id),
        Some(json!({ "status": "inactive" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::PUT, &format!("/v1/pricing/rules/{}", id), Some(demand_rule_body())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calculate_price_action() {
    let (app, store) = test_app();
    let asset_id = Uuid::new_v4();
    store.insert_snapshot(snapshot(asset_id, 0.85)).await;
    send(&app, Method::POST, "/v1/pricing/rules", Some(demand_rule_body())).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/pricing",
        Some(json!({
            "action": "calculate_price",
            "asset_type": "ticket",
            "asset_id": asset_id,
            "base_price": 100.0
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["adjusted_price"], 110.0);
    assert_eq!(body["adjustment"], 10.0);
    assert_eq!(body["applied_rules"][0]["reason"], "High demand (0.85)");
    assert_eq!(body["applied_rules"][0]["rule_type"], "demand_based");
}

#[tokio::test]
async fn test_deactivated_rule_stops_applying() {
    let (app, store) = test_app();
    let asset_id = Uuid::new_v4();
    store.insert_snapshot(snapshot(asset_id, 0.85)).await;

    let (_, created) = send(&app, Method::POST, "/v1/pricing/rules", Some(demand_rule_body())).await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/v1/pricing/rules/{}/status", id),
        Some(json!({ "status": "inactive" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "inactive");

    let (_, body) = send(
        &app,
        Method::POST,
        "/v1/pricing",
        Some(json!({
            "action": "calculate_price",
            "asset_type": "ticket",
            "asset_id": asset_id,
            "base_price": 100.0
        })),
    )
    .await;

    assert_eq!(body["adjusted_price"], 100.0);
    assert!(body["applied_rules"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_rule_keeps_usage_statistics() {
    let (app, store) = test_app();

    let rule = PricingRule::new(
        "Demand surge",
        RuleConditions::DemandBased(DemandConditions::default()),
        ["ticket"],
    );
    store.create_rule(&rule).await.unwrap();
    store.record_rule_trigger(rule.id, Utc::now()).await.unwrap();

    let mut body = demand_rule_body();
    body["name"] = json!("Demand surge v2");
    body["priority"] = json!(9);
    let (status, updated) = send(&app, Method::PUT, &format!("/v1/pricing/rules/{}", rule.id), Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Demand surge v2");
    assert_eq!(updated["priority"], 9);

    let stored = store.get_rule(rule.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Demand surge v2");
    assert_eq!(stored.usage_count, 1);
    assert!(stored.last_triggered.is_some());
}

#[tokio::test]
async fn test_invalid_pricing_requests() {
    let (app, _) = test_app();

    let (status, _) = send(&app, Method::POST, "/v1/pricing", Some(json!({ "action": "reticulate" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/pricing",
        Some(json!({ "action": "calculate_price", "asset_type": "ticket" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/pricing",
        Some(json!({
            "action": "calculate_price",
            "asset_type": "ticket",
            "asset_id": Uuid::new_v4(),
            "base_price": -5.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("base_price"));
}

#[tokio::test]
async fn test_malformed_json_gets_error_body() {
    let (app, _) = test_app();

    for uri in ["/v1/pricing", "/v1/pricing/rules"] {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{\"action\": \"calculate_price\","))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"), "{}", uri);
    }
}

#[tokio::test]
async fn test_apply_pricing_action_reports_per_listing() {
    let (app, store) = test_app();
    let asset_id = Uuid::new_v4();

    store.insert_snapshot(snapshot(asset_id, 0.9)).await;
    store
        .insert_ownership(AssetOwnershipRecord {
            asset_id,
            asset_type: "ticket".to_string(),
            original_price: 80.0,
            current_valuation: Some(100.0),
        })
        .await;
    let listing = Listing::new(asset_id, "ticket", 95.0);
    let listing_id = listing.id;
    store.insert_listing(listing).await;
    send(&app, Method::POST, "/v1/pricing/rules", Some(demand_rule_body())).await;

    let missing = Uuid::new_v4();
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/pricing",
        Some(json!({ "action": "apply_pricing", "listing_ids": [listing_id, missing] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let updated = body["updated"].as_array().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0]["asking_price"], 110.0);
    assert_eq!(updated[0]["price_history"][0]["previous_price"], 95.0);
    assert_eq!(body["failed"][0]["listing_id"], missing.to_string());
}

#[tokio::test]
async fn test_optimize_and_market_analysis_actions() {
    let (app, store) = test_app();
    let asset_id = Uuid::new_v4();
    store.insert_snapshot(snapshot(asset_id, 0.5)).await;
    for price in [90.0, 100.0, 110.0] {
        store.insert_listing(Listing::new(asset_id, "ticket", price)).await;
    }

    let (status, recommendation) = send(
        &app,
        Method::POST,
        "/v1/pricing",
        Some(json!({
            "action": "optimize_pricing",
            "asset_type": "ticket",
            "asset_id": asset_id,
            "current_price": 120.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recommendation["suggested_price"], 100.0);
    assert_eq!(recommendation["trend"], "stable");

    let (status, analysis) = send(
        &app,
        Method::POST,
        "/v1/pricing",
        Some(json!({ "action": "market_analysis", "asset_id": asset_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["snapshot_count"], 1);
    assert_eq!(analysis["competitor_stats"]["count"], 3);
    assert_eq!(analysis["competitor_stats"]["median"], 100.0);
}
