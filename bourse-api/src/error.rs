use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bourse_pricing::PricingError;
use bourse_shared::RuleValidationError;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    RateLimited,
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string()),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidInput(msg) => AppError::Validation(msg),
            PricingError::NotFound(msg) => AppError::NotFound(msg),
            PricingError::Repository(msg) => AppError::Internal(msg),
        }
    }
}

impl From<RuleValidationError> for AppError {
    fn from(err: RuleValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for AppError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// Decode a JSON body into `T`. Unparseable JSON and shape errors are both
/// reported as 400 with the usual error body.
pub fn decode_body<T: DeserializeOwned>(payload: Result<Json<Value>, JsonRejection>) -> Result<T, AppError> {
    let Json(body) = payload?;
    serde_json::from_value(body).map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_pricing_errors_map_to_status() {
        let (status, body) = render(PricingError::InvalidInput("base_price".to_string()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "base_price");

        let (status, _) = render(PricingError::NotFound("listing".to_string()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = render(AppError::RateLimited).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_internal_details_stay_out_of_the_body() {
        let err: Box<dyn std::error::Error + Send + Sync> = "connection refused on 10.0.0.7:5432".into();

        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal Server Error" }));

        let (_, body) = render(PricingError::Repository("pool timed out".to_string()).into()).await;
        assert_eq!(body["error"], "Internal Server Error");
    }
}
