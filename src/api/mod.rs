//! MindBridge Analytics REST API
//!
//! HTTP API layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Check-ins
//! - `POST /api/v1/users/:user_id/checkins` - Record a check-in
//! - `GET /api/v1/users/:user_id/checkins/streak` - Streak summary
//! - `GET /api/v1/users/:user_id/checkins/analytics?period=` - Mood analytics
//!
//! ## Passive data
//! - `POST /api/v1/users/:user_id/passive/bulk` - Bulk ingest
//! - `GET /api/v1/users/:user_id/passive/aggregate?data_type=&period=` - Aggregates
//! - `GET /api/v1/users/:user_id/passive/health-metrics?date=` - Daily health summary
//!
//! ## Health
//! - `GET /health/live` - Liveness check
//! - `GET /health/ready` - Readiness check
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use mindbridge_analytics::api::{serve, AppState};
//! use mindbridge_analytics::config::Config;
//! use mindbridge_analytics::service::AnalyticsService;
//! use mindbridge_analytics::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let service = AnalyticsService::new(Arc::new(MemoryStore::new()), config.clone());
//!
//!     let state = AppState::new(service, config.api.clone());
//!     serve(state, &config.api).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        // Check-in routes
        .route("/checkins", post(routes::checkins::create_checkin))
        .route("/checkins/streak", get(routes::checkins::get_streak))
        .route("/checkins/analytics", get(routes::checkins::get_analytics))
        // Passive data routes
        .route("/passive/bulk", post(routes::passive::bulk_ingest))
        .route("/passive/aggregate", get(routes::passive::aggregate))
        .route("/passive/health-metrics", get(routes::passive::health_metrics));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1/users/:user_id", user_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Permissive when no origins are configured
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("MindBridge analytics API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("MindBridge analytics API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::service::AnalyticsService;
    use crate::store::MemoryStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let config = Config::default();
        let service = AnalyticsService::new(Arc::new(MemoryStore::new()), config.clone());
        build_router(AppState::new(service, config.api))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let response = create_test_app().oneshot(get("/health/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let response = create_test_app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_checkin_then_streak() {
        let app = create_test_app();
        let today = Utc::now().date_naive();

        for offset in 0..3 {
            let date = today - Duration::days(offset);
            let body = format!(r#"{{"date": "{}", "mood_rating": 7, "keywords": ["walk"]}}"#, date);
            let response = app
                .clone()
                .oneshot(post_json("/api/v1/users/1/checkins", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .clone()
            .oneshot(get("/api/v1/users/1/checkins/streak"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["current_streak"], 3);
        assert_eq!(body["total_checkins"], 3);
        assert_eq!(body["days_since_last_checkin"], 0);
    }

    #[tokio::test]
    async fn test_duplicate_checkin_conflicts() {
        let app = create_test_app();
        let body = r#"{"mood_rating": 6}"#.to_string();

        let first = app
            .clone()
            .oneshot(post_json("/api/v1/users/2/checkins", body.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(post_json("/api/v1/users/2/checkins", body))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let body = body_json(second).await;
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_checkin_rejected() {
        let response = create_test_app()
            .oneshot(post_json("/api/v1/users/1/checkins", r#"{"mood_rating": 11}"#.into()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analytics_for_new_user() {
        let response = create_test_app()
            .oneshot(get("/api/v1/users/9/checkins/analytics?period=weekly"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["period"], "weekly");
        assert_eq!(body["average_mood"], 0.0);
        assert_eq!(body["trend_direction"], "stable");
    }

    #[tokio::test]
    async fn test_analytics_bad_period() {
        let response = create_test_app()
            .oneshot(get("/api/v1/users/9/checkins/analytics?period=yearly"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bulk_ingest_partial_then_aggregate() {
        let app = create_test_app();
        let ts = (Utc::now() - Duration::hours(1)).to_rfc3339();

        let mut points: Vec<serde_json::Value> = (0..8)
            .map(|i| serde_json::json!({"data_type": "step_count", "value": 100 + i, "source": "HealthKit", "timestamp": ts}))
            .collect();
        points.push(serde_json::json!({"data_type": "heart_rate", "value": 900, "source": "HealthKit"}));
        points.push(serde_json::json!({"data_type": "unknown", "value": 1, "source": "HealthKit"}));
        let body = serde_json::json!({ "data_points": points }).to_string();

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/users/5/passive/bulk", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);

        let result = body_json(response).await;
        assert_eq!(result["success_count"], 8);
        assert_eq!(result["error_count"], 2);
        assert_eq!(result["total_count"], 10);
        assert_eq!(result["accepted_ids"].as_array().unwrap().len(), 8);

        let response = app
            .oneshot(get("/api/v1/users/5/passive/aggregate?data_type=step_count&period=daily"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let report = body_json(response).await;
        let counted: u64 = report["buckets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["count"].as_u64().unwrap())
            .sum();
        assert_eq!(counted, 8);
    }

    #[tokio::test]
    async fn test_duplicate_points_are_reported_per_item() {
        let app = create_test_app();
        let ts = (Utc::now() - Duration::hours(2)).to_rfc3339();
        let point = serde_json::json!({"data_type": "step_count", "value": 250, "source": "HealthKit", "timestamp": ts});

        let first = app
            .clone()
            .oneshot(post_json("/api/v1/users/6/passive/bulk", serde_json::json!({"data_points": [point]}).to_string()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let again = app
            .oneshot(post_json("/api/v1/users/6/passive/bulk", serde_json::json!({"data_points": [point]}).to_string()))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);
        let result = body_json(again).await;
        assert_eq!(result["success_count"], 0);
        assert_eq!(result["errors"][0]["reason"], "Duplicate data point");
    }

    #[tokio::test]
    async fn test_health_metrics_endpoint() {
        let app = create_test_app();
        let now = Utc::now();
        let points = serde_json::json!({"data_points": [
            {"data_type": "step_count", "value": 3000, "source": "HealthKit", "timestamp": now.to_rfc3339()},
            {"data_type": "heart_rate", "value": 64, "source": "Fitbit", "timestamp": now.to_rfc3339()},
        ]});

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/users/8/passive/bulk", points.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let uri = format!("/api/v1/users/8/passive/health-metrics?date={}", now.date_naive());
        let response = app.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let metrics = body_json(response).await;
        assert_eq!(metrics["step_count"], 3000);
        assert_eq!(metrics["heart_rate_avg"], 64.0);
        assert!(metrics["sleep_duration"].is_null());

        let tomorrow = now.date_naive() + Duration::days(2);
        let uri = format!("/api/v1/users/8/passive/health-metrics?date={}", tomorrow);
        let response = app.oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_aggregate_rejects_oversized_range() {
        let uri = "/api/v1/users/5/passive/aggregate?data_type=heart_rate&period=hourly\
                   &start=2020-01-01T00:00:00Z&end=2024-01-01T00:00:00Z";
        let response = create_test_app().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bulk_ingest_empty_batch() {
        let response = create_test_app()
            .oneshot(post_json("/api/v1/users/5/passive/bulk", r#"{"data_points": []}"#.into()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_aggregate_unknown_type() {
        let response = create_test_app()
            .oneshot(get("/api/v1/users/5/passive/aggregate?data_type=blood_sugar"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
