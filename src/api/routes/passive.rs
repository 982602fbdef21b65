//! Passive Data Routes
//!
//! - POST /api/v1/users/:user_id/passive/bulk - Validate and store a batch
//! - GET /api/v1/users/:user_id/passive/aggregate - Bucketed aggregates
//! - GET /api/v1/users/:user_id/passive/health-metrics - One-day health summary

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::analytics::UserId;
use crate::api::dto::{AggregateParams, BulkIngestRequest, HealthMetricsParams};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::passive::{AggregationReport, BulkIngestResult, DailyHealthMetrics};

/// POST /api/v1/users/:user_id/passive/bulk
///
/// Every candidate is validated on its own; the response lists rejected
/// indices alongside the ids of stored points.
pub async fn bulk_ingest(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Json(req): Json<BulkIngestRequest>,
) -> ApiResult<(StatusCode, Json<BulkIngestResult>)> {
    let result = state
        .service
        .bulk_ingest(user_id, req.data_points, req.process_async, Utc::now())
        .await?;

    let status = if result.error_count == 0 {
        if result.processing_async {
            StatusCode::ACCEPTED
        } else {
            StatusCode::CREATED
        }
    } else if result.success_count > 0 {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::BAD_REQUEST
    };

    Ok((status, Json(result)))
}

/// GET /api/v1/users/:user_id/passive/aggregate
pub async fn aggregate(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Query(params): Query<AggregateParams>,
) -> ApiResult<Json<AggregationReport>> {
    let query = params.into_query().map_err(ApiError::Validation)?;
    let report = state.service.aggregate(user_id, query, Utc::now()).await?;
    Ok(Json(report))
}

/// GET /api/v1/users/:user_id/passive/health-metrics
pub async fn health_metrics(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Query(params): Query<HealthMetricsParams>,
) -> ApiResult<Json<DailyHealthMetrics>> {
    let today = state.service.today(Utc::now());
    let date = params.date(today).map_err(ApiError::Validation)?;
    let metrics = state.service.health_metrics(user_id, date).await?;
    Ok(Json(metrics))
}
