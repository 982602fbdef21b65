//! Check-in Routes
//!
//! - POST /api/v1/users/:user_id/checkins - Record today's (or a past) check-in
//! - GET /api/v1/users/:user_id/checkins/streak - Current and longest streak
//! - GET /api/v1/users/:user_id/checkins/analytics?period= - Mood analytics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::analytics::{CheckinStreak, MoodAnalytics, UserId};
use crate::api::dto::{AnalyticsParams, CheckinCreatedResponse, CreateCheckinRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// POST /api/v1/users/:user_id/checkins
pub async fn create_checkin(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Json(req): Json<CreateCheckinRequest>,
) -> ApiResult<(StatusCode, Json<CheckinCreatedResponse>)> {
    let today = state.service.today(Utc::now());
    let checkin = req.into_checkin(user_id, today).map_err(ApiError::Validation)?;
    let date = checkin.date;

    state.service.record_checkin(checkin).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckinCreatedResponse {
            status: "ok".to_string(),
            user_id,
            date,
        }),
    ))
}

/// GET /api/v1/users/:user_id/checkins/streak
pub async fn get_streak(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<CheckinStreak>> {
    let streak = state.service.checkin_streak(user_id, Utc::now()).await?;
    Ok(Json(streak))
}

/// GET /api/v1/users/:user_id/checkins/analytics
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Query(params): Query<AnalyticsParams>,
) -> ApiResult<Json<MoodAnalytics>> {
    let period = params.period().map_err(ApiError::Validation)?;
    let analytics = state.service.mood_analytics(user_id, period, Utc::now()).await?;
    Ok(Json(analytics))
}
