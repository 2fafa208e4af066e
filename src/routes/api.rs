// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{user, Subscription, Summary, Usage};
use crate::routes::{json_body, query_params};
use crate::services::{SummarizeRequest, SummarizeResponse, SummaryPipeline};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/summarize", post(summarize))
        .route("/api/summaries", get(list_summaries))
        .route("/api/summaries/{id}", get(get_summary))
        .route("/api/user", get(get_user))
}

// ─── Summarize ───────────────────────────────────────────────

/// Summarize pasted text into a summary plus task list.
async fn summarize(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>> {
    let request = json_body(payload)?;
    let outcome = SummaryPipeline::from_state(&state)
        .run(&user.user_id, request)
        .await?;

    Ok(Json(outcome.response))
}

// ─── Summaries ───────────────────────────────────────────────

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Query parameters for listing summaries.
#[derive(Debug, Deserialize, Validate)]
pub struct SummariesQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: u32,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, message = "limit must be at least 1"))]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Pagination {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub pages: u64,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SummariesResponse {
    pub summaries: Vec<Summary>,
    pub pagination: Pagination,
}

/// List the caller's summaries, newest first.
async fn list_summaries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    params: std::result::Result<Query<SummariesQuery>, QueryRejection>,
) -> Result<Json<SummariesResponse>> {
    let params = query_params(params)?;
    params
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Invalid pagination: {}", e)))?;

    let page = params.page;
    let limit = params.limit.min(MAX_PAGE_SIZE);
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::BadRequest("page out of range".to_string()))?;

    let total = state.db.count_summaries_for_user(&user.user_id).await?;
    let summaries = state
        .db
        .list_summaries_for_user(&user.user_id, offset, limit)
        .await?;

    Ok(Json(SummariesResponse {
        summaries,
        pagination: Pagination {
            total,
            page,
            limit,
            pages: total.div_ceil(u64::from(limit)),
        },
    }))
}

/// Fetch one summary owned by the caller.
async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Summary>> {
    if uuid::Uuid::parse_str(&id).is_err() {
        return Err(AppError::BadRequest("Invalid summary ID".to_string()));
    }

    let summary = state
        .db
        .get_summary(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Summary not found".to_string()))?;

    if summary.user_id != user.user_id {
        tracing::warn!(
            user_id = %user.user_id,
            summary_id = %id,
            "Summary requested by non-owner"
        );
        return Err(AppError::Forbidden);
    }

    Ok(Json(summary))
}

// ─── User Profile ────────────────────────────────────────────

/// Connection flags only; credentials never leave the server.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct IntegrationStatus {
    pub todoist: bool,
    pub asana: bool,
}

/// Current user response.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub subscription: Subscription,
    pub usage: Usage,
    pub integrations: IntegrationStatus,
}

/// Get current user profile.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let integrations = IntegrationStatus {
        todoist: profile.is_connected(user::TODOIST),
        asana: profile.is_connected(user::ASANA),
    };

    Ok(Json(UserResponse {
        email: profile.email,
        name: profile.name,
        image: profile.image,
        subscription: profile.subscription,
        usage: profile.usage,
        integrations,
    }))
}
