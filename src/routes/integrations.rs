// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Todoist integration routes: OAuth connect flow and task export.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{user, IntegrationTokens};
use crate::routes::json_body;
use crate::services::oauth_state;
use crate::services::todoist::{project_name_for, DEFAULT_DUE_STRING};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Browser-facing routes (Todoist redirects here without a session header).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/integrations/todoist/callback", get(todoist_callback))
}

/// Routes that require authentication.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/integrations/todoist", get(todoist_auth_url))
        .route(
            "/api/integrations/todoist/create-tasks",
            post(create_tasks_from_summary),
        )
        .route("/api/todoist/create-task", post(create_task))
}

fn callback_url(state: &AppState) -> String {
    format!("{}/api/integrations/todoist/callback", state.config.api_url)
}

/// The user's Todoist access token.
async fn todoist_token(state: &AppState, user_id: &str) -> Result<String> {
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    user.integration(user::TODOIST)
        .map(|t| t.access_token.clone())
        .ok_or_else(|| AppError::BadRequest("Todoist integration not found".to_string()))
}

// ─── OAuth Connect ───────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Return the Todoist consent URL for the current user.
async fn todoist_auth_url(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AuthUrlResponse>> {
    let signed = oauth_state::sign(&user.user_id, &state.config.oauth_state_key)?;
    let auth_url = state.todoist.authorize_url(&signed, &callback_url(&state));

    Ok(Json(AuthUrlResponse { auth_url }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the code and attach the token to the user in `state`.
async fn todoist_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let dashboard = format!("{}/dashboard", state.config.frontend_url);
    let error_redirect = |code: &str| {
        Redirect::temporary(&format!("{}?error={}", dashboard, urlencoding::encode(code)))
    };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Todoist");
        return error_redirect(&error);
    }

    let (Some(code), Some(signed)) = (params.code, params.state) else {
        return error_redirect("invalid_callback");
    };

    let Some(user_id) = oauth_state::verify(&signed, &state.config.oauth_state_key) else {
        tracing::warn!("Invalid or expired Todoist state");
        return error_redirect("invalid_state");
    };

    let token = match state.todoist.exchange_code(&code, &callback_url(&state)).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Todoist token exchange failed");
            return error_redirect("token_exchange_failed");
        }
    };

    let tokens = IntegrationTokens {
        access_token: token.access_token,
        refresh_token: None,
        expires_at: None,
    };
    match state
        .db
        .set_integration(&user_id, user::TODOIST, &tokens)
        .await
    {
        Ok(true) => {
            tracing::info!(user_id = %user_id, "Todoist connected");
            Redirect::temporary(&format!("{}?integration=todoist&success=true", dashboard))
        }
        Ok(false) => {
            tracing::warn!(user_id = %user_id, "Todoist callback for unknown user");
            error_redirect("integration_failed")
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to store Todoist token");
            error_redirect("integration_failed")
        }
    }
}

// ─── Task Export ─────────────────────────────────────────────

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Content is required".into()));
    }
    Ok(())
}

/// Single task request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    #[serde(default)]
    pub due_string: Option<String>,
}

/// Create one Todoist task; returns Todoist's task object.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let request = json_body(payload)?;
    request
        .validate()
        .map_err(|_| AppError::BadRequest("Content is required".to_string()))?;

    let token = todoist_token(&state, &user.user_id).await?;
    let due_string = request
        .due_string
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_DUE_STRING);

    let task = state
        .todoist
        .create_task(&token, request.content.trim(), Some(due_string), None)
        .await?;

    tracing::info!(user_id = %user.user_id, "Todoist task created");
    Ok(Json(task))
}

/// Whole-summary export request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTasksRequest {
    #[serde(default)]
    pub summary_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTasksResponse {
    pub success: bool,
    pub project: serde_json::Value,
    pub tasks: Vec<serde_json::Value>,
}

/// Todoist returns ids as strings; older payloads used numbers.
fn project_id(project: &serde_json::Value) -> Option<String> {
    match project.get("id")? {
        serde_json::Value::String(id) => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Export a stored summary as a Todoist project with one task per item.
async fn create_tasks_from_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<CreateTasksRequest>, JsonRejection>,
) -> Result<Json<CreateTasksResponse>> {
    let request = json_body(payload)?;
    let summary_id = request
        .summary_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Summary ID is required".to_string()))?;
    if uuid::Uuid::parse_str(&summary_id).is_err() {
        return Err(AppError::BadRequest("Invalid summary ID".to_string()));
    }

    let token = todoist_token(&state, &user.user_id).await?;

    let summary = state
        .db
        .get_summary(&summary_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Summary not found".to_string()))?;
    if summary.user_id != user.user_id {
        tracing::warn!(
            user_id = %user.user_id,
            summary_id = %summary_id,
            "Summary export requested by non-owner"
        );
        return Err(AppError::Forbidden);
    }

    let project = state
        .todoist
        .create_project(&token, &project_name_for(&summary.summary))
        .await?;
    let project_id = project_id(&project).ok_or_else(|| {
        AppError::TaskManager("Project response missing id".to_string())
    })?;

    let mut tasks = Vec::with_capacity(summary.tasks.len());
    for content in &summary.tasks {
        match state
            .todoist
            .create_task(&token, content, None, Some(&project_id))
            .await
        {
            Ok(task) => tasks.push(task),
            Err(e) => tracing::warn!(
                summary_id = %summary_id,
                error = %e,
                "Skipping task that Todoist rejected"
            ),
        }
    }

    tracing::info!(
        user_id = %user.user_id,
        summary_id = %summary_id,
        created = tasks.len(),
        requested = summary.tasks.len(),
        "Summary exported to Todoist"
    );

    Ok(Json(CreateTasksResponse {
        success: true,
        project,
        tasks,
    }))
}
