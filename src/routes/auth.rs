// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in and session routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::User;
use crate::routes::is_allowed_origin;
use crate::services::{oauth_state, GoogleProfile};
use crate::AppState;

/// Cookie binding a sign-in attempt to the browser that started it.
pub const SIGN_IN_NONCE_COOKIE: &str = "digest_signin_nonce";
const SIGN_IN_NONCE_PATH: &str = "/auth/google";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/logout", post(logout))
}

/// Query parameters for starting OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to redirect back to after sign-in.
    /// If not provided, uses FRONTEND_URL.
    #[serde(default)]
    redirect_uri: Option<String>,
}

fn callback_url(state: &AppState) -> String {
    format!("{}/auth/google/callback", state.config.api_url)
}

/// Payload of the signed sign-in `state`: `nonce|frontend_url`.
#[derive(Debug, PartialEq, Eq)]
pub struct SignInState {
    pub nonce: String,
    pub frontend_url: String,
}

impl SignInState {
    pub fn encode(&self) -> String {
        format!("{}|{}", self.nonce, self.frontend_url)
    }

    pub fn decode(payload: &str) -> Option<Self> {
        let (nonce, frontend_url) = payload.split_once('|')?;
        if nonce.is_empty() {
            return None;
        }
        Some(Self {
            nonce: nonce.to_string(),
            frontend_url: frontend_url.to_string(),
        })
    }
}

/// Start OAuth flow - redirect to the Google consent screen.
///
/// The nonce goes both into the signed `state` and into a short-lived cookie;
/// the callback only signs in when the two match.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<AuthStartParams>,
) -> Result<(CookieJar, Redirect)> {
    let frontend_url = params
        .redirect_uri
        .map(|uri| uri.trim_end_matches('/').to_string())
        .filter(|uri| is_allowed_origin(uri, &state.config.frontend_url))
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let sign_in = SignInState {
        nonce: uuid::Uuid::new_v4().simple().to_string(),
        frontend_url,
    };
    let oauth_state = oauth_state::sign(&sign_in.encode(), &state.config.oauth_state_key)?;
    let auth_url = state
        .google
        .authorize_url(&oauth_state, &callback_url(&state));

    let nonce_cookie = Cookie::build((SIGN_IN_NONCE_COOKIE, sign_in.nonce))
        .path(SIGN_IN_NONCE_PATH)
        .http_only(true)
        .secure(state.config.api_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(
            oauth_state::MAX_STATE_AGE.as_secs() as i64,
        ));

    tracing::info!(
        frontend_url = %sign_in.frontend_url,
        "Starting sign-in, redirecting to Google"
    );

    Ok((jar.add(nonce_cookie), Redirect::temporary(&auth_url)))
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

/// OAuth callback - exchange code, find or create the user, set the session cookie.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let sign_in_state = params
        .state
        .as_deref()
        .and_then(|s| oauth_state::verify(s, &state.config.oauth_state_key))
        .and_then(|payload| SignInState::decode(&payload));
    let frontend_url = match &sign_in_state {
        Some(s) => s.frontend_url.clone(),
        None => {
            tracing::warn!("Invalid or expired sign-in state, using default frontend URL");
            state.config.frontend_url.clone()
        }
    };

    // Single use: the nonce cookie is cleared whatever the outcome.
    let browser_nonce = jar
        .get(SIGN_IN_NONCE_COOKIE)
        .map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(SIGN_IN_NONCE_COOKIE).path(SIGN_IN_NONCE_PATH));

    let error_redirect = |code: &str| {
        Redirect::temporary(&format!(
            "{}/?error={}",
            frontend_url,
            urlencoding::encode(code)
        ))
    };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return (jar, error_redirect(&error));
    }
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return (jar, error_redirect("invalid_callback"));
    };

    let bound_to_browser = match (&sign_in_state, &browser_nonce) {
        (Some(signed), Some(cookie)) => {
            bool::from(signed.nonce.as_bytes().ct_eq(cookie.as_bytes()))
        }
        _ => false,
    };
    if !bound_to_browser {
        tracing::warn!("Sign-in state not bound to this browser");
        return (jar, error_redirect("invalid_state"));
    }

    let user = match sign_in(&state, &code).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in failed");
            return (jar, error_redirect("signin_failed"));
        }
    };

    let jwt = match create_jwt(&user.id, &state.config.jwt_signing_key) {
        Ok(jwt) => jwt,
        Err(e) => {
            tracing::error!(error = %e, "JWT creation failed");
            return (jar, error_redirect("signin_failed"));
        }
    };

    tracing::info!(user_id = %user.id, "Sign-in successful");

    let cookie = Cookie::build((SESSION_COOKIE, jwt))
        .path("/")
        .http_only(true)
        .secure(state.config.api_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64));

    (
        jar.add(cookie),
        Redirect::temporary(&format!("{}/dashboard", frontend_url)),
    )
}

/// Exchange the code with Google and resolve the user record by email.
async fn sign_in(state: &AppState, code: &str) -> Result<User> {
    let profile = state.google.sign_in(code, &callback_url(state)).await?;
    upsert_from_profile(state, profile).await
}

/// Refresh an existing user's display fields, or provision a free-tier user.
async fn upsert_from_profile(state: &AppState, profile: GoogleProfile) -> Result<User> {
    let now = chrono::Utc::now();
    let name = profile.display_name();

    if let Some(existing) = state.db.get_user_by_email(&profile.email).await? {
        return state
            .db
            .update_profile(&existing.id, &name, profile.picture.as_deref(), now)
            .await?
            .ok_or(AppError::UserNotFound);
    }

    tracing::info!(email = %profile.email, "Provisioning new user");
    let user = User::new_free(profile.email, name, profile.picture, now);
    state.db.upsert_user(&user).await?;

    Ok(user)
}

/// Logout - expire the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}
