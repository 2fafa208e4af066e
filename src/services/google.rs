// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth client (identity provider for sign-in).

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use serde::Deserialize;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    token_url: String,
    userinfo_url: String,
    client_id: String,
    client_secret: String,
}

/// Token endpoint response (only the fields used here).
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
}

/// OpenID Connect userinfo.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl GoogleProfile {
    /// Name to show, falling back to the local part of the email.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or_default().to_string())
    }
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .context("HTTP client init failed")?;

        Ok(Self {
            http,
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
        })
    }

    /// Use different token and userinfo endpoints (tests).
    pub fn with_endpoints(mut self, token_url: &str, userinfo_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.userinfo_url = userinfo_url.to_string();
        self
    }

    /// Consent screen URL carrying `state` back to `redirect_uri`.
    pub fn authorize_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&prompt=select_account",
            AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state)
        )
    }

    /// Exchange the authorization code and fetch the signed-in profile.
    pub async fn sign_in(&self, code: &str, redirect_uri: &str) -> Result<GoogleProfile, AppError> {
        let token: GoogleTokenResponse = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("Google token request failed")?
            .error_for_status()
            .context("Google token exchange rejected")?
            .json()
            .await
            .context("Google token response malformed")?;

        let profile: GoogleProfile = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("Google userinfo request failed")?
            .error_for_status()
            .context("Google userinfo rejected")?
            .json()
            .await
            .context("Google userinfo malformed")?;

        if !profile.email_verified {
            return Err(AppError::BadRequest("Email address not verified".to_string()));
        }

        Ok(profile)
    }
}
