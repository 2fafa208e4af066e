// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and handed to each component at
//! construction time. Secret values are never logged.

use serde::Serialize;
use std::env;
use std::fmt;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (identity provider)
    pub google_client_id: String,
    /// Todoist OAuth client ID
    pub todoist_client_id: String,
    /// Chat-completions model name
    pub openai_model: String,
    /// Base URL of the OpenAI-compatible API
    pub openai_base_url: String,
    /// Public URL of this API (OAuth callbacks point here)
    pub api_url: String,
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// GCP project ID (Firestore database)
    pub gcp_project_id: String,
    /// Document store backend
    pub store_backend: StoreBackend,
    /// Server port
    pub port: u16,
    /// Bound applied to every outbound HTTP call
    pub upstream_timeout: Duration,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Todoist OAuth client secret
    pub todoist_client_secret: String,
    /// OpenAI API key
    pub openai_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for OAuth `state` values
    pub oauth_state_key: Vec<u8>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "<redacted>";
        f.debug_struct("Config")
            .field("google_client_id", &self.google_client_id)
            .field("todoist_client_id", &self.todoist_client_id)
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("api_url", &self.api_url)
            .field("frontend_url", &self.frontend_url)
            .field("gcp_project_id", &self.gcp_project_id)
            .field("store_backend", &self.store_backend)
            .field("port", &self.port)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("google_client_secret", &REDACTED)
            .field("todoist_client_secret", &REDACTED)
            .field("openai_api_key", &REDACTED)
            .field("jwt_signing_key", &REDACTED)
            .field("oauth_state_key", &REDACTED)
            .finish()
    }
}

impl Config {
    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test_google_client_id".to_string(),
            todoist_client_id: "test_todoist_client_id".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_base_url: "http://127.0.0.1:9".to_string(),
            api_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            store_backend: StoreBackend::Memory,
            port: 8080,
            upstream_timeout: Duration::from_secs(5),
            google_client_secret: "test_google_secret".to_string(),
            todoist_client_secret: "test_todoist_secret".to_string(),
            openai_api_key: "test_openai_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let jwt_signing_key = required("JWT_SIGNING_KEY")?.into_bytes();
        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(|v| v.trim().as_bytes().to_vec())
            .unwrap_or_else(|_| jwt_signing_key.clone());

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Firestore,
        };

        let timeout_secs: u64 = match env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("UPSTREAM_TIMEOUT_SECS"))?,
            Err(_) => 30,
        };

        Ok(Self {
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            todoist_client_id: required("TODOIST_CLIENT_ID")?,
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            api_url: env::var("API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            store_backend,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            upstream_timeout: Duration::from_secs(timeout_secs),

            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            todoist_client_secret: required("TODOIST_CLIENT_SECRET")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            jwt_signing_key,
            oauth_state_key,
        })
    }

    /// Presence of every externally supplied setting, without the values.
    pub fn env_check(&self) -> EnvCheck {
        EnvCheck {
            google_client_id: !self.google_client_id.is_empty(),
            google_client_secret: !self.google_client_secret.is_empty(),
            todoist_client_id: !self.todoist_client_id.is_empty(),
            todoist_client_secret: !self.todoist_client_secret.is_empty(),
            openai_api_key: !self.openai_api_key.is_empty(),
            session_secret: !self.jwt_signing_key.is_empty(),
            database: self.store_backend == StoreBackend::Memory
                || !self.gcp_project_id.is_empty(),
            api_url: self.api_url.clone(),
        }
    }
}

/// Read a required variable, trimming stray whitespace from secret bindings.
fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Presence flags for configured settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EnvCheck {
    pub google_client_id: bool,
    pub google_client_secret: bool,
    pub todoist_client_id: bool,
    pub todoist_client_secret: bool,
    pub openai_api_key: bool,
    pub session_secret: bool,
    pub database: bool,
    pub api_url: String,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
