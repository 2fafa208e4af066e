// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Todoist API client.
//!
//! Handles:
//! - OAuth authorize URL and code-for-token exchange
//! - Project and task creation with a user's access token
//!
//! Calls are independent and never retried.

use crate::config::Config;
use crate::error::AppError;
use serde::Deserialize;

const DEFAULT_OAUTH_BASE: &str = "https://todoist.com/oauth";
const DEFAULT_API_BASE: &str = "https://api.todoist.com/rest/v2";
const SCOPE: &str = "data:read_write";
/// Due date used when the client does not supply one.
pub const DEFAULT_DUE_STRING: &str = "today";

/// Todoist API client.
#[derive(Clone)]
pub struct TodoistClient {
    http: reqwest::Client,
    oauth_base: String,
    api_base: String,
    client_id: String,
    client_secret: String,
}

/// Token exchange response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TodoistClient {
    /// Create a client with OAuth credentials from config.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            oauth_base: DEFAULT_OAUTH_BASE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            client_id: config.todoist_client_id.clone(),
            client_secret: config.todoist_client_secret.clone(),
        })
    }

    /// Point the client at different hosts (staging, tests).
    pub fn with_base_urls(mut self, oauth_base: &str, api_base: &str) -> Self {
        self.oauth_base = oauth_base.trim_end_matches('/').to_string();
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Consent screen URL carrying `state` back to `redirect_uri`.
    pub fn authorize_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "{}/authorize?client_id={}&scope={}&state={}&redirect_uri={}",
            self.oauth_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(SCOPE),
            urlencoding::encode(state),
            urlencoding::encode(redirect_uri)
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/access_token", self.oauth_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::TaskManager(format!("Token exchange request failed: {}", e)))?;

        check_response_json(response).await
    }

    /// Create a task, optionally with a natural-language due date and project.
    pub async fn create_task(
        &self,
        access_token: &str,
        content: &str,
        due_string: Option<&str>,
        project_id: Option<&str>,
    ) -> Result<serde_json::Value, AppError> {
        let mut body = serde_json::json!({ "content": content });
        if let Some(due_string) = due_string {
            body["due_string"] = serde_json::json!(due_string);
        }
        if let Some(project_id) = project_id {
            body["project_id"] = serde_json::json!(project_id);
        }

        self.post_json("tasks", access_token, &body).await
    }

    /// Create a project.
    pub async fn create_project(
        &self,
        access_token: &str,
        name: &str,
    ) -> Result<serde_json::Value, AppError> {
        let body = serde_json::json!({ "name": name });
        self.post_json("projects", access_token, &body).await
    }

    async fn post_json(
        &self,
        path: &str,
        access_token: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        let response = self
            .http
            .post(format!("{}/{}", self.api_base, path))
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::TaskManager(e.to_string()))?;

        check_response_json(response).await
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::TaskManager(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::TaskManager(format!("JSON parse error: {}", e)))
}

/// Project name for a whole-summary export: first 30 characters plus "...".
pub fn project_name_for(summary: &str) -> String {
    let prefix: String = summary.chars().take(30).collect();
    format!("Summary: {}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        let client = TodoistClient::new(&Config::test_default()).unwrap();
        let url = client.authorize_url("abc", "http://localhost:8080/cb");

        assert!(url.starts_with("https://todoist.com/oauth/authorize?"));
        assert!(url.contains("client_id=test_todoist_client_id"));
        assert!(url.contains("scope=data%3Aread_write"));
        assert!(url.contains("state=abc"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcb"));
    }

    #[test]
    fn test_base_url_override() {
        let client = TodoistClient::new(&Config::test_default())
            .unwrap()
            .with_base_urls("http://127.0.0.1:1/oauth/", "http://127.0.0.1:1/api");
        assert!(client
            .authorize_url("s", "r")
            .starts_with("http://127.0.0.1:1/oauth/authorize?"));
    }

    #[test]
    fn test_project_name_for() {
        assert_eq!(project_name_for("Short"), "Summary: Short...");
        let long = "x".repeat(50);
        assert_eq!(project_name_for(&long), format!("Summary: {}...", "x".repeat(30)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_task_manager_error() {
        let client = TodoistClient::new(&Config::test_default())
            .unwrap()
            .with_base_urls("http://127.0.0.1:9/oauth", "http://127.0.0.1:9/api");
        let err = client
            .create_task("token", "Do it", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TaskManager(_)));
    }
}
