// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use axum::response::Response;
use inbox_digest::config::Config;
use inbox_digest::db::{FirestoreDb, MemoryDb, Store};
use inbox_digest::middleware::auth::create_jwt;
use inbox_digest::models::{Source, Summary, SummaryMetadata, User};
use inbox_digest::routes::create_router;
use inbox_digest::services::{
    CompletionRequest, GoogleOAuthClient, LlmClient, LlmError, TodoistClient,
};
use inbox_digest::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Reply in the format the summarization prompt asks for.
#[allow(dead_code)]
pub const CANNED_REPLY: &str = "SUMMARY: The launch moved to Friday.\n\nTASKS:\n- Email Bob the deck\n- Book the demo room";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Scripted LLM: always the same reply (or failure), with call accounting.
pub struct MockLlmClient {
    reply: Option<String>,
    call_count: AtomicUsize,
    last_text: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            call_count: AtomicUsize::new(0),
            last_text: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            call_count: AtomicUsize::new(0),
            last_text: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// User text of the most recent call.
    pub fn last_text(&self) -> Option<String> {
        self.last_text.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_text.lock().unwrap() = Some(request.user_text);
        self.reply.clone().ok_or(LlmError::Api {
            status: 503,
            message: "upstream unavailable".to_string(),
        })
    }
}

/// Create a test app backed by the in-memory store and the canned reply.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MockLlmClient>) {
    create_test_app_with_llm(MockLlmClient::replying(CANNED_REPLY))
}

/// Create a test app with a specific LLM script.
#[allow(dead_code)]
pub fn create_test_app_with_llm(
    llm: MockLlmClient,
) -> (axum::Router, Arc<AppState>, Arc<MockLlmClient>) {
    // Unreachable host: any outbound call fails fast.
    build_test_app(llm, "http://127.0.0.1:9")
}

/// Create a test app whose Todoist and Google calls go to `upstream`
/// (a mock server): Todoist under `/oauth` and `/api`, Google at
/// `/google/token` and `/google/userinfo`.
#[allow(dead_code)]
pub fn create_test_app_with_upstream(upstream: &str) -> (axum::Router, Arc<AppState>) {
    let (app, state, _) = build_test_app(MockLlmClient::replying(CANNED_REPLY), upstream);
    (app, state)
}

fn build_test_app(
    llm: MockLlmClient,
    upstream: &str,
) -> (axum::Router, Arc<AppState>, Arc<MockLlmClient>) {
    let config = Config::test_default();
    let llm = Arc::new(llm);

    let todoist = TodoistClient::new(&config).unwrap().with_base_urls(
        &format!("{}/oauth", upstream),
        &format!("{}/api", upstream),
    );
    let google = GoogleOAuthClient::new(&config).unwrap().with_endpoints(
        &format!("{}/google/token", upstream),
        &format!("{}/google/userinfo", upstream),
    );

    let state = Arc::new(AppState {
        config,
        db: Arc::new(MemoryDb::new()),
        llm: llm.clone(),
        todoist,
        google,
    });

    (create_router(state.clone()), state, llm)
}

/// Session token for a user ID.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_jwt(user_id, signing_key).unwrap()
}

/// Store a fresh free-tier user.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, email: &str) -> User {
    let user = User::new_free(email.to_string(), "Test User".to_string(), None, chrono::Utc::now());
    state.db.upsert_user(&user).await.unwrap();
    user
}

/// Store a user after applying `edit` to a fresh free-tier record.
#[allow(dead_code)]
pub async fn seed_user_with(state: &AppState, email: &str, edit: impl FnOnce(&mut User)) -> User {
    let mut user =
        User::new_free(email.to_string(), "Test User".to_string(), None, chrono::Utc::now());
    edit(&mut user);
    state.db.upsert_user(&user).await.unwrap();
    user
}

/// Store a summary for `user_id` stamped at `created_at` (RFC3339).
#[allow(dead_code)]
pub async fn seed_summary(state: &AppState, user_id: &str, text: &str, created_at: &str) -> Summary {
    seed_summary_with_tasks(
        state,
        user_id,
        text,
        created_at,
        &[&format!("Follow up on {}", text)],
    )
    .await
}

/// Store a summary with the given extracted tasks.
#[allow(dead_code)]
pub async fn seed_summary_with_tasks(
    state: &AppState,
    user_id: &str,
    text: &str,
    created_at: &str,
    tasks: &[&str],
) -> Summary {
    let summary = Summary {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        original_text: text.to_string(),
        summary: format!("Summary of {}", text),
        tasks: tasks.iter().map(|t| t.to_string()).collect(),
        source: Source::Other,
        metadata: SummaryMetadata {
            timestamp: created_at.to_string(),
            ..Default::default()
        },
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
    };
    state
        .db
        .record_summary(&summary, u32::MAX, chrono::Utc::now())
        .await
        .unwrap();
    summary
}

#[allow(dead_code)]
pub fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
