// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inbox-Digest API Server
//!
//! Summarizes pasted email and chat threads with an LLM, stores the result
//! per user and exports the extracted tasks to Todoist.

use inbox_digest::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb, Store},
    services::{GoogleOAuthClient, OpenAiClient, TodoistClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Inbox-Digest API");
    tracing::debug!(config = ?config, "Configuration loaded");

    let env_check = config.env_check();
    tracing::info!(
        google = env_check.google_client_id && env_check.google_client_secret,
        todoist = env_check.todoist_client_id && env_check.todoist_client_secret,
        openai = env_check.openai_api_key,
        database = env_check.database,
        "Environment check"
    );

    let db: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            tracing::info!(project = %config.gcp_project_id, "Using Firestore store");
            Arc::new(db)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let llm = Arc::new(OpenAiClient::new(&config)?);
    tracing::info!(model = %config.openai_model, "LLM client initialized");

    let todoist = TodoistClient::new(&config)?;
    let google = GoogleOAuthClient::new(&config)?;

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        llm,
        todoist,
        google,
    });

    // Build router
    let app = inbox_digest::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("inbox_digest=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
