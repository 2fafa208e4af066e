// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Inbox-Digest: summarize pasted email and chat threads into action items
//!
//! This crate provides the backend API that sends pasted text to an LLM,
//! stores the resulting summary and task list per user, enforces the
//! free-tier monthly quota and exports tasks to Todoist.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{GoogleOAuthClient, LlmClient, TodoistClient};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub llm: Arc<dyn LlmClient>,
    pub todoist: TodoistClient,
    pub google: GoogleOAuthClient,
}
