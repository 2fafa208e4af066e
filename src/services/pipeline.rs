// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Summarization pipeline.
//!
//! load user → quota gate → validate input → model call → parse → atomic
//! write of summary plus usage increment. Every failure before the model
//! call returns without side effects; a failed model call writes nothing.

use crate::db::{RecordOutcome, Store};
use crate::error::AppError;
use crate::models::{Source, Summary, SummaryMetadata, Usage};
use crate::services::input;
use crate::services::llm::{CompletionRequest, LlmClient};
use crate::services::parser::parse_reply;
use crate::services::quota::{self, FREE_TIER_MONTHLY_LIMIT};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Instruction sent with every request.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant that summarizes text and extracts actionable tasks.
You MUST follow this exact format in your response:

SUMMARY: Write a concise 2-3 sentence summary of the text here.

TASKS:
- Task 1
- Task 2
- etc.

Do not deviate from this format or add any additional text. Start with SUMMARY: followed by your summary, then TASKS: followed by the list of tasks.";

/// Sampling temperature for the summarization call.
pub const TEMPERATURE: f32 = 0.7;

/// Body of `POST /api/summarize`.
///
/// `text` stays loosely typed so a non-string value is reported as a
/// validation error rather than a JSON parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub text: Option<serde_json::Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: Option<MetadataInput>,
}

/// Client-supplied provenance identifiers. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInput {
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Response of `POST /api/summarize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SummarizeResponse {
    pub summary: String,
    pub tasks: Vec<String>,
    pub id: String,
}

/// Pipeline result, including the owner's updated usage.
#[derive(Debug, Clone)]
pub struct SummarizeOutcome {
    pub response: SummarizeResponse,
    pub usage: Usage,
}

/// Sequential orchestrator for one summarization request.
pub struct SummaryPipeline<'a> {
    db: &'a dyn Store,
    llm: &'a dyn LlmClient,
    timeout: Duration,
}

impl<'a> SummaryPipeline<'a> {
    pub fn new(db: &'a dyn Store, llm: &'a dyn LlmClient, timeout: Duration) -> Self {
        Self { db, llm, timeout }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.db.as_ref(),
            state.llm.as_ref(),
            state.config.upstream_timeout,
        )
    }

    /// Run the pipeline for an authenticated user.
    pub async fn run(
        &self,
        user_id: &str,
        request: SummarizeRequest,
    ) -> Result<SummarizeOutcome, AppError> {
        let now = Utc::now();

        // 1. Load the user
        let user = self.db.get_user(user_id).await?.ok_or_else(|| {
            tracing::warn!(user_id, "Authenticated user has no user record");
            AppError::UserNotFound
        })?;

        // 2. Quota gate (advisory; re-checked atomically at write time)
        quota::check(&user, now)?;

        // 3. Validate input
        let prepared = input::prepare(request.text.as_ref())?;
        let source =
            Source::from_request(request.source.as_deref()).map_err(AppError::BadRequest)?;

        // 4. Model call
        tracing::info!(
            user_id,
            text_chars = prepared.truncated.chars().count(),
            "Calling AI service"
        );
        let completion = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_text: prepared.truncated,
            temperature: TEMPERATURE,
        };
        let raw = match tokio::time::timeout(self.timeout, self.llm.complete(completion)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::error!(user_id, error = %e, "AI service call failed");
                return Err(AppError::UpstreamAi(e.to_string()));
            }
            Err(_) => {
                tracing::error!(user_id, timeout = ?self.timeout, "AI service call timed out");
                return Err(AppError::UpstreamAi("request timed out".to_string()));
            }
        };

        // 5. Parse
        let parsed = parse_reply(&raw);
        tracing::debug!(
            user_id,
            summary_chars = parsed.summary.chars().count(),
            task_count = parsed.tasks.len(),
            "Parsed model reply"
        );

        // 6. Persist summary and usage together
        let stamp = format_utc_rfc3339(now);
        let metadata = request.metadata.unwrap_or_default();
        let summary = Summary {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            original_text: prepared.original,
            summary: parsed.summary,
            tasks: parsed.tasks,
            source,
            metadata: SummaryMetadata {
                thread_id: metadata.thread_id,
                message_id: metadata.message_id,
                channel_id: metadata.channel_id,
                timestamp: stamp.clone(),
            },
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        summary
            .validate()
            .map_err(|e| AppError::BadRequest(format!("Validation failed: {}", e)))?;

        let usage = match self
            .db
            .record_summary(&summary, FREE_TIER_MONTHLY_LIMIT, now)
            .await?
        {
            RecordOutcome::Recorded(usage) => usage,
            RecordOutcome::QuotaExceeded => return Err(AppError::QuotaExceeded),
            RecordOutcome::UserMissing => return Err(AppError::UserNotFound),
        };

        tracing::info!(
            user_id,
            summary_id = %summary.id,
            task_count = summary.tasks.len(),
            summaries_this_month = usage.summaries_this_month,
            "Summary created"
        );

        Ok(SummarizeOutcome {
            response: SummarizeResponse {
                summary: summary.summary,
                tasks: summary.tasks,
                id: summary.id,
            },
            usage,
        })
    }
}
