// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod google;
pub mod input;
pub mod llm;
pub mod oauth_state;
pub mod parser;
pub mod pipeline;
pub mod quota;
pub mod todoist;

pub use google::{GoogleOAuthClient, GoogleProfile};
pub use llm::{CompletionRequest, LlmClient, LlmError, OpenAiClient};
pub use parser::{parse_reply, ParsedReply};
pub use pipeline::{SummarizeRequest, SummarizeResponse, SummaryPipeline};
pub use todoist::TodoistClient;
