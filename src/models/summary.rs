// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Summary model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Stored summary record in the `summaries` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Summary {
    /// Summary ID (also used as document ID)
    #[validate(length(min = 1))]
    pub id: String,
    /// Owning user
    #[validate(length(min = 1))]
    pub user_id: String,
    /// Submitted text, untruncated
    #[validate(length(min = 1))]
    pub original_text: String,
    pub summary: String,
    /// Extracted tasks in extraction order
    #[serde(default)]
    pub tasks: Vec<String>,
    pub source: Source,
    pub metadata: SummaryMetadata,
    pub created_at: String,
    pub updated_at: String,
}

/// Where the original text came from. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Source {
    Gmail,
    Slack,
    Teams,
    #[default]
    Other,
}

impl Source {
    /// Parse the client-supplied tag. Absent, empty and "custom" mean `Other`.
    pub fn from_request(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") | Some("custom") | Some("other") => Ok(Source::Other),
            Some("gmail") => Ok(Source::Gmail),
            Some("slack") => Ok(Source::Slack),
            Some("teams") => Ok(Source::Teams),
            Some(other) => Err(format!("Invalid source: {}", other)),
        }
    }
}

/// Provenance identifiers plus the write timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SummaryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Stamped at write time
    #[serde(default)]
    pub timestamp: String,
}
