// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Validation of submitted text.

use crate::error::AppError;

/// Characters forwarded to the model; the rest is cut silently.
pub const MAX_TEXT_LENGTH: usize = 4000;

/// Validated submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInput {
    /// Exactly what the client sent
    pub original: String,
    /// Left-anchored prefix of at most `MAX_TEXT_LENGTH` characters
    pub truncated: String,
}

/// Accept any JSON string that is non-blank after trimming.
pub fn prepare(text: Option<&serde_json::Value>) -> Result<PreparedInput, AppError> {
    let text = match text {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
        _ => return Err(AppError::BadRequest("Text is required".to_string())),
    };

    Ok(PreparedInput {
        original: text.clone(),
        truncated: truncate_chars(text, MAX_TEXT_LENGTH),
    })
}

/// First `max` characters of `text` (never splits a code point).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
