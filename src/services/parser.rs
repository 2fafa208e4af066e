// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Parser for the model's two-section reply.
//!
//! The model is asked for:
//!
//! ```text
//! SUMMARY: <one paragraph>
//! TASKS:
//! - <task>
//! ```
//!
//! Replies that ignore the format still parse: without a `SUMMARY:` marker
//! the whole reply becomes the summary, and without `TASKS:` the task list
//! is empty. Parsing never fails.

const SUMMARY_MARKER: &str = "SUMMARY:";
const TASKS_MARKER: &str = "TASKS:";

/// Summary text and extracted tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    pub summary: String,
    pub tasks: Vec<String>,
}

/// Split a raw model reply into summary and tasks.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let summary_start = raw.find(SUMMARY_MARKER).map(|i| i + SUMMARY_MARKER.len());

    // TASKS: is only looked for after the summary marker when there is one.
    let search_from = summary_start.unwrap_or(0);
    let tasks_marker = raw[search_from..]
        .find(TASKS_MARKER)
        .map(|i| search_from + i);

    let summary = match summary_start {
        Some(start) => raw[start..tasks_marker.unwrap_or(raw.len())].trim(),
        None => raw.trim(),
    };

    let tasks = tasks_marker
        .map(|pos| parse_task_lines(&raw[pos + TASKS_MARKER.len()..]))
        .unwrap_or_default();

    ParsedReply {
        summary: summary.to_string(),
        tasks,
    }
}

/// One task per non-blank line, bullet markers removed.
fn parse_task_lines(section: &str) -> Vec<String> {
    section
        .lines()
        .map(strip_bullet)
        .filter(|task| !task.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    line.strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .unwrap_or(line)
        .trim()
}
