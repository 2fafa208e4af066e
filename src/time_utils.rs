// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
///
/// Millisecond precision is fixed so stored strings sort chronologically.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC3339 timestamp.
pub fn parse_utc_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whether `earlier` falls in a UTC calendar month before the one containing `now`.
pub fn is_before_month_of(earlier: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (earlier.year(), earlier.month()) < (now.year(), now.month())
}
