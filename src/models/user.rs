// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User model for storage and API.

use crate::time_utils::{format_utc_rfc3339, is_before_month_of, parse_utc_rfc3339};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Integration key for Todoist credentials.
pub const TODOIST: &str = "todoist";
/// Integration key for Asana credentials.
pub const ASANA: &str = "asana";

/// User profile stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque user ID (also used as document ID)
    pub id: String,
    /// Email address from the identity provider (unique)
    pub email: String,
    /// Display name
    pub name: String,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub subscription: Subscription,
    #[serde(default)]
    pub usage: Usage,
    /// OAuth credentials keyed by integration name ("todoist", ...)
    #[serde(default)]
    pub integrations: HashMap<String, IntegrationTokens>,
    /// When the user first signed in
    pub created_at: String,
    /// Last modification
    pub updated_at: String,
}

impl User {
    /// A newly provisioned user: free tier, zero usage, no integrations.
    pub fn new_free(email: String, name: String, image: Option<String>, now: DateTime<Utc>) -> Self {
        let now = format_utc_rfc3339(now);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            name,
            image,
            subscription: Subscription::default(),
            usage: Usage::default(),
            integrations: HashMap::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Credentials for a connected integration.
    pub fn integration(&self, name: &str) -> Option<&IntegrationTokens> {
        self.integrations.get(name).filter(|t| t.is_connected())
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.integration(name).is_some()
    }
}

/// Billing tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SubscriptionStatus {
    #[default]
    Free,
    Pro,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Subscription {
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
}

/// Monthly summarization counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Usage {
    #[serde(default)]
    pub summaries_this_month: u32,
    /// RFC3339 timestamp of the most recent summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_summary_date: Option<String>,
}

impl Usage {
    /// Counter value for the month containing `now`.
    ///
    /// A counter last touched in an earlier calendar month counts as zero.
    /// Without a `last_summary_date` the stored value stands.
    pub fn effective_count(&self, now: DateTime<Utc>) -> u32 {
        match self.last_summary_date.as_deref().and_then(parse_utc_rfc3339) {
            Some(last) if is_before_month_of(last, now) => 0,
            _ => self.summaries_this_month,
        }
    }

    /// Count one more summary at `now`.
    pub fn record(&mut self, now: DateTime<Utc>) {
        self.summaries_this_month = self.effective_count(now).saturating_add(1);
        self.last_summary_date = Some(format_utc_rfc3339(now));
    }
}

/// OAuth credentials for one integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationTokens {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl IntegrationTokens {
    /// A non-empty access token means "connected".
    pub fn is_connected(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}
