// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by `DashMap`.
//!
//! Used for local development (`STORE_BACKEND=memory`) and tests. Data does
//! not survive a restart.

use crate::db::{RecordOutcome, Store};
use crate::error::AppError;
use crate::models::{IntegrationTokens, Summary, User};
use crate::services::quota;
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory database. Clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    summaries: Arc<DashMap<String, Summary>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summaries owned by `user_id`, newest first (ID breaks ties).
    fn sorted_for_user(&self, user_id: &str) -> Vec<Summary> {
        let mut owned: Vec<Summary> = self
            .summaries
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        owned
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        name: &str,
        image: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let Some(mut user) = self.users.get_mut(user_id) else {
            return Ok(None);
        };
        user.name = name.to_string();
        user.image = image.map(str::to_string);
        user.updated_at = format_utc_rfc3339(now);
        Ok(Some(user.clone()))
    }

    async fn set_integration(
        &self,
        user_id: &str,
        integration: &str,
        tokens: &IntegrationTokens,
    ) -> Result<bool, AppError> {
        let Some(mut user) = self.users.get_mut(user_id) else {
            return Ok(false);
        };
        user.integrations
            .insert(integration.to_string(), tokens.clone());
        user.updated_at = format_utc_rfc3339(Utc::now());
        Ok(true)
    }

    async fn get_summary(&self, summary_id: &str) -> Result<Option<Summary>, AppError> {
        Ok(self.summaries.get(summary_id).map(|s| s.clone()))
    }

    async fn list_summaries_for_user(
        &self,
        user_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Summary>, AppError> {
        Ok(self
            .sorted_for_user(user_id)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_summaries_for_user(&self, user_id: &str) -> Result<u64, AppError> {
        Ok(self
            .summaries
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .count() as u64)
    }

    async fn record_summary(
        &self,
        summary: &Summary,
        free_limit: u32,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, AppError> {
        // The entry guard locks the user's shard for the whole check-and-write.
        let Some(mut user) = self.users.get_mut(&summary.user_id) else {
            return Ok(RecordOutcome::UserMissing);
        };

        if !quota::permits(&user, free_limit, now) {
            return Ok(RecordOutcome::QuotaExceeded);
        }

        self.summaries.insert(summary.id.clone(), summary.clone());
        user.usage.record(now);
        user.updated_at = format_utc_rfc3339(now);

        Ok(RecordOutcome::Recorded(user.usage.clone()))
    }
}
