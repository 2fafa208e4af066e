// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! `Store` is the seam between handlers and persistence. Production runs on
//! Firestore; the in-memory store serves local development and tests.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{IntegrationTokens, Summary, Usage, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SUMMARIES: &str = "summaries";
}

/// Result of the atomic summary write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Summary stored and usage incremented; carries the new usage.
    Recorded(Usage),
    /// The fresh counter was already at the limit; nothing written.
    QuotaExceeded,
    /// The owning user no longer exists; nothing written.
    UserMissing,
}

/// Persistent store for users and summaries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get a user by ID.
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Get a user by email address.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Create or replace a user.
    ///
    /// Writes the whole document; only for users that do not exist yet.
    /// Existing users are changed through the field-level methods below so a
    /// concurrent usage increment is never overwritten.
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    /// Refresh the display fields of an existing user.
    ///
    /// Touches `name`, `image` and `updatedAt` only. Returns the updated user,
    /// or `None` if the user does not exist.
    async fn update_profile(
        &self,
        user_id: &str,
        name: &str,
        image: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError>;

    /// Store integration credentials, leaving every other field alone.
    /// Returns `false` if the user does not exist.
    async fn set_integration(
        &self,
        user_id: &str,
        integration: &str,
        tokens: &IntegrationTokens,
    ) -> Result<bool, AppError>;

    /// Get a summary by ID (no ownership check).
    async fn get_summary(&self, summary_id: &str) -> Result<Option<Summary>, AppError>;

    /// A page of a user's summaries, newest first.
    async fn list_summaries_for_user(
        &self,
        user_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Summary>, AppError>;

    /// Total number of summaries owned by a user.
    async fn count_summaries_for_user(&self, user_id: &str) -> Result<u64, AppError>;

    /// Atomically re-check the quota, write the summary and bump the owner's usage.
    async fn record_summary(
        &self,
        summary: &Summary,
        free_limit: u32,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, AppError>;
}
