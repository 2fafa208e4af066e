// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile, subscription, usage counter, integration credentials)
//! - Summaries (one document per successful summarization)
//!
//! Listing summaries needs the composite index
//! `summaries(userId ASC, createdAt DESC)`.

use crate::db::{collections, RecordOutcome, Store};
use crate::error::AppError;
use crate::models::{IntegrationTokens, Summary, User};
use crate::services::quota;
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Transaction attempts before a commit failure is reported. A commit that
/// loses a race on the user document is retried once against fresh data.
const TRANSACTION_ATTEMPTS: u32 = 2;

/// Outcome of one transaction attempt.
enum Attempt<T> {
    Done(T),
    /// Commit rejected; nothing was written.
    Conflict(String),
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Owner field only; enough to count a user's summaries.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryOwner {
    #[allow(dead_code)]
    user_id: String,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes an unauthenticated connection.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Begin a transaction and a client that reads through it.
    async fn begin(
        &self,
    ) -> Result<(firestore::FirestoreTransaction<'_>, firestore::FirestoreDb), AppError> {
        let client = self.get_client()?;

        let transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let tx_client = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );

        Ok((transaction, tx_client))
    }

    /// Run `attempt` until it commits, retrying once on a rejected commit.
    async fn with_retry<T, F, Fut>(&self, what: &str, attempt: F) -> Result<T, AppError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Attempt<T>, AppError>>,
    {
        let mut tries = 1;
        loop {
            match attempt().await? {
                Attempt::Done(value) => return Ok(value),
                Attempt::Conflict(e) if tries < TRANSACTION_ATTEMPTS => {
                    tracing::warn!(
                        operation = what,
                        error = %e,
                        "Transaction commit rejected, retrying"
                    );
                    tries += 1;
                }
                Attempt::Conflict(e) => {
                    return Err(AppError::Database(format!(
                        "Transaction commit failed ({}): {}",
                        what, e
                    )));
                }
            }
        }
    }

    /// Read a user in a transaction, apply `edit`, and write back only
    /// `fields` (Firestore field paths). Returns `None` if the user is missing.
    async fn patch_user_once<F>(
        &self,
        user_id: &str,
        fields: &[&str],
        edit: &F,
    ) -> Result<Attempt<Option<User>>, AppError>
    where
        F: Fn(&mut User) + Sync,
    {
        let client = self.get_client()?;
        let (mut transaction, tx_client) = self.begin().await?;

        let current: Option<User> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read user in transaction: {}", e))
            })?;

        let Some(mut user) = current else {
            let _ = transaction.rollback().await;
            return Ok(Attempt::Done(None));
        };
        edit(&mut user);

        client
            .fluent()
            .update()
            .fields(fields.iter().copied())
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            return Ok(Attempt::Conflict(e.to_string()));
        }

        Ok(Attempt::Done(Some(user)))
    }

    async fn patch_user<F>(
        &self,
        user_id: &str,
        fields: &[&str],
        edit: F,
    ) -> Result<Option<User>, AppError>
    where
        F: Fn(&mut User) + Sync,
    {
        self.with_retry("patch_user", || self.patch_user_once(user_id, fields, &edit))
            .await
    }

    /// One attempt at the atomic summary write.
    ///
    /// The user document is read through the transaction so a concurrent
    /// increment makes the commit fail instead of overshooting the limit.
    async fn record_summary_once(
        &self,
        summary: &Summary,
        free_limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Attempt<RecordOutcome>, AppError> {
        let client = self.get_client()?;

        // 1. Read the owner within the transaction
        let (mut transaction, tx_client) = self.begin().await?;
        let current: Option<User> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&summary.user_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read user in transaction: {}", e))
            })?;

        let Some(mut user) = current else {
            let _ = transaction.rollback().await;
            return Ok(Attempt::Done(RecordOutcome::UserMissing));
        };

        // 2. Re-check the quota against the fresh counter
        if !quota::permits(&user, free_limit, now) {
            tracing::info!(
                user_id = %user.id,
                count = user.usage.summaries_this_month,
                "Quota reached inside transaction, nothing written"
            );
            let _ = transaction.rollback().await;
            return Ok(Attempt::Done(RecordOutcome::QuotaExceeded));
        }

        user.usage.record(now);
        user.updated_at = format_utc_rfc3339(now);

        // 3. Add summary write to transaction
        client
            .fluent()
            .update()
            .in_col(collections::SUMMARIES)
            .document_id(&summary.id)
            .object(summary)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add summary to transaction: {}", e))
            })?;

        // 4. Add usage write to transaction (usage fields only)
        client
            .fluent()
            .update()
            .fields(["usage", "updatedAt"])
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user to transaction: {}", e))
            })?;

        // 5. Commit atomically
        if let Err(e) = transaction.commit().await {
            return Ok(Attempt::Conflict(e.to_string()));
        }

        tracing::info!(
            user_id = %user.id,
            summary_id = %summary.id,
            count = user.usage.summaries_this_month,
            "Summary recorded atomically"
        );

        Ok(Attempt::Done(RecordOutcome::Recorded(user.usage)))
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        name: &str,
        image: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let updated_at = format_utc_rfc3339(now);
        self.patch_user(user_id, &["name", "image", "updatedAt"], |user| {
            user.name = name.to_string();
            user.image = image.map(str::to_string);
            user.updated_at = updated_at.clone();
        })
        .await
    }

    async fn set_integration(
        &self,
        user_id: &str,
        integration: &str,
        tokens: &IntegrationTokens,
    ) -> Result<bool, AppError> {
        let path = format!("integrations.{}", integration);
        let updated_at = format_utc_rfc3339(Utc::now());

        let updated = self
            .patch_user(user_id, &[path.as_str(), "updatedAt"], |user| {
                user.integrations
                    .insert(integration.to_string(), tokens.clone());
                user.updated_at = updated_at.clone();
            })
            .await?;

        Ok(updated.is_some())
    }

    // ─── Summary Operations ──────────────────────────────────────

    async fn get_summary(&self, summary_id: &str) -> Result<Option<Summary>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SUMMARIES)
            .obj()
            .one(summary_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_summaries_for_user(
        &self,
        user_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Summary>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUMMARIES)
            .filter(move |q| q.field("userId").eq(user_id.clone()))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .offset(offset)
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn count_summaries_for_user(&self, user_id: &str) -> Result<u64, AppError> {
        // TODO: switch to a Firestore COUNT aggregation once pro accounts
        // accumulate enough history for this scan to matter.
        let user_id = user_id.to_string();
        let owners: Vec<SummaryOwner> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SUMMARIES)
            .filter(move |q| q.field("userId").eq(user_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(owners.len() as u64)
    }

    // ─── Atomic Summary Recording ────────────────────────────────

    /// Store a summary and count it against the owner's quota in one transaction.
    ///
    /// A rejected commit is retried once; the retry re-reads the counter, so
    /// a request that lost the race to the last free slot ends as
    /// `QuotaExceeded` rather than a database error.
    async fn record_summary(
        &self,
        summary: &Summary,
        free_limit: u32,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, AppError> {
        self.with_retry("record_summary", || {
            self.record_summary_once(summary, free_limit, now)
        })
        .await
    }
}
