// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Free-tier quota gate.

use crate::error::AppError;
use crate::models::{SubscriptionStatus, User};
use chrono::{DateTime, Utc};

/// Summaries a free-tier user may create per calendar month.
pub const FREE_TIER_MONTHLY_LIMIT: u32 = 10;

/// Whether `user` may create another summary at `now`.
///
/// Pro users are never limited. The counter rolls over lazily, see
/// [`crate::models::Usage::effective_count`].
pub fn permits(user: &User, free_limit: u32, now: DateTime<Utc>) -> bool {
    match user.subscription.status {
        SubscriptionStatus::Pro => true,
        SubscriptionStatus::Free => user.usage.effective_count(now) < free_limit,
    }
}

/// Reject with `QuotaExceeded` when the free-tier limit is reached.
pub fn check(user: &User, now: DateTime<Utc>) -> Result<(), AppError> {
    if permits(user, FREE_TIER_MONTHLY_LIMIT, now) {
        Ok(())
    } else {
        tracing::info!(
            user_id = %user.id,
            count = user.usage.summaries_this_month,
            "Free-tier monthly limit reached"
        );
        Err(AppError::QuotaExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(status: SubscriptionStatus, count: u32) -> User {
        let now = Utc::now();
        let mut user = User::new_free("q@example.com".into(), "Q".into(), None, now);
        user.subscription.status = status;
        user.usage.summaries_this_month = count;
        user.usage.last_summary_date = Some(crate::time_utils::format_utc_rfc3339(now));
        user
    }

    #[test]
    fn test_free_user_below_limit_permitted() {
        assert!(check(&user_with(SubscriptionStatus::Free, 0), Utc::now()).is_ok());
        assert!(check(&user_with(SubscriptionStatus::Free, 9), Utc::now()).is_ok());
    }

    #[test]
    fn test_free_user_at_limit_rejected() {
        let err = check(&user_with(SubscriptionStatus::Free, 10), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded));
        assert!(check(&user_with(SubscriptionStatus::Free, 11), Utc::now()).is_err());
    }

    #[test]
    fn test_pro_user_never_rejected() {
        assert!(check(&user_with(SubscriptionStatus::Pro, 1000), Utc::now()).is_ok());
    }

    #[test]
    fn test_counter_from_previous_month_does_not_block() {
        let mut user = user_with(SubscriptionStatus::Free, 10);
        user.usage.last_summary_date = Some("2000-01-31T00:00:00.000Z".to_string());
        assert!(check(&user, Utc::now()).is_ok());
    }
}
