// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod summary;
pub mod user;

pub use summary::{Source, Summary, SummaryMetadata};
pub use user::{IntegrationTokens, Subscription, SubscriptionStatus, Usage, User};
