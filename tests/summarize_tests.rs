// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end summarization tests over the HTTP surface.
//!
//! Covers the quota gate, input validation, truncation, model failures and
//! the resulting persisted state.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use inbox_digest::models::SubscriptionStatus;
use inbox_digest::time_utils::format_utc_rfc3339;
use tower::ServiceExt;

mod common;
use common::{MockLlmClient, CANNED_REPLY};

#[tokio::test]
async fn test_summarize_then_read_back() {
    let (app, state, llm) = common::create_test_app();
    let user = common::seed_user(&state, "ann@example.com").await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);

    let response = app
        .clone()
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({
                "text": "Hi team, the launch moved to Friday. Bob needs the deck.",
                "source": "gmail",
                "metadata": { "threadId": "t-1", "messageId": "m-1" }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["summary"], "The launch moved to Friday.");
    assert_eq!(
        body["tasks"],
        serde_json::json!(["Email Bob the deck", "Book the demo room"])
    );
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(llm.call_count(), 1);

    // Listed first, readable by ID, usage incremented
    let list = common::body_json(
        app.clone()
            .oneshot(common::get("/api/summaries", &token))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(list["summaries"][0]["id"], id.as_str());
    assert_eq!(list["pagination"]["total"], 1);

    let stored = common::body_json(
        app.clone()
            .oneshot(common::get(&format!("/api/summaries/{}", id), &token))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(stored["source"], "gmail");
    assert_eq!(stored["metadata"]["threadId"], "t-1");
    assert_eq!(stored["userId"], user.id.as_str());

    let profile = common::body_json(app.oneshot(common::get("/api/user", &token)).await.unwrap()).await;
    assert_eq!(profile["usage"]["summariesThisMonth"], 1);
    assert!(profile["usage"]["lastSummaryDate"].is_string());
}

#[tokio::test]
async fn test_free_user_at_limit_is_refused_without_model_call() {
    let (app, state, llm) = common::create_test_app();
    let now = format_utc_rfc3339(chrono::Utc::now());
    let user = common::seed_user_with(&state, "ann@example.com", |u| {
        u.usage.summaries_this_month = 10;
        u.usage.last_summary_date = Some(now);
    })
    .await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({ "text": "Hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "Monthly limit reached. Please upgrade to Pro.");
    assert_eq!(llm.call_count(), 0);
    assert_eq!(state.db.count_summaries_for_user(&user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_last_free_summary_of_the_month() {
    let (app, state, _) = common::create_test_app();
    let now = format_utc_rfc3339(chrono::Utc::now());
    let user = common::seed_user_with(&state, "ann@example.com", |u| {
        u.usage.summaries_this_month = 9;
        u.usage.last_summary_date = Some(now);
    })
    .await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);

    let first = app
        .clone()
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({ "text": "Hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.usage.summaries_this_month, 10);

    let second = app
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({ "text": "Hello again" }),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_counter_from_previous_month_does_not_block() {
    let (app, state, _) = common::create_test_app();
    let user = common::seed_user_with(&state, "ann@example.com", |u| {
        u.usage.summaries_this_month = 10;
        u.usage.last_summary_date = Some("2020-01-15T10:00:00.000Z".to_string());
    })
    .await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({ "text": "Hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.usage.summaries_this_month, 1);
}

#[tokio::test]
async fn test_pro_user_unlimited() {
    let (app, state, _) = common::create_test_app();
    let now = format_utc_rfc3339(chrono::Utc::now());
    let user = common::seed_user_with(&state, "pro@example.com", |u| {
        u.subscription.status = SubscriptionStatus::Pro;
        u.usage.summaries_this_month = 1000;
        u.usage.last_summary_date = Some(now);
    })
    .await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({ "text": "Hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.usage.summaries_this_month, 1001);
}

#[tokio::test]
async fn test_long_text_truncated_for_model_but_stored_whole() {
    let (app, state, llm) = common::create_test_app();
    let user = common::seed_user(&state, "ann@example.com").await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);
    let text = "é".repeat(5000);

    let response = app
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({ "text": text }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let id = common::body_json(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    assert_eq!(llm.last_text().unwrap().chars().count(), 4000);
    let stored = state.db.get_summary(&id).await.unwrap().unwrap();
    assert_eq!(stored.original_text.chars().count(), 5000);
}

#[tokio::test]
async fn test_model_failure_returns_502_and_writes_nothing() {
    let (app, state, llm) = common::create_test_app_with_llm(MockLlmClient::failing());
    let user = common::seed_user(&state, "ann@example.com").await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({ "text": "Hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "Error connecting to AI service");
    assert!(!body.to_string().contains("upstream unavailable"));

    assert_eq!(llm.call_count(), 1);
    assert_eq!(state.db.count_summaries_for_user(&user.id).await.unwrap(), 0);
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.usage.summaries_this_month, 0);
}

#[tokio::test]
async fn test_unformatted_reply_becomes_summary() {
    let (app, state, _) =
        common::create_test_app_with_llm(MockLlmClient::replying("  Just a plain answer.  "));
    let user = common::seed_user(&state, "ann@example.com").await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({ "text": "Hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["summary"], "Just a plain answer.");
    assert_eq!(body["tasks"], serde_json::json!([]));
}

#[tokio::test]
async fn test_invalid_text_rejected_before_model_call() {
    let (app, state, llm) = common::create_test_app();
    let user = common::seed_user(&state, "ann@example.com").await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);

    for body in [
        serde_json::json!({}),
        serde_json::json!({ "text": "" }),
        serde_json::json!({ "text": "   \n\t" }),
        serde_json::json!({ "text": 42 }),
        serde_json::json!({ "text": "ok", "source": "carrier-pigeon" }),
    ] {
        let response = app
            .clone()
            .oneshot(common::post_json("/api/summarize", &token, body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }

    assert_eq!(llm.call_count(), 0);
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.usage.summaries_this_month, 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, state, _) = common::create_test_app();
    let user = common::seed_user(&state, "ann@example.com").await;
    let token = common::create_test_jwt(&user.id, &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/summarize")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"text\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_session_for_deleted_user() {
    let (app, state, llm) = common::create_test_app();
    let token = common::create_test_jwt("no-such-user", &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::post_json(
            "/api/summarize",
            &token,
            serde_json::json!({ "text": "Hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        common::body_json(response).await["error"],
        "User not found"
    );
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_reply_matches_parser_output() {
    let parsed = inbox_digest::services::parse_reply(CANNED_REPLY);
    assert_eq!(parsed.summary, "The launch moved to Friday.");
    assert_eq!(parsed.tasks.len(), 2);
}
