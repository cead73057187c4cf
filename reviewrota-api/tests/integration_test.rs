/// Integration tests for the HTTP API
///
/// Every test drives the full router (extractors, handlers, error mapping)
/// over the in-memory backend with a fixed random seed.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{error_code, reviewers, TestContext};
use reviewrota_api::shutdown::DrainOutcome;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_add_team_then_duplicate() {
    let ctx = TestContext::new();
    let payload = json!({
        "team_name": "backend",
        "members": [
            { "user_id": "u1", "username": "Alice", "is_active": true },
            { "user_id": "u2", "username": "Bob", "is_active": false }
        ]
    });

    let (status, body) = ctx.post("/team/add", payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["team"]["team_name"], "backend");
    assert_eq!(body["team"]["members"].as_array().unwrap().len(), 2);

    let (status, body) = ctx.post("/team/add", payload).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "TEAM_EXISTS");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_add_team_validation() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post("/team/add", json!({ "team_name": "", "members": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    let (status, body) = ctx
        .post(
            "/team/add",
            json!({
                "team_name": "dupes",
                "members": [
                    { "user_id": "u1", "username": "A", "is_active": true },
                    { "user_id": "u1", "username": "B", "is_active": true }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "members[1].user_id");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();

    let request = Request::builder()
        .method("POST")
        .uri("/pullRequest/create")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = ctx.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn test_get_team() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true)]).await;

    let (status, body) = ctx.get("/team/get?team_name=core").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team"]["members"][0]["user_id"], "a");

    let (status, body) = ctx.get("/team/get?team_name=nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    let (status, body) = ctx.get("/team/get").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn test_set_is_active_reflected_in_team() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true)]).await;

    let (status, body) = ctx
        .post("/users/setIsActive", json!({ "user_id": "b", "is_active": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["user_id"], "b");
    assert_eq!(body["user"]["team_name"], "core");
    assert_eq!(body["user"]["is_active"], false);

    let (_, body) = ctx.get("/team/get?team_name=core").await;
    assert_eq!(body["team"]["members"][1]["is_active"], false);

    let (status, body) = ctx
        .post("/users/setIsActive", json!({ "user_id": "ghost", "is_active": true }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn test_create_pr_assigns_teammates() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true), ("c", true), ("d", false)])
        .await;

    let pr = ctx.create_pr("pr-1", "a").await;
    assert_eq!(pr["status"], "OPEN");
    assert_eq!(pr["author_id"], "a");
    assert!(pr["createdAt"].is_string());
    assert!(pr.get("mergedAt").is_none());

    let mut assigned = reviewers(&pr);
    assigned.sort();
    // only b and c are active teammates
    assert_eq!(assigned, vec!["b", "c"]);
}

#[tokio::test]
async fn test_create_pr_errors() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true)]).await;

    let pr = ctx.create_pr("pr-1", "a").await;
    assert!(reviewers(&pr).is_empty());

    let payload = json!({
        "pull_request_id": "pr-1",
        "pull_request_name": "again",
        "author_id": "a",
    });
    let (status, body) = ctx.post("/pullRequest/create", payload).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "PR_EXISTS");

    let payload = json!({
        "pull_request_id": "pr-2",
        "pull_request_name": "orphan",
        "author_id": "ghost",
    });
    let (status, body) = ctx.post("/pullRequest/create", payload).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn test_merge_is_idempotent() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true)]).await;
    ctx.create_pr("pr-1", "a").await;

    let (status, first) = ctx
        .post("/pullRequest/merge", json!({ "pull_request_id": "pr-1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["pr"]["status"], "MERGED");
    assert!(first["pr"]["mergedAt"].is_string());

    let (status, second) = ctx
        .post("/pullRequest/merge", json!({ "pull_request_id": "pr-1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["pr"]["mergedAt"], first["pr"]["mergedAt"]);

    let (status, body) = ctx
        .post("/pullRequest/merge", json!({ "pull_request_id": "nope" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn test_reassign_swaps_in_remaining_teammate() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true), ("c", true), ("d", true)])
        .await;
    let pr = ctx.create_pr("pr-1", "a").await;
    let before = reviewers(&pr);
    let old = before[0].clone();

    // legacy field name
    let (status, body) = ctx
        .post(
            "/pullRequest/reassign",
            json!({ "pull_request_id": "pr-1", "old_reviewer_id": old }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let replaced_by = body["replaced_by"].as_str().unwrap().to_string();
    let after = reviewers(&body["pr"]);
    assert_ne!(replaced_by, old);
    assert_ne!(replaced_by, "a");
    assert!(!before.contains(&replaced_by));
    assert_eq!(after, vec![replaced_by, before[1].clone()]);
}

#[tokio::test]
async fn test_reassign_conflicts() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true), ("c", true)])
        .await;
    ctx.create_pr("pr-1", "a").await;

    // author is never a reviewer
    let (status, body) = ctx
        .post("/pullRequest/reassign", json!({ "pull_request_id": "pr-1", "old_user_id": "a" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "NOT_ASSIGNED");

    // b and c are both assigned, nobody is left
    let (status, body) = ctx
        .post("/pullRequest/reassign", json!({ "pull_request_id": "pr-1", "old_user_id": "b" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "NO_CANDIDATE");

    ctx.post("/pullRequest/merge", json!({ "pull_request_id": "pr-1" }))
        .await;
    let (status, body) = ctx
        .post("/pullRequest/reassign", json!({ "pull_request_id": "pr-1", "old_user_id": "b" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "PR_MERGED");

    let (status, body) = ctx
        .post("/pullRequest/reassign", json!({ "pull_request_id": "nope", "old_user_id": "b" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn test_get_review_lists_short_prs() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true)]).await;
    ctx.create_pr("pr-1", "a").await;
    ctx.create_pr("pr-2", "a").await;
    ctx.post("/pullRequest/merge", json!({ "pull_request_id": "pr-2" }))
        .await;

    let (status, body) = ctx.get("/users/getReview?user_id=b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "b");

    let prs = body["pull_requests"].as_array().unwrap();
    assert_eq!(prs.len(), 2);
    for pr in prs {
        assert_eq!(pr["author_id"], "a");
        assert!(pr.get("assigned_reviewers").is_none());
    }

    let (status, body) = ctx.get("/users/getReview?user_id=a").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["pull_requests"].as_array().unwrap().is_empty());

    let (status, _) = ctx.get("/users/getReview?user_id=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_stats() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true)]).await;
    ctx.create_pr("pr-1", "a").await;
    ctx.create_pr("pr-2", "a").await;
    ctx.post("/pullRequest/merge", json!({ "pull_request_id": "pr-1" }))
        .await;

    let (status, body) = ctx.get("/stats/user?user_id=b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "b");
    assert_eq!(body["assigned_count"], 2);
    assert_eq!(body["open_pr_count"], 1);
    assert_eq!(body["merged_pr_count"], 1);

    let (status, body) = ctx.get("/stats/user?user_id=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn test_rebalance_report() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true), ("c", true), ("d", true), ("e", true)])
        .await;
    let pr = ctx.create_pr("pr-1", "a").await;
    let before = reviewers(&pr);

    let (status, body) = ctx
        .post("/team/rebalance", json!({ "team_name": "core" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["team_name"], "core");
    assert!(body["skipped"].as_array().unwrap().is_empty());

    let entry = &body["reassigned"][0];
    assert_eq!(entry["pull_request_id"], "pr-1");
    assert_eq!(reviewers(entry).len(), 2);
    for id in reviewers(entry) {
        assert_ne!(id, "a");
        assert!(!before.contains(&id));
    }

    let (status, body) = ctx
        .post("/team/rebalance", json!({ "team_name": "nope" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn test_cancelled_requests_are_unavailable() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true)]).await;
    ctx.cancel.cancel();

    let (status, body) = ctx.get("/team/get?team_name=core").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "CANCELLED");
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_answers_timeout_envelope() {
    let ctx = TestContext::with_slow_users(Duration::from_secs(30));
    ctx.create_team("core", &[("a", true)]).await;

    let (status, body) = ctx.get("/stats/user?user_id=a").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(error_code(&body), "TIMEOUT");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_requests_succeed_during_drain_window() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true), ("b", true)]).await;
    ctx.create_pr("pr-1", "a").await;

    let outcome = ctx
        .shutdown
        .run(async {
            // signal arrives while this request is being served
            ctx.shutdown.trigger();
            let (status, body) = ctx
                .post("/pullRequest/merge", json!({ "pull_request_id": "pr-1" }))
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            assert_eq!(body["pr"]["status"], "MERGED");
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(outcome, DrainOutcome::Completed);
    assert!(!ctx.cancel.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_requests_after_drain_window_are_cancelled() {
    let ctx = TestContext::new();
    ctx.create_team("core", &[("a", true)]).await;
    ctx.shutdown.trigger();

    let outcome = ctx
        .shutdown
        .run(async {
            // still running when the drain window closes
            ctx.cancel.cancelled().await;
            let (status, body) = ctx.get("/team/get?team_name=core").await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(error_code(&body), "CANCELLED");
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(outcome, DrainOutcome::Cancelled);
}
