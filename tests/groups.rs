mod common;

use axum::http::StatusCode;
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_group_makes_creator_owner_and_sole_member() {
    let app = TestApp::new().await;
    let (user_id, token) = app.signup_and_login("alice", "alice@example.com").await;

    let resp = app
        .post_json("/groups", json!({ "name": "Trip" }), Some(&token))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["name"], "Trip");
    assert_eq!(body["owner"], user_id);
    assert_eq!(body["members"], json!([user_id]));
    assert_eq!(body["invite_code"].as_str().unwrap().len(), 8);
}

#[tokio::test]
async fn create_group_rejects_empty_name() {
    let app = TestApp::new().await;
    let (_, token) = app.signup_and_login("alice", "alice@example.com").await;

    let resp = app
        .post_json("/groups", json!({ "name": "   " }), Some(&token))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["name"].is_string());
}

#[tokio::test]
async fn invite_codes_are_unique_across_groups() {
    let app = TestApp::new().await;
    let (_, token) = app.signup_and_login("alice", "alice@example.com").await;

    let mut codes = std::collections::HashSet::new();
    for i in 0..20 {
        let (_, code) = app.create_group(&token, &format!("Group {i}")).await;
        assert_eq!(code.len(), 8);
        assert!(codes.insert(code), "invite code collided");
    }
}

#[tokio::test]
async fn join_by_invite_code_adds_member_and_is_idempotent() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (bob_id, bob) = app.signup_and_login("bob", "bob@example.com").await;
    let (_, code) = app.create_group(&alice, "Trip").await;

    let resp = app
        .post_json("/groups/join", json!({ "invite_code": code }), Some(&bob))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["members"], json!([alice_id, bob_id]));

    // Joining again is a no-op, not an error.
    let resp = app
        .post_json("/groups/join", json!({ "invite_code": code }), Some(&bob))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["members"], json!([alice_id, bob_id]));
}

#[tokio::test]
async fn join_with_unknown_code_is_404_and_missing_code_is_400() {
    let app = TestApp::new().await;
    let (_, token) = app.signup_and_login("alice", "alice@example.com").await;

    let resp = app
        .post_json("/groups/join", json!({ "invite_code": "deadbeef" }), Some(&token))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.post_json("/groups/join", json!({}), Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leave_by_non_owner_keeps_owner() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (_bob_id, bob) = app.signup_and_login("bob", "bob@example.com").await;
    let (group_id, code) = app.create_group(&alice, "Trip").await;
    app.post_json("/groups/join", json!({ "invite_code": code }), Some(&bob))
        .await;

    let resp = app
        .post_json(&format!("/groups/{group_id}/leave"), json!({}), Some(&bob))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["owner"], alice_id);
    assert_eq!(body["members"], json!([alice_id]));
}

#[tokio::test]
async fn owner_leave_hands_off_to_lowest_member_id() {
    let app = TestApp::new().await;
    let (_alice_id, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (bob_id, bob) = app.signup_and_login("bob", "bob@example.com").await;
    let (carol_id, carol) = app.signup_and_login("carol", "carol@example.com").await;
    let (group_id, code) = app.create_group(&alice, "Trip").await;
    app.post_json("/groups/join", json!({ "invite_code": &code }), Some(&bob))
        .await;
    app.post_json("/groups/join", json!({ "invite_code": &code }), Some(&carol))
        .await;

    let resp = app
        .post_json(&format!("/groups/{group_id}/leave"), json!({}), Some(&alice))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    // Bob registered before Carol, so he has the lower id.
    assert!(bob_id < carol_id);
    assert_eq!(body["owner"], bob_id);
    assert_eq!(body["members"], json!([bob_id, carol_id]));
}

#[tokio::test]
async fn sole_member_leave_deletes_group() {
    let app = TestApp::new().await;
    let (_, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (group_id, code) = app.create_group(&alice, "Trip").await;

    let resp = app
        .post_json(&format!("/groups/{group_id}/leave"), json!({}), Some(&alice))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // The old invite code no longer joins anything.
    let resp = app
        .post_json("/groups/join", json!({ "invite_code": code }), Some(&alice))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.get("/groups", Some(&alice)).await;
    let body = body_json(resp).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn full_ownership_lifecycle_scenario() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (bob_id, bob) = app.signup_and_login("bob", "bob@example.com").await;

    let (group_id, code) = app.create_group(&alice, "Trip").await;

    let resp = app
        .post_json("/groups/join", json!({ "invite_code": &code }), Some(&bob))
        .await;
    let body = body_json(resp).await;
    assert_eq!(body["owner"], alice_id);
    assert_eq!(body["members"], json!([alice_id, bob_id]));

    let resp = app
        .post_json(&format!("/groups/{group_id}/leave"), json!({}), Some(&alice))
        .await;
    let body = body_json(resp).await;
    assert_eq!(body["owner"], bob_id);
    assert_eq!(body["members"], json!([bob_id]));

    let resp = app
        .post_json(&format!("/groups/{group_id}/leave"), json!({}), Some(&bob))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .post_json("/groups/join", json!({ "invite_code": code }), Some(&bob))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn leave_by_non_member_is_404() {
    let app = TestApp::new().await;
    let (_, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (_, mallory) = app.signup_and_login("mallory", "mallory@example.com").await;
    let (group_id, _) = app.create_group(&alice, "Trip").await;

    let resp = app
        .post_json(&format!("/groups/{group_id}/leave"), json!({}), Some(&mallory))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn remove_member_is_owner_only() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (bob_id, bob) = app.signup_and_login("bob", "bob@example.com").await;
    let (group_id, code) = app.create_group(&alice, "Trip").await;
    app.post_json("/groups/join", json!({ "invite_code": code }), Some(&bob))
        .await;

    // Non-owner cannot remove anyone.
    let resp = app
        .post_json(
            &format!("/groups/{group_id}/remove_member"),
            json!({ "user_id": alice_id }),
            Some(&bob),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Owner removes bob.
    let resp = app
        .post_json(
            &format!("/groups/{group_id}/remove_member"),
            json!({ "user_id": bob_id }),
            Some(&alice),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Owner is untouched by removals.
    let resp = app.get(&format!("/groups/{group_id}"), Some(&alice)).await;
    let body = body_json(resp).await;
    assert_eq!(body["owner"], alice_id);
    assert_eq!(body["members"], json!([alice_id]));
}

#[tokio::test]
async fn owner_cannot_remove_themselves() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (group_id, _) = app.create_group(&alice, "Trip").await;

    let resp = app
        .post_json(
            &format!("/groups/{group_id}/remove_member"),
            json!({ "user_id": alice_id }),
            Some(&alice),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remove_non_member_is_404() {
    let app = TestApp::new().await;
    let (_, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (outsider_id, _) = app.signup_and_login("bob", "bob@example.com").await;
    let (group_id, _) = app.create_group(&alice, "Trip").await;

    let resp = app
        .post_json(
            &format!("/groups/{group_id}/remove_member"),
            json!({ "user_id": outsider_id }),
            Some(&alice),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rename_is_owner_only_and_rejects_blank() {
    let app = TestApp::new().await;
    let (_, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (_, bob) = app.signup_and_login("bob", "bob@example.com").await;
    let (group_id, code) = app.create_group(&alice, "Trip").await;
    app.post_json("/groups/join", json!({ "invite_code": code }), Some(&bob))
        .await;

    let resp = app
        .patch_json(
            &format!("/groups/{group_id}/rename"),
            json!({ "name": "Summer Trip" }),
            Some(&bob),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .patch_json(
            &format!("/groups/{group_id}/rename"),
            json!({ "name": "  " }),
            Some(&alice),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .patch_json(
            &format!("/groups/{group_id}/rename"),
            json!({ "name": "Summer Trip" }),
            Some(&alice),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["name"], "Summer Trip");
}

#[tokio::test]
async fn members_endpoint_flags_owner_as_admin() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (bob_id, bob) = app.signup_and_login("bob", "bob@example.com").await;
    let (group_id, code) = app.create_group(&alice, "Trip").await;
    app.post_json("/groups/join", json!({ "invite_code": code }), Some(&bob))
        .await;

    let resp = app
        .get(&format!("/groups/{group_id}/members"), Some(&alice))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let members = body.as_array().unwrap();
    assert_eq!(members.len(), 2);
    let alice_row = members.iter().find(|m| m["id"] == alice_id).unwrap();
    let bob_row = members.iter().find(|m| m["id"] == bob_id).unwrap();
    assert_eq!(alice_row["is_admin"], true);
    assert_eq!(bob_row["is_admin"], false);
    assert!(alice_row["avatar"].is_string());
}

#[tokio::test]
async fn list_groups_shows_only_own_groups() {
    let app = TestApp::new().await;
    let (_, alice) = app.signup_and_login("alice", "alice@example.com").await;
    let (_, bob) = app.signup_and_login("bob", "bob@example.com").await;
    app.create_group(&alice, "Alice's").await;
    let (bob_group, _) = app.create_group(&bob, "Bob's").await;

    let resp = app.get("/groups", Some(&bob)).await;
    let body = body_json(resp).await;
    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["id"], bob_group);
}

#[tokio::test]
async fn group_routes_require_auth() {
    let app = TestApp::new().await;
    let resp = app.get("/groups", None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
