//! E2E tests for profile editing, search, and counter reconciliation

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn profile_update_round_trip() {
    let server = TestServer::new().await;

    let (token, _user_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_l")
        .await;

    let response = server
        .client
        .patch(server.url("/api/v1/users/me"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "first_name": "Augusta",
            "surname": "King",
            "bio": "first programmer",
            "phone": "+44 20 0000",
            "username": "@ada_l"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["first_name"], "Augusta");
    assert_eq!(body["bio"], "first programmer");
    assert_eq!(body["phone"], "+44 20 0000");

    // Markup in the bio is stripped before storage
    let response = server
        .client
        .patch(server.url("/api/v1/users/me"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "first_name": "Augusta",
            "surname": "King",
            "bio": "hello <img src=x onerror=alert(1)> world",
            "phone": "",
            "username": "@ada_l"
        }))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let bio = body["bio"].as_str().unwrap();
    assert!(!bio.contains("<img"));
    assert!(bio.contains("hello"));
}

#[tokio::test]
async fn public_profile_hides_private_fields() {
    let server = TestServer::new().await;

    let (_ada_token, ada_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_l")
        .await;
    let (grace_token, _grace_id) = server
        .signup_with_username("Grace", "grace@example.com", "@grace_h")
        .await;

    let response = server
        .client
        .get(server.url(&format!("/api/v1/users/{}", ada_id)))
        .bearer_auth(&grace_token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "@ada_l");
    assert!(body.get("email").is_none());
    assert!(body.get("phone").is_none());
}

#[tokio::test]
async fn search_matches_username_substring() {
    let server = TestServer::new().await;

    let (token, ada_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_lovelace")
        .await;
    server
        .signup_with_username("Grace", "grace@example.com", "@grace_hopper")
        .await;

    // Leading @ is ignored, match is case-insensitive
    let response = server
        .client
        .get(server.url("/api/v1/users/search?q=@ADA"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let hits: Value = response.json().await.unwrap();
    let list = hits.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], ada_id.as_str());

    // Empty query returns nothing
    let response = server
        .client
        .get(server.url("/api/v1/users/search?q="))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let hits: Value = response.json().await.unwrap();
    assert!(hits.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn reconciliation_repairs_manual_drift() {
    let server = TestServer::new().await;

    let (ada_token, _ada_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_l")
        .await;
    let (_grace_token, grace_id) = server
        .signup_with_username("Grace", "grace@example.com", "@grace_h")
        .await;

    server
        .client
        .post(server.url(&format!("/api/v1/users/{}/follow", grace_id)))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();

    // Transactional writes keep everything consistent
    assert_eq!(server.state.graph.reconcile_counters().await.unwrap(), 0);
}
