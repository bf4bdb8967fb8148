//! E2E tests for the follow toggle and its notification side effects

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn follow_toggle_round_trip() {
    let server = TestServer::new().await;

    let (ada_token, _ada_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_l")
        .await;
    let (_grace_token, grace_id) = server
        .signup_with_username("Grace", "grace@example.com", "@grace_h")
        .await;

    // Follow
    let response = server
        .client
        .post(server.url(&format!("/api/v1/users/{}/follow", grace_id)))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["following"], true);
    assert_eq!(body["followers"], 1);

    // Target's profile shows the counter
    let response = server
        .client
        .get(server.url(&format!("/api/v1/users/{}", grace_id)))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["followers"], 1);

    // Toggle back
    let response = server
        .client
        .post(server.url(&format!("/api/v1/users/{}/follow", grace_id)))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["following"], false);
    assert_eq!(body["followers"], 0);

    // Counters are exactly restored
    let response = server
        .client
        .get(server.url(&format!("/api/v1/users/{}", grace_id)))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["followers"], 0);
    assert_eq!(profile["following"], 0);
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let server = TestServer::new().await;

    let (token, user_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_l")
        .await;

    let response = server
        .client
        .post(server.url(&format!("/api/v1/users/{}/follow", user_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn follow_unknown_user_is_404() {
    let server = TestServer::new().await;

    let (token, _user_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_l")
        .await;

    let response = server
        .client
        .post(server.url("/api/v1/users/does-not-exist/follow"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn notifications_follow_the_toggle() {
    let server = TestServer::new().await;

    let (ada_token, ada_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_l")
        .await;
    let (grace_token, grace_id) = server
        .signup_with_username("Grace", "grace@example.com", "@grace_h")
        .await;

    // Ada follows Grace -> "follow" notification for Grace
    server
        .client
        .post(server.url(&format!("/api/v1/users/{}/follow", grace_id)))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();

    let response = server
        .client
        .get(server.url("/api/v1/notifications"))
        .bearer_auth(&grace_token)
        .send()
        .await
        .unwrap();
    let notifications: Value = response.json().await.unwrap();
    let list = notifications.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["kind"], "follow");
    assert_eq!(list[0]["seen"], false);
    assert_eq!(list[0]["from_user"]["id"], ada_id.as_str());
    assert_eq!(list[0]["from_user"]["username"], "@ada_l");

    // Grace follows back -> "follow_back" notification for Ada
    server
        .client
        .post(server.url(&format!("/api/v1/users/{}/follow", ada_id)))
        .bearer_auth(&grace_token)
        .send()
        .await
        .unwrap();

    let response = server
        .client
        .get(server.url("/api/v1/notifications"))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();
    let notifications: Value = response.json().await.unwrap();
    assert_eq!(notifications[0]["kind"], "follow_back");

    // Grace unfollows -> "unfollow" notification for Ada
    server
        .client
        .post(server.url(&format!("/api/v1/users/{}/follow", ada_id)))
        .bearer_auth(&grace_token)
        .send()
        .await
        .unwrap();

    let response = server
        .client
        .get(server.url("/api/v1/notifications"))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();
    let notifications: Value = response.json().await.unwrap();
    assert_eq!(notifications[0]["kind"], "unfollow");
}

#[tokio::test]
async fn follower_lists_carry_viewer_state() {
    let server = TestServer::new().await;

    let (ada_token, ada_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_l")
        .await;
    let (grace_token, grace_id) = server
        .signup_with_username("Grace", "grace@example.com", "@grace_h")
        .await;
    let (joan_token, joan_id) = server
        .signup_with_username("Joan", "joan@example.com", "@joan_c")
        .await;

    // Grace and Joan follow Ada; Joan also follows Grace
    for (token, target) in [
        (&grace_token, &ada_id),
        (&joan_token, &ada_id),
        (&joan_token, &grace_id),
    ] {
        server
            .client
            .post(server.url(&format!("/api/v1/users/{}/follow", target)))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
    }

    // Viewed by Joan, Ada's follower list flags Grace as followed
    let response = server
        .client
        .get(server.url(&format!("/api/v1/users/{}/followers", ada_id)))
        .bearer_auth(&joan_token)
        .send()
        .await
        .unwrap();
    let followers: Value = response.json().await.unwrap();
    let list = followers.as_array().unwrap();
    assert_eq!(list.len(), 2);

    let grace_entry = list
        .iter()
        .find(|entry| entry["id"] == grace_id.as_str())
        .unwrap();
    assert_eq!(grace_entry["followed_by_viewer"], true);

    // Joan's following list has both Ada and Grace
    let response = server
        .client
        .get(server.url(&format!("/api/v1/users/{}/following", joan_id)))
        .bearer_auth(&ada_token)
        .send()
        .await
        .unwrap();
    let following: Value = response.json().await.unwrap();
    assert_eq!(following.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn relationship_view_does_not_mutate() {
    let server = TestServer::new().await;

    let (ada_token, _ada_id) = server
        .signup_with_username("Ada", "ada@example.com", "@ada_l")
        .await;
    let (_grace_token, grace_id) = server
        .signup_with_username("Grace", "grace@example.com", "@grace_h")
        .await;

    for _ in 0..3 {
        let response = server
            .client
            .get(server.url(&format!("/api/v1/users/{}/relationship", grace_id)))
            .bearer_auth(&ada_token)
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["following"], false);
        assert_eq!(body["followers"], 0);
    }
}
