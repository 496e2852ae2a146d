mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, spawn_app};
use serde_json::{Value, json};
use std::time::Duration;

async fn send(app: &TestApp, username: &str, content: &str) -> StatusCode {
    app.post(
        "/api/send-message",
        json!({"username": username, "content": content}),
    )
    .await
    .status
}

async fn inbox(app: &TestApp, cookie: &str) -> Vec<Value> {
    let response = app
        .request(Method::GET, "/api/get-messages", None, Some(cookie))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.json);
    response.json["messages"].as_array().unwrap().clone()
}

fn contents(messages: &[Value]) -> Vec<&str> {
    messages
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn messages_are_listed_newest_first() {
    let app = spawn_app();
    let cookie = app.signed_in_user("alice", "alice@example.com").await;

    assert!(inbox(&app, &cookie).await.is_empty());

    for content in ["first", "second", "third"] {
        assert_eq!(send(&app, "alice", content).await, StatusCode::CREATED);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let messages = inbox(&app, &cookie).await;
    assert_eq!(contents(&messages), vec!["third", "second", "first"]);
    assert!(messages[0]["id"].as_str().is_some());
    assert!(messages[0]["createdAt"].as_str().is_some());
}

#[tokio::test]
async fn deleting_removes_only_that_message() {
    let app = spawn_app();
    let cookie = app.signed_in_user("alice", "alice@example.com").await;

    for content in ["first", "second", "third"] {
        send(&app, "alice", content).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let messages = inbox(&app, &cookie).await;
    let middle = messages[1]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/delete-message/{middle}"),
            None,
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let messages = inbox(&app, &cookie).await;
    assert_eq!(contents(&messages), vec!["third", "first"]);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/delete-message/{middle}"),
            None,
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cannot_delete_someone_elses_message() {
    let app = spawn_app();
    let alice = app.signed_in_user("alice", "alice@example.com").await;
    let bob = app.signed_in_user("bob", "bob@example.com").await;

    send(&app, "alice", "for alice").await;
    let id = inbox(&app, &alice).await[0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/delete-message/{id}"),
            None,
            Some(&bob),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(inbox(&app, &alice).await.len(), 1);
}

#[tokio::test]
async fn not_accepting_recipient_is_forbidden() {
    let app = spawn_app();
    let cookie = app.signed_in_user("alice", "alice@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/accept-messages",
            Some(json!({"acceptMessages": false})),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .post(
            "/api/send-message",
            json!({"username": "alice", "content": "hello"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json["message"], "User is not accepting messages");
    assert!(inbox(&app, &cookie).await.is_empty());
}

#[tokio::test]
async fn unknown_or_pending_recipient_is_not_found() {
    let app = spawn_app();
    assert_eq!(send(&app, "ghost", "hello").await, StatusCode::NOT_FOUND);

    app.sign_up("pending", "pending@example.com", "hunter22").await;
    assert_eq!(send(&app, "pending", "hello").await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn message_content_is_validated() {
    let app = spawn_app();
    let cookie = app.signed_in_user("alice", "alice@example.com").await;

    assert_eq!(send(&app, "alice", "   ").await, StatusCode::BAD_REQUEST);
    assert_eq!(
        send(&app, "alice", &"x".repeat(301)).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(send(&app, "alice", "  trimmed  ").await, StatusCode::CREATED);

    let messages = inbox(&app, &cookie).await;
    assert_eq!(contents(&messages), vec!["trimmed"]);
}

#[tokio::test]
async fn inbox_requires_a_session() {
    let app = spawn_app();

    let response = app
        .request(Method::GET, "/api/get-messages", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json["message"], "Not authenticated");

    let response = app
        .request(Method::DELETE, "/api/delete-message/abc", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
