use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chatterbox::{AppState, DocumentStore};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let store = DocumentStore::memory().await.unwrap();
    let state = AppState::new(&store).await.unwrap();
    chatterbox::app(state, Duration::from_secs(5))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "test.local");
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_room(app: &Router, name: &str) -> String {
    let (status, room) = send(app, Method::POST, "/rooms", Some(json!({ "room": { "name": name } }))).await;
    assert_eq!(status, StatusCode::CREATED);
    room["id"].as_str().unwrap().to_owned()
}

async fn post(app: &Router, room_id: &str, text: &str) -> Value {
    let (status, room) = send(
        app,
        Method::POST,
        &format!("/rooms/{room_id}/messages"),
        Some(json!({ "message": { "type": "text", "text": text, "author": "Alice", "authorID": "u1" } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    room
}

#[tokio::test]
async fn created_room_can_be_fetched() {
    let app = app().await;
    let (status, created) = send(&app, Method::POST, "/rooms", Some(json!({ "room": { "name": "lobby" } }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let id = created["id"].as_str().unwrap();
    assert_eq!(created["name"], "lobby");
    assert_eq!(created["chatters"], json!([]));
    assert_eq!(created["messages"], json!([]));
    assert_eq!(created["url"], format!("http://test.local/rooms/{id}"));

    let (status, fetched) = send(&app, Method::GET, &format!("/rooms/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn rooms_are_listed_newest_first() {
    let app = app().await;
    let a = create_room(&app, "a").await;
    let b = create_room(&app, "b").await;

    let (status, rooms) = send(&app, Method::GET, "/rooms", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = rooms.as_array().unwrap().iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, [b.as_str(), a.as_str()]);
}

#[tokio::test]
async fn missing_room_is_404_with_error_body() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/rooms/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn create_without_name_is_bad_request() {
    let app = app().await;
    let (status, body) = send(&app, Method::POST, "/rooms", Some(json!({ "room": {} }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn join_then_leave() {
    let app = app().await;
    let id = create_room(&app, "lobby").await;

    let (status, room) = send(&app, Method::PUT, &format!("/rooms/{id}/chatters/u1/chattername/Alice%20Smith"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(room["chatters"], json!([{ "id": "u1", "name": "Alice Smith" }]));

    let (_, fetched) = send(&app, Method::GET, &format!("/rooms/{id}"), None).await;
    assert_eq!(fetched["chatters"], json!([{ "id": "u1", "name": "Alice Smith" }]));

    let (status, room) = send(&app, Method::DELETE, &format!("/rooms/{id}/chatters/u1"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(room["chatters"], json!([]));

    let (status, _) = send(&app, Method::PUT, "/rooms/nope/chatters/u1/chattername/Alice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn messages_since_cursor() {
    let app = app().await;
    let id = create_room(&app, "lobby").await;
    for text in ["m1", "m2", "m3"] {
        post(&app, &id, text).await;
    }

    let (status, all) = send(&app, Method::GET, &format!("/rooms/{id}/messages"), None).await;
    assert_eq!(status, StatusCode::OK);
    let all = all.as_array().unwrap().clone();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0]["type"], "text");
    assert_eq!(all[0]["authorID"], "u1");

    let m1 = all[0]["id"].as_str().unwrap();
    let (status, later) = send(&app, Method::GET, &format!("/rooms/{id}/messages?since={m1}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(later, json!([all[1], all[2]]));

    let (status, everything) = send(&app, Method::GET, &format!("/rooms/{id}/messages?since="), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(everything.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_cursor_is_not_found() {
    let app = app().await;
    let id = create_room(&app, "lobby").await;
    post(&app, &id, "m1").await;

    let (status, body) = send(&app, Method::GET, &format!("/rooms/{id}/messages?since=nope"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn post_without_payload() {
    let app = app().await;
    let id = create_room(&app, "lobby").await;

    let (status, _) = send(&app, Method::POST, &format!("/rooms/{id}/messages"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/rooms/nope/messages", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, &format!("/rooms/{id}/messages"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_room_and_delete_all() {
    let app = app().await;
    let a = create_room(&app, "a").await;
    create_room(&app, "b").await;
    create_room(&app, "c").await;

    let (status, body) = send(&app, Method::DELETE, &format!("/rooms/{a}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
    let (status, _) = send(&app, Method::DELETE, &format!("/rooms/{a}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::DELETE, "/rooms", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "removed": 2 }));

    let (_, rooms) = send(&app, Method::GET, "/rooms", None).await;
    assert_eq!(rooms, json!([]));
}

#[tokio::test]
async fn browser_form_creates_and_redirects() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/rooms")
        .header(header::ACCEPT, "text/html,*/*;q=0.8")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=tea+room"))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_owned();
    assert!(location.starts_with("/rooms/"));

    let request = Request::builder()
        .uri(&location)
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));

    let page = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(page.to_vec()).unwrap();
    assert!(page.contains("<h1>tea room</h1>"));
}

#[tokio::test]
async fn form_message_post() {
    let app = app().await;
    let id = create_room(&app, "lobby").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/rooms/{id}/messages"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("type=text&text=hello+there&author=Bob&authorID=u2"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let (_, messages) = send(&app, Method::GET, &format!("/rooms/{id}/messages"), None).await;
    assert_eq!(messages[0]["text"], "hello there");
    assert_eq!(messages[0]["author"], "Bob");
}

#[tokio::test]
async fn unsupported_content_type_is_rejected() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/rooms")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("lobby"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn users_crud() {
    let app = app().await;
    let (status, ann) = send(&app, Method::POST, "/users", Some(json!({ "user": { "name": "Ann" } }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = ann["id"].as_str().unwrap();
    assert_eq!(ann["url"], format!("http://test.local/users/{id}"));

    let (status, fetched) = send(&app, Method::GET, &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, ann);

    let (_, users) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(users, json!([ann]));

    let (status, _) = send(&app, Method::DELETE, &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn index_counts_resources() {
    let app = app().await;
    create_room(&app, "lobby").await;

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rooms"]["count"], 1);
    assert_eq!(body["users"]["count"], 0);
}
