#![allow(missing_docs)]

use axum::{body::to_bytes, response::Response};
use axum_test::TestServer;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::{
    AppState, PaginationConfig, PasswordHash, User, auth::TokenConfig, build_router,
    endpoints, user::create_user,
};

pub(crate) const TEST_PASSWORD: &str = "roostersgocockledoodledoo";

/// An app state backed by an in-memory database with a cheap bcrypt cost.
pub(crate) fn test_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(
        connection,
        &TokenConfig::new("access-secret", "refresh-secret"),
        PaginationConfig::default(),
    )
    .expect("Could not create app state")
    .with_password_cost(4)
}

pub(crate) fn test_server() -> TestServer {
    TestServer::new(build_router(test_state())).expect("Could not create test server.")
}

/// An in-memory database with all tables created.
pub(crate) fn test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    crate::initialize_db(&connection).expect("Could not initialize database");

    connection
}

/// Insert a user directly, skipping the password hashing.
pub(crate) fn create_test_user(email: &str, connection: &Connection) -> User {
    create_user(
        email,
        "Test User",
        PasswordHash::from_stored("hunter2".to_owned()),
        connection,
    )
    .expect("Could not create test user")
}

/// Register a user through the API and return their access token.
pub(crate) async fn register_user(server: &TestServer, email: &str) -> String {
    let response = server
        .post(endpoints::REGISTER)
        .json(&json!({ "email": email, "password": TEST_PASSWORD, "name": "Test User" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    body["data"]["accessToken"]
        .as_str()
        .expect("Register response has no access token")
        .to_owned()
}

/// The `data` field of a successful envelope.
pub(crate) fn data(body: &Value) -> &Value {
    assert_eq!(body["success"], true, "request failed: {body}");
    &body["data"]
}

pub(crate) async fn response_json<T: DeserializeOwned>(response: Response) -> T {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read response body");

    serde_json::from_slice(&body).expect("Response body is not valid JSON")
}
