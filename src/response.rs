//! The uniform JSON envelope that every endpoint responds with.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::ErrorKind;

/// The body of every API response: `{ success, data?, message?, error? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// The payload of a successful request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// A human readable description of the outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The class of error for failed requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// A failed response with a message and error kind.
    pub fn failure(message: String, kind: ErrorKind) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            error: Some(kind),
        }
    }

    /// Attach a human readable message.
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_owned());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Respond with 200 OK and `data`.
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, ApiResponse::success(data)).into_response()
}

/// Respond with 200 OK, `data` and a message, used for updates and deletes.
pub fn ok_with_message<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::OK,
        ApiResponse::success(data).with_message(message),
    )
        .into_response()
}

/// Respond with 201 Created, the new resource and a message.
pub fn created<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::CREATED,
        ApiResponse::success(data).with_message(message),
    )
        .into_response()
}
