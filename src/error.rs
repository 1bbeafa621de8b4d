//! Defines the app level error type and its conversion into the JSON response envelope.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    database_id::{AccountId, TransactionId}, response::ApiResponse, settlement::SettlementType,
};

/// The broad class of an [Error], sent to clients in the `error` field of a failed response.
///
/// Clients should switch on this value instead of matching error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request was malformed or broke a business rule.
    ValidationError,
    /// The resource does not exist or belongs to another user.
    NotFound,
    /// The request referenced another resource that cannot be used, e.g. an inactive account.
    InvalidReference,
    /// The request is missing a valid token, or the credentials were wrong.
    Unauthorized,
    /// Something went wrong on the server.
    Internal,
}

impl ErrorKind {
    /// The HTTP status code used for responses carrying this kind of error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::ValidationError | ErrorKind::InvalidReference => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request body, query or path could not be parsed, or a field had an invalid value.
    #[error("{0}")]
    Validation(String),

    /// The email address used to register is not a valid email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// A user with the email address already exists.
    #[error("a user with the email \"{0}\" already exists")]
    DuplicateEmail(String),

    /// The email and password combination did not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The bearer token is missing, malformed, expired or of the wrong kind.
    #[error("missing or invalid authorization token")]
    Unauthorized,

    /// The requested resource was not found.
    ///
    /// Resources owned by other users are reported as not found so that clients
    /// cannot learn whether another user's resource exists.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The account does not exist, is inactive or belongs to another user.
    #[error("account {0} does not exist or is inactive")]
    InvalidAccount(AccountId),

    /// A transfer used the same account as its source and destination.
    #[error("a transfer must move money between two different accounts")]
    SameAccountTransfer,

    /// A settlement already exists for the period.
    #[error("a {0} settlement for the period starting {1} already exists")]
    DuplicateSettlement(SettlementType, Date),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A JSON web token could not be created.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// A stored transfer has no destination account.
    #[error("transfer {0} has no destination account")]
    TransferWithoutDestination(TransactionId),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl Error {
    /// The class of the error as reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_)
            | Error::InvalidEmail(_)
            | Error::TooWeak(_)
            | Error::DuplicateEmail(_)
            | Error::DuplicateSettlement(_, _) => ErrorKind::ValidationError,
            Error::InvalidCredentials | Error::Unauthorized => ErrorKind::Unauthorized,
            Error::NotFound => ErrorKind::NotFound,
            Error::InvalidAccount(_) | Error::SameAccountTransfer => ErrorKind::InvalidReference,
            Error::HashingError(_)
            | Error::TokenCreation(_)
            | Error::TransferWithoutDestination(_)
            | Error::SqlError(_) => ErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<time::error::ComponentRange> for Error {
    fn from(value: time::error::ComponentRange) -> Self {
        Error::Validation(format!("invalid date: {value}"))
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();

        let message = match kind {
            // Internal errors are not intended to be shown to the client.
            ErrorKind::Internal => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            _ => self.to_string(),
        };

        (
            kind.status_code(),
            ApiResponse::<()>::failure(message, kind),
        )
            .into_response()
    }
}
