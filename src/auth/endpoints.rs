//! Route handlers for registering, logging in, refreshing tokens and fetching the current user.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::Response,
};
use email_address::EmailAddress;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, User, UserID, ValidatedPassword,
    auth::token::{TokenKeys, TokenKind, TokenPair},
    db::lock_connection,
    extract::ApiJson,
    response::{created, ok},
    user::{create_user, get_user_by_email, get_user_by_id},
};

/// The state needed by the auth endpoints.
#[derive(Clone)]
pub struct AuthEndpointState {
    /// The keys for signing and verifying tokens.
    pub token_keys: TokenKeys,
    /// The bcrypt cost for new password hashes.
    pub password_cost: u32,
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            token_keys: state.token_keys.clone(),
            password_cost: state.password_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// The email address to log in with.
    pub email: String,
    /// The plain text password.
    pub password: String,
    /// The display name.
    pub name: String,
}

/// The body of a log-in request.
#[derive(Debug, Deserialize)]
pub struct LogInRequest {
    /// The registered email address.
    pub email: String,
    /// The plain text password.
    pub password: String,
}

/// The body of a token refresh request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// A refresh token issued at registration, log-in or a previous refresh.
    pub refresh_token: String,
}

/// A user together with a fresh token pair.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The authenticated user.
    pub user: User,
    /// The tokens for the session.
    #[serde(flatten)]
    pub tokens: TokenPair,
}

fn normalize_email(raw_email: &str) -> Result<String, Error> {
    let email = raw_email.trim();

    if !EmailAddress::is_valid(email) {
        return Err(Error::InvalidEmail(email.to_owned()));
    }

    Ok(email.to_lowercase())
}

/// A route handler for registering a new user.
///
/// Responds with 201 Created, the new user and a token pair.
pub async fn register(
    State(state): State<AuthEndpointState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Response, Error> {
    let email = normalize_email(&request.email)?;
    let name = request.name.trim();

    if name.is_empty() {
        return Err(Error::Validation("name must not be empty".to_owned()));
    }

    let password = ValidatedPassword::new(&request.password, &[&email, name])?;
    let password_hash = PasswordHash::new(&password, state.password_cost)?;

    let user = {
        let connection = lock_connection(&state.db_connection);
        create_user(&email, name, password_hash, &connection)?
    };
    tracing::info!("Registered user {}", user.id);

    let tokens = state.token_keys.issue(user.id)?;

    Ok(created(
        AuthResponse { user, tokens },
        "User registered successfully",
    ))
}

/// A route handler for logging in with an email and password.
pub async fn log_in(
    State(state): State<AuthEndpointState>,
    ApiJson(request): ApiJson<LogInRequest>,
) -> Result<Response, Error> {
    let email = request.email.trim().to_lowercase();

    let user = {
        let connection = lock_connection(&state.db_connection);
        get_user_by_email(&email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    if !user.password_hash.verify(&request.password)? {
        tracing::debug!("Wrong password for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let tokens = state.token_keys.issue(user.id)?;

    Ok(ok(AuthResponse { user, tokens }))
}

/// A route handler for exchanging a refresh token for a new token pair.
pub async fn refresh(
    State(state): State<AuthEndpointState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Response, Error> {
    let user_id = state
        .token_keys
        .verify(&request.refresh_token, TokenKind::Refresh)?;

    {
        let connection = lock_connection(&state.db_connection);
        get_user_by_id(user_id, &connection).map_err(|error| match error {
            Error::NotFound => Error::Unauthorized,
            error => error,
        })?;
    }

    Ok(ok(state.token_keys.issue(user_id)?))
}

/// A route handler for getting the currently authenticated user.
pub async fn me(
    State(state): State<AuthEndpointState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let user = get_user_by_id(user_id, &connection)?;

    Ok(ok(user))
}
