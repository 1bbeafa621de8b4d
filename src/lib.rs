//! A personal finance tracker.
//!
//! This library provides a JSON REST API for tracking accounts, transactions,
//! budgets, bills, savings goals and period settlements, plus analytics over a
//! user's transactions.
//!
//! Account balances are derived from transactions: creating, editing or
//! deleting a transaction applies or reverts its effect on the accounts it
//! touches inside a single SQLite transaction.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod account;
mod analytics;
mod app_state;
mod auth;
mod bill;
mod budget;
mod calendar;
mod database_id;
mod db;
mod endpoints;
mod error;
mod extract;
mod goal;
mod logging;
mod pagination;
mod password;
mod response;
mod routing;
mod settlement;
mod transaction;
mod user;
mod validate;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::TokenConfig;
pub use budget::record_spending;
pub use db::initialize as initialize_db;
pub use error::{Error, ErrorKind};
pub use goal::record_contribution_for_category;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use password::{PasswordHash, ValidatedPassword};
pub use response::ApiResponse;
pub use routing::build_router;
pub use user::{User, UserID};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
