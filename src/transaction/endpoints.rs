//! Route handlers for transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::Response,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, PaginationConfig, UserID,
    database_id::TransactionId,
    db::lock_connection,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::{PageRequest, Paginated},
    response::{created, ok, ok_with_message},
    transaction::{
        core::{NewTransaction, TransactionPatch, get_transaction},
        query::{
            DEFAULT_RECENT_LIMIT, ListTransactionsQuery, get_recent_transactions,
            list_transactions,
        },
        service::{create_transaction, delete_transaction, update_transaction},
    },
};

/// The state needed for the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The config that controls how to page lists of transactions.
    pub pagination_config: PaginationConfig,
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pagination_config: state.pagination_config.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the recent transactions endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    /// How many transactions to return.
    pub limit: Option<u64>,
}

/// A route handler for listing transactions, with filters and pagination.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    ApiQuery(query): ApiQuery<ListTransactionsQuery>,
) -> Result<Response, Error> {
    let page = PageRequest::new(query.page, query.limit, &state.pagination_config)?;
    let filter = query.filter()?;

    let connection = lock_connection(&state.db_connection);
    let (transactions, total) = list_transactions(user_id, &filter, page, &connection)?;

    Ok(ok(Paginated::new(transactions, page, total)))
}

/// A route handler for the most recent transactions.
pub async fn recent_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let transactions = get_recent_transactions(
        user_id,
        query.limit.unwrap_or(DEFAULT_RECENT_LIMIT),
        &connection,
    )?;

    Ok(ok(transactions))
}

/// A route handler for creating a transaction and updating the account balances.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    ApiJson(new_transaction): ApiJson<NewTransaction>,
) -> Result<Response, Error> {
    let mut connection = lock_connection(&state.db_connection);
    let transaction = create_transaction(user_id, new_transaction, &mut connection)?;

    Ok(created(transaction, "Transaction created successfully"))
}

/// A route handler for getting a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(transaction_id): ApiPath<TransactionId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_transaction(transaction_id, user_id, &connection)?))
}

/// A route handler for editing a transaction and updating the account balances.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(transaction_id): ApiPath<TransactionId>,
    ApiJson(patch): ApiJson<TransactionPatch>,
) -> Result<Response, Error> {
    let mut connection = lock_connection(&state.db_connection);
    let transaction = update_transaction(transaction_id, user_id, patch, &mut connection)?;

    Ok(ok_with_message(transaction, "Transaction updated successfully"))
}

/// A route handler for deleting a transaction and reverting its effect on the account balances.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(transaction_id): ApiPath<TransactionId>,
) -> Result<Response, Error> {
    let mut connection = lock_connection(&state.db_connection);
    delete_transaction(transaction_id, user_id, &mut connection)?;

    Ok(ok_with_message((), "Transaction deleted successfully"))
}
