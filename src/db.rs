//! Database initialization and helpers shared by the table modules.

use std::{
    str::FromStr,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{Connection, Row, Transaction as SqlTransaction, types::Type};

use crate::{
    Error, account::create_account_table, bill::create_bill_table, budget::create_budget_table,
    goal::create_goal_table, settlement::create_settlement_table,
    transaction::create_transaction_table, user::create_user_table,
};

/// Create the tables for the domain models if they do not exist.
///
/// Foreign key enforcement is switched on for `connection`.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_goal_table(&transaction)?;
    create_bill_table(&transaction)?;
    create_settlement_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the lock for the shared database connection.
///
/// A lock poisoned by a panicking request is recovered. An SQL transaction that was open when
/// the request panicked has already been rolled back when it was dropped.
pub fn lock_connection(connection: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    connection.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Recovering the database lock after a request panicked");
        connection.clear_poison();
        poisoned.into_inner()
    })
}

/// Read a TEXT column and parse it, e.g. into a decimal amount or an enum.
pub fn get_parsed<T>(row: &Row, index: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(index)?;

    text.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

/// A string stored in the database did not match any variant of an enum.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown {kind} \"{value}\"")]
pub struct ParseEnumError {
    /// What was being parsed, e.g. "account type".
    pub kind: &'static str,
    /// The offending value.
    pub value: String,
}

/// Whether an SQL error was caused by a UNIQUE constraint.
pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        )
    )
}
