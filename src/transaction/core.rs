//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, ToSql, types::ToSqlOutput};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, UserID,
    database_id::{AccountId, TransactionId},
    db::{ParseEnumError, get_parsed},
};

// ============================================================================
// MODELS
// ============================================================================

/// Which way money moves in a transaction.
///
/// Amounts are always positive, the direction comes from the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money earned into the source account.
    Income,
    /// Money spent from the source account.
    Expense,
    /// Money moved from the source account to the destination account.
    Transfer,
    /// A payment towards a debt, taken from the source account.
    Liability,
}

impl TransactionType {
    /// The name used in JSON and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Transfer => "transfer",
            TransactionType::Liability => "liability",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "transfer" => Ok(TransactionType::Transfer),
            "liability" => Ok(TransactionType::Liability),
            other => Err(ParseEnumError {
                kind: "transaction type",
                value: other.to_owned(),
            }),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

/// A stored income, expense, transfer or liability payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// Which way the money moves.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The positive amount of money moved.
    pub amount: Decimal,
    /// The spending or income category, e.g. "Groceries".
    pub category: String,
    /// Free text notes.
    pub description: String,
    /// When the transaction happened.
    pub date: Date,
    /// The account money comes from, or goes into for income.
    pub account_id: AccountId,
    /// The account money goes into, only set for transfers.
    pub to_account_id: Option<AccountId>,
}

/// The request body for creating a transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// Which way the money moves.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The positive amount of money moved.
    pub amount: Decimal,
    /// The spending or income category.
    pub category: String,
    /// Free text notes, empty if omitted.
    #[serde(default)]
    pub description: String,
    /// When the transaction happened, today if omitted.
    pub date: Option<Date>,
    /// The source account.
    pub account_id: AccountId,
    /// The destination account for transfers.
    pub to_account_id: Option<AccountId>,
}

/// The request body for editing a transaction. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    /// The new type.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// The new amount.
    pub amount: Option<Decimal>,
    /// The new category.
    pub category: Option<String>,
    /// The new description.
    pub description: Option<String>,
    /// The new date.
    pub date: Option<Date>,
    /// The new source account.
    pub account_id: Option<AccountId>,
    /// The new destination account, only allowed when the result is a transfer.
    pub to_account_id: Option<AccountId>,
}

/// The fields of a transaction before it is written to the database.
///
/// A draft only exists in a validated state, see [TransactionDraft::new] and
/// [TransactionDraft::merge].
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub(super) transaction_type: TransactionType,
    pub(super) amount: Decimal,
    pub(super) category: String,
    pub(super) description: String,
    pub(super) date: Date,
    pub(super) account_id: AccountId,
    pub(super) to_account_id: Option<AccountId>,
}

impl TransactionDraft {
    /// Validate a new transaction, dating it `today` if it has no date.
    ///
    /// # Errors
    /// Returns [Error::Validation] for a non-positive amount, an empty category or a
    /// destination that does not fit the type, or [Error::SameAccountTransfer] for a transfer
    /// into its own source account.
    pub fn new(new_transaction: NewTransaction, today: Date) -> Result<Self, Error> {
        Self {
            transaction_type: new_transaction.transaction_type,
            amount: new_transaction.amount,
            category: new_transaction.category,
            description: new_transaction.description,
            date: new_transaction.date.unwrap_or(today),
            account_id: new_transaction.account_id,
            to_account_id: new_transaction.to_account_id,
        }
        .validate()
    }

    /// Apply `patch` on top of `original` and validate the result.
    ///
    /// The destination account is kept for transfers and cleared for any other type.
    ///
    /// # Errors
    /// Same as [TransactionDraft::new], and [Error::Validation] if the patch sets a
    /// destination on a transaction that is not a transfer.
    pub fn merge(original: &Transaction, patch: TransactionPatch) -> Result<Self, Error> {
        let transaction_type = patch.transaction_type.unwrap_or(original.transaction_type);

        let to_account_id = match transaction_type {
            TransactionType::Transfer => patch.to_account_id.or(original.to_account_id),
            _ if patch.to_account_id.is_some() => {
                return Err(Error::Validation(format!(
                    "only transfers may have a destination account, not {transaction_type}"
                )));
            }
            _ => None,
        };

        Self {
            transaction_type,
            amount: patch.amount.unwrap_or(original.amount),
            category: patch.category.unwrap_or_else(|| original.category.clone()),
            description: patch
                .description
                .unwrap_or_else(|| original.description.clone()),
            date: patch.date.unwrap_or(original.date),
            account_id: patch.account_id.unwrap_or(original.account_id),
            to_account_id,
        }
        .validate()
    }

    fn validate(mut self) -> Result<Self, Error> {
        if self.amount <= Decimal::ZERO {
            return Err(Error::Validation(
                "amount must be greater than zero".to_owned(),
            ));
        }

        self.category = self.category.trim().to_owned();
        if self.category.is_empty() {
            return Err(Error::Validation("category must not be empty".to_owned()));
        }

        match (self.transaction_type, self.to_account_id) {
            (TransactionType::Transfer, None) => Err(Error::Validation(
                "a transfer requires a destination account".to_owned(),
            )),
            (TransactionType::Transfer, Some(to_account_id))
                if to_account_id == self.account_id =>
            {
                Err(Error::SameAccountTransfer)
            }
            (TransactionType::Transfer, Some(_)) => Ok(self),
            (transaction_type, Some(_)) => Err(Error::Validation(format!(
                "only transfers may have a destination account, not {transaction_type}"
            ))),
            (_, None) => Ok(self),
        }
    }

    /// The accounts the transaction will touch, source first.
    pub fn account_ids(&self) -> impl Iterator<Item = AccountId> {
        std::iter::once(self.account_id).chain(self.to_account_id)
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            type TEXT NOT NULL,
            amount TEXT NOT NULL,
            category TEXT NOT NULL,
            description TEXT NOT NULL,
            date TEXT NOT NULL,
            account_id INTEGER NOT NULL,
            to_account_id INTEGER,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE,
            FOREIGN KEY(to_account_id) REFERENCES account(id) ON UPDATE CASCADE
        )",
        (),
    )?;

    // Improve performance of the per-user date ordering used by every list query.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date)",
        (),
    )?;

    Ok(())
}

pub(super) const SELECT_TRANSACTION: &str = "SELECT id, user_id, type, amount, category, \
    description, date, account_id, to_account_id FROM \"transaction\"";

/// Map a row selected with [SELECT_TRANSACTION] to a [Transaction].
pub(super) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        transaction_type: get_parsed(row, 2)?,
        amount: get_parsed(row, 3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        date: row.get(6)?,
        account_id: row.get(7)?,
        to_account_id: row.get(8)?,
    })
}

/// Write a validated draft as a new row. Balances are not touched.
pub(super) fn insert_transaction(
    user_id: UserID,
    draft: TransactionDraft,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection.execute(
        "INSERT INTO \"transaction\"
            (user_id, type, amount, category, description, date, account_id, to_account_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            user_id.as_i64(),
            draft.transaction_type,
            draft.amount.to_string(),
            &draft.category,
            &draft.description,
            draft.date,
            draft.account_id,
            draft.to_account_id,
        ),
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        user_id,
        transaction_type: draft.transaction_type,
        amount: draft.amount,
        category: draft.category,
        description: draft.description,
        date: draft.date,
        account_id: draft.account_id,
        to_account_id: draft.to_account_id,
    })
}

/// Overwrite an existing row with a validated draft. Balances are not touched.
pub(super) fn overwrite_transaction(
    original: &Transaction,
    draft: TransactionDraft,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection.execute(
        "UPDATE \"transaction\"
         SET type = ?1, amount = ?2, category = ?3, description = ?4, date = ?5,
             account_id = ?6, to_account_id = ?7
         WHERE id = ?8 AND user_id = ?9",
        (
            draft.transaction_type,
            draft.amount.to_string(),
            &draft.category,
            &draft.description,
            draft.date,
            draft.account_id,
            draft.to_account_id,
            original.id,
            original.user_id.as_i64(),
        ),
    )?;

    Ok(Transaction {
        id: original.id,
        user_id: original.user_id,
        transaction_type: draft.transaction_type,
        amount: draft.amount,
        category: draft.category,
        description: draft.description,
        date: draft.date,
        account_id: draft.account_id,
        to_account_id: draft.to_account_id,
    })
}

/// Remove a row. Balances are not touched.
pub(super) fn remove_transaction(
    transaction: &Transaction,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (transaction.id, transaction.user_id.as_i64()),
    )?;

    Ok(())
}

/// Retrieve a transaction owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to another user.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!("{SELECT_TRANSACTION} WHERE id = ?1 AND user_id = ?2"))?
        .query_row((id, user_id.as_i64()), map_transaction_row)
        .map_err(|error| error.into())
}
