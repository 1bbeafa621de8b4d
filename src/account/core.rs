//! Account types and the database functions for managing accounts.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, ToSql, types::ToSqlOutput};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserID,
    database_id::AccountId,
    db::{ParseEnumError, get_parsed},
    validate::add_amount,
};

/// The currency used when an account is created without one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// What kind of account holds the money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    /// Physical cash.
    Cash,
    /// A bank account, e.g. checking or savings.
    Bank,
    /// A credit card, usually with a negative balance.
    CreditCard,
    /// A brokerage or retirement account.
    Investment,
    /// Money owed, e.g. a mortgage.
    Loan,
}

impl AccountType {
    /// The name used in JSON and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Cash => "cash",
            AccountType::Bank => "bank",
            AccountType::CreditCard => "credit-card",
            AccountType::Investment => "investment",
            AccountType::Loan => "loan",
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(AccountType::Cash),
            "bank" => Ok(AccountType::Bank),
            "credit-card" => Ok(AccountType::CreditCard),
            "investment" => Ok(AccountType::Investment),
            "loan" => Ok(AccountType::Loan),
            other => Err(ParseEnumError {
                kind: "account type",
                value: other.to_owned(),
            }),
        }
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

/// Somewhere a user keeps money.
///
/// The balance is only changed by the transactions that reference the account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The display name.
    pub name: String,
    /// What kind of account this is.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// The current balance.
    pub balance: Decimal,
    /// The ISO 4217 currency code.
    pub currency: String,
    /// False once the account has been deleted.
    pub is_active: bool,
}

/// The data for creating an account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    /// The display name.
    pub name: String,
    /// What kind of account this is.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// The opening balance, zero if omitted.
    pub balance: Option<Decimal>,
    /// The ISO 4217 currency code, [DEFAULT_CURRENCY] if omitted.
    pub currency: Option<String>,
}

/// The fields of an account that may be changed after creation.
///
/// The balance is deliberately absent and sending it is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccountPatch {
    /// The new display name.
    pub name: Option<String>,
    /// The new account type.
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
    /// The new currency code.
    pub currency: Option<String>,
    /// Reactivate or deactivate the account.
    pub is_active: Option<bool>,
}

/// Totals for one account type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTypeTotal {
    /// The account type.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// The summed balance of the active accounts of this type.
    pub total: Decimal,
    /// The number of active accounts of this type.
    pub count: usize,
}

/// Totals over a user's active accounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    /// The summed balance of all active accounts.
    pub total_balance: Decimal,
    /// The number of active accounts.
    pub account_count: usize,
    /// Totals per account type, for the types the user has.
    pub by_type: Vec<AccountTypeTotal>,
}

/// Create the account table.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            balance TEXT NOT NULL,
            currency TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_user ON account(user_id)",
        (),
    )?;

    Ok(())
}

fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        account_type: get_parsed(row, 3)?,
        balance: get_parsed(row, 4)?,
        currency: row.get(5)?,
        is_active: row.get(6)?,
    })
}

const SELECT_ACCOUNT: &str =
    "SELECT id, user_id, name, type, balance, currency, is_active FROM account";

fn validate_name(name: &str) -> Result<String, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::Validation("account name must not be empty".to_owned()));
    }

    Ok(name.to_owned())
}

fn normalize_currency(currency: &str) -> Result<String, Error> {
    let currency = currency.trim();

    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::Validation(format!(
            "\"{currency}\" is not a three letter currency code"
        )));
    }

    Ok(currency.to_ascii_uppercase())
}

/// Create a new account for `user_id`.
///
/// # Errors
/// Returns [Error::Validation] if the name is empty or the currency is not a three letter code.
pub fn create_account(
    user_id: UserID,
    new_account: &NewAccount,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = validate_name(&new_account.name)?;
    let currency = normalize_currency(
        new_account
            .currency
            .as_deref()
            .unwrap_or(DEFAULT_CURRENCY),
    )?;
    let balance = new_account.balance.unwrap_or(Decimal::ZERO);

    connection.execute(
        "INSERT INTO account (user_id, name, type, balance, currency, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        (
            user_id.as_i64(),
            &name,
            new_account.account_type,
            balance.to_string(),
            &currency,
        ),
    )?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        user_id,
        name,
        account_type: new_account.account_type,
        balance,
        currency,
        is_active: true,
    })
}

/// Get an account owned by `user_id`, whether active or not.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to another user.
pub fn get_account(
    id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(&format!("{SELECT_ACCOUNT} WHERE id = ?1 AND user_id = ?2"))?
        .query_row((id, user_id.as_i64()), map_row_to_account)
        .map_err(|error| error.into())
}

/// Get an account that a transaction or bill may reference.
///
/// # Errors
/// Returns [Error::InvalidAccount] if the account does not exist, is inactive or belongs to
/// another user.
pub fn get_active_account(
    id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    match get_account(id, user_id, connection) {
        Ok(account) if account.is_active => Ok(account),
        Ok(_) | Err(Error::NotFound) => Err(Error::InvalidAccount(id)),
        Err(error) => Err(error),
    }
}

/// List the accounts of `user_id` ordered by name.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn list_accounts(
    user_id: UserID,
    include_inactive: bool,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    let active_filter = if include_inactive {
        ""
    } else {
        " AND is_active = 1"
    };

    connection
        .prepare(&format!(
            "{SELECT_ACCOUNT} WHERE user_id = ?1{active_filter} ORDER BY name ASC, id ASC"
        ))?
        .query_map([user_id.as_i64()], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Apply `patch` to an account and return the updated account.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to another user, or
/// [Error::Validation] if a field is invalid.
pub fn update_account(
    id: AccountId,
    user_id: UserID,
    patch: &AccountPatch,
    connection: &Connection,
) -> Result<Account, Error> {
    let mut account = get_account(id, user_id, connection)?;

    if let Some(name) = &patch.name {
        account.name = validate_name(name)?;
    }
    if let Some(account_type) = patch.account_type {
        account.account_type = account_type;
    }
    if let Some(currency) = &patch.currency {
        account.currency = normalize_currency(currency)?;
    }
    if let Some(is_active) = patch.is_active {
        account.is_active = is_active;
    }

    connection.execute(
        "UPDATE account SET name = ?1, type = ?2, currency = ?3, is_active = ?4
         WHERE id = ?5 AND user_id = ?6",
        (
            &account.name,
            account.account_type,
            &account.currency,
            account.is_active,
            id,
            user_id.as_i64(),
        ),
    )?;

    Ok(account)
}

/// Soft delete an account. Its transactions and balance are kept.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to another user.
pub fn deactivate_account(
    id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET is_active = 0 WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Add `delta` to the balance of an account, which may be negative.
///
/// Inactive accounts are still adjusted so that deleting an old transaction
/// restores the balance it changed.
///
/// # Errors
/// Returns [Error::InvalidAccount] if the account does not exist or belongs to another user.
pub fn adjust_balance(
    id: AccountId,
    user_id: UserID,
    delta: Decimal,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let account = get_account(id, user_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidAccount(id),
        error => error,
    })?;

    let balance = account
        .balance
        .checked_add(delta)
        .ok_or_else(|| Error::Validation("account balance is out of range".to_owned()))?;

    connection.execute(
        "UPDATE account SET balance = ?1 WHERE id = ?2 AND user_id = ?3",
        (balance.to_string(), id, user_id.as_i64()),
    )?;

    Ok(balance)
}

/// Sum the balances of the active accounts of `user_id`.
///
/// Balances in different currencies are added as is.
///
/// # Errors
/// Returns an error if the SQL query failed, or [Error::Validation] if a total is too large to
/// represent.
pub fn get_account_summary(user_id: UserID, connection: &Connection) -> Result<AccountSummary, Error> {
    let accounts = list_accounts(user_id, false, connection)?;

    let mut total_balance = Decimal::ZERO;
    let mut by_type: Vec<AccountTypeTotal> = Vec::new();
    for account in &accounts {
        total_balance = add_amount("total balance", total_balance, account.balance)?;

        match by_type
            .iter_mut()
            .find(|total| total.account_type == account.account_type)
        {
            Some(total) => {
                total.total = add_amount("total balance", total.total, account.balance)?;
                total.count += 1;
            }
            None => by_type.push(AccountTypeTotal {
                account_type: account.account_type,
                total: account.balance,
                count: 1,
            }),
        }
    }
    by_type.sort_by_key(|total| total.account_type);

    Ok(AccountSummary {
        total_balance,
        account_count: accounts.len(),
        by_type,
    })
}
