//! Bills, their recurrence and the database functions for managing them.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, ToSql, types::ToSqlOutput};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::{
    Error, UserID,
    account::get_active_account,
    calendar::{add_months, add_weeks},
    database_id::{AccountId, BillId},
    db::{ParseEnumError, get_parsed},
    pagination::PageRequest,
    validate::{non_empty, positive_amount},
};

/// The number of days ahead the upcoming bills endpoint looks by default.
pub const DEFAULT_UPCOMING_DAYS: u32 = 7;

/// How often a bill comes due again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    /// A one-off bill.
    #[default]
    None,
    /// Due every week.
    Weekly,
    /// Due on the same day every month, or the last day of shorter months.
    Monthly,
    /// Due on the same day every year.
    Yearly,
}

impl Recurrence {
    /// The name used in JSON and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Yearly => "yearly",
        }
    }

    /// The due date after `due_date`, or `None` for one-off bills.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the next due date is out of range.
    pub fn next_due_date(&self, due_date: Date) -> Result<Option<Date>, Error> {
        let next = match self {
            Recurrence::None => return Ok(None),
            Recurrence::Weekly => add_weeks(due_date, 1)?,
            Recurrence::Monthly => add_months(due_date, 1)?,
            Recurrence::Yearly => add_months(due_date, 12)?,
        };

        Ok(Some(next))
    }
}

impl Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Recurrence::None),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            "yearly" => Ok(Recurrence::Yearly),
            other => Err(ParseEnumError {
                kind: "recurrence",
                value: other.to_owned(),
            }),
        }
    }
}

impl ToSql for Recurrence {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

/// A payment due on a date, paid from a linked account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// The id of the bill.
    pub id: BillId,
    /// The user that owns the bill.
    pub user_id: UserID,
    /// The display name.
    pub name: String,
    /// The amount due.
    pub amount: Decimal,
    /// The day the bill is due.
    pub due_date: Date,
    /// Whether the bill has been paid.
    pub is_paid: bool,
    /// How often the bill comes due again.
    pub recurrence: Recurrence,
    /// The account the bill is paid from.
    pub account_id: AccountId,
    /// The expense category of the bill.
    pub category: Option<String>,
    /// False once the bill has been deleted.
    pub is_active: bool,
}

/// The request body for creating a bill.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBill {
    /// The display name.
    pub name: String,
    /// The amount due.
    pub amount: Decimal,
    /// The day the bill is due.
    pub due_date: Date,
    /// How often the bill comes due again, a one-off bill if omitted.
    #[serde(default)]
    pub recurrence: Recurrence,
    /// The account the bill is paid from.
    pub account_id: AccountId,
    /// The expense category of the bill.
    pub category: Option<String>,
}

/// The request body for editing a bill. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillPatch {
    /// The new name.
    pub name: Option<String>,
    /// The new amount.
    pub amount: Option<Decimal>,
    /// The new due date.
    pub due_date: Option<Date>,
    /// The new recurrence.
    pub recurrence: Option<Recurrence>,
    /// The new linked account.
    pub account_id: Option<AccountId>,
    /// The new category.
    pub category: Option<String>,
    /// Mark the bill paid or unpaid.
    pub is_paid: Option<bool>,
    /// Reactivate or deactivate the bill.
    pub is_active: Option<bool>,
}

/// The result of paying a bill.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidBill {
    /// The bill, now marked paid.
    pub bill: Bill,
    /// The next occurrence of a recurring bill.
    pub next_bill: Option<Bill>,
}

fn optional_category(category: Option<String>) -> Option<String> {
    category
        .map(|category| category.trim().to_owned())
        .filter(|category| !category.is_empty())
}

/// Create the bill table.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn create_bill_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS bill (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            amount TEXT NOT NULL,
            due_date TEXT NOT NULL,
            is_paid INTEGER NOT NULL DEFAULT 0,
            recurrence TEXT NOT NULL,
            account_id INTEGER NOT NULL,
            category TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_bill_user_due_date ON bill(user_id, due_date)",
        (),
    )?;

    Ok(())
}

const SELECT_BILL: &str = "SELECT id, user_id, name, amount, due_date, is_paid, recurrence, \
    account_id, category, is_active FROM bill";

fn map_bill_row(row: &Row) -> Result<Bill, rusqlite::Error> {
    Ok(Bill {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        amount: get_parsed(row, 3)?,
        due_date: row.get(4)?,
        is_paid: row.get(5)?,
        recurrence: get_parsed(row, 6)?,
        account_id: row.get(7)?,
        category: row.get(8)?,
        is_active: row.get(9)?,
    })
}

fn insert_bill(bill: &Bill, connection: &Connection) -> Result<BillId, Error> {
    connection.execute(
        "INSERT INTO bill
            (user_id, name, amount, due_date, is_paid, recurrence, account_id, category, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        (
            bill.user_id.as_i64(),
            &bill.name,
            bill.amount.to_string(),
            bill.due_date,
            bill.is_paid,
            bill.recurrence,
            bill.account_id,
            &bill.category,
            bill.is_active,
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

fn save_bill(bill: &Bill, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "UPDATE bill
         SET name = ?1, amount = ?2, due_date = ?3, is_paid = ?4, recurrence = ?5,
             account_id = ?6, category = ?7, is_active = ?8
         WHERE id = ?9 AND user_id = ?10",
        (
            &bill.name,
            bill.amount.to_string(),
            bill.due_date,
            bill.is_paid,
            bill.recurrence,
            bill.account_id,
            &bill.category,
            bill.is_active,
            bill.id,
            bill.user_id.as_i64(),
        ),
    )?;

    Ok(())
}

/// Create an unpaid bill linked to one of the user's active accounts.
///
/// # Errors
/// Returns [Error::InvalidAccount] if the account is inactive or not the user's, or
/// [Error::Validation] if a field is invalid.
pub fn create_bill(user_id: UserID, new_bill: NewBill, connection: &Connection) -> Result<Bill, Error> {
    let mut bill = Bill {
        id: 0,
        user_id,
        name: non_empty("name", &new_bill.name)?,
        amount: positive_amount("amount", new_bill.amount)?,
        due_date: new_bill.due_date,
        is_paid: false,
        recurrence: new_bill.recurrence,
        account_id: new_bill.account_id,
        category: optional_category(new_bill.category),
        is_active: true,
    };
    get_active_account(bill.account_id, user_id, connection)?;

    bill.id = insert_bill(&bill, connection)?;

    Ok(bill)
}

/// Get a bill owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the bill does not exist or belongs to another user.
pub fn get_bill(id: BillId, user_id: UserID, connection: &Connection) -> Result<Bill, Error> {
    connection
        .prepare(&format!("{SELECT_BILL} WHERE id = ?1 AND user_id = ?2"))?
        .query_row((id, user_id.as_i64()), map_bill_row)
        .map_err(|error| error.into())
}

/// Get one page of the user's active bills, soonest due first, and the number of active bills.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_bills(
    user_id: UserID,
    page: PageRequest,
    connection: &Connection,
) -> Result<(Vec<Bill>, u64), Error> {
    let total: i64 = connection.query_row(
        "SELECT COUNT(*) FROM bill WHERE user_id = ?1 AND is_active = 1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let bills = connection
        .prepare(&format!(
            "{SELECT_BILL} WHERE user_id = ?1 AND is_active = 1 \
             ORDER BY due_date ASC, id ASC LIMIT ?2 OFFSET ?3"
        ))?
        .query_map(
            (user_id.as_i64(), page.limit as i64, page.offset() as i64),
            map_bill_row,
        )?
        .map(|bill_result| bill_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((bills, total as u64))
}

/// Get the user's active, unpaid bills due on or after `start` and before `end`, soonest first.
/// `end_inclusive` also includes bills due on `end`.
fn unpaid_bills_due_between(
    user_id: UserID,
    start: Option<Date>,
    end: Date,
    end_inclusive: bool,
    connection: &Connection,
) -> Result<Vec<Bill>, Error> {
    let end_comparison = if end_inclusive { "<=" } else { "<" };

    connection
        .prepare(&format!(
            "{SELECT_BILL} WHERE user_id = ?1 AND is_active = 1 AND is_paid = 0 \
             AND (?2 IS NULL OR due_date >= ?2) AND due_date {end_comparison} ?3 \
             ORDER BY due_date ASC, id ASC"
        ))?
        .query_map((user_id.as_i64(), start, end), map_bill_row)?
        .map(|bill_result| bill_result.map_err(Error::SqlError))
        .collect()
}

/// Get the user's unpaid bills due from `today` to `today + days` inclusive.
///
/// # Errors
/// Returns [Error::Validation] if the window ends past the last representable date, or
/// [Error::SqlError] if the query fails.
pub fn get_upcoming_bills(
    user_id: UserID,
    days: u32,
    today: Date,
    connection: &Connection,
) -> Result<Vec<Bill>, Error> {
    let end = today
        .checked_add(Duration::days(days.into()))
        .ok_or_else(|| Error::Validation(format!("{days} days from {today} is out of range")))?;

    unpaid_bills_due_between(user_id, Some(today), end, true, connection)
}

/// Get the user's unpaid bills due before `today`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_overdue_bills(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Vec<Bill>, Error> {
    unpaid_bills_due_between(user_id, None, today, false, connection)
}

/// Apply `patch` to a bill. A new linked account must be one of the user's active accounts.
///
/// # Errors
/// Returns [Error::NotFound] if the bill does not exist or belongs to another user,
/// [Error::InvalidAccount] if the new account cannot be used, or [Error::Validation] if a field
/// is invalid.
pub fn update_bill(
    id: BillId,
    user_id: UserID,
    patch: BillPatch,
    connection: &Connection,
) -> Result<Bill, Error> {
    let mut bill = get_bill(id, user_id, connection)?;

    if let Some(name) = patch.name {
        bill.name = non_empty("name", &name)?;
    }
    if let Some(amount) = patch.amount {
        bill.amount = positive_amount("amount", amount)?;
    }
    if let Some(account_id) = patch.account_id {
        get_active_account(account_id, user_id, connection)?;
        bill.account_id = account_id;
    }
    if patch.category.is_some() {
        bill.category = optional_category(patch.category);
    }
    bill.due_date = patch.due_date.unwrap_or(bill.due_date);
    bill.recurrence = patch.recurrence.unwrap_or(bill.recurrence);
    bill.is_paid = patch.is_paid.unwrap_or(bill.is_paid);
    bill.is_active = patch.is_active.unwrap_or(bill.is_active);

    save_bill(&bill, connection)?;

    Ok(bill)
}

/// Soft delete a bill.
///
/// # Errors
/// Returns [Error::NotFound] if the bill does not exist or belongs to another user.
pub fn deactivate_bill(id: BillId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE bill SET is_active = 0 WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Mark a bill paid and, for recurring bills, create the next unpaid occurrence.
///
/// Both writes happen in one SQL transaction.
///
/// # Errors
/// Returns [Error::NotFound] if the bill does not exist, is inactive or belongs to another user,
/// or [Error::Validation] if it is already paid.
pub fn pay_bill(id: BillId, user_id: UserID, connection: &mut Connection) -> Result<PaidBill, Error> {
    let sql_transaction = connection.transaction()?;

    let mut bill = get_bill(id, user_id, &sql_transaction)?;
    if !bill.is_active {
        return Err(Error::NotFound);
    }
    if bill.is_paid {
        return Err(Error::Validation(format!("bill {id} is already paid")));
    }

    bill.is_paid = true;
    save_bill(&bill, &sql_transaction)?;

    let next_bill = match bill.recurrence.next_due_date(bill.due_date)? {
        Some(due_date) => {
            let mut next_bill = Bill {
                due_date,
                is_paid: false,
                ..bill.clone()
            };
            next_bill.id = insert_bill(&next_bill, &sql_transaction)?;
            Some(next_bill)
        }
        None => None,
    };

    sql_transaction.commit()?;

    Ok(PaidBill { bill, next_bill })
}
