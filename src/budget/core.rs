//! Budget types and the database functions for managing budgets.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, ToSql, types::ToSqlOutput};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::{
    Error, UserID,
    calendar::{DateRange, add_months},
    database_id::BudgetId,
    db::{ParseEnumError, get_parsed},
    pagination::PageRequest,
    transaction::{TransactionType, get_transactions_in_range},
    validate::{add_amount, non_empty, positive_amount},
};

/// How long a budget runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// Seven days from the start date.
    Weekly,
    /// One calendar month from the start date.
    Monthly,
    /// One year from the start date.
    Yearly,
    /// Until an explicit end date.
    Custom,
}

impl BudgetPeriod {
    /// The name used in JSON and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
            BudgetPeriod::Custom => "custom",
        }
    }

    /// The last day of a budget of this period starting on `start_date`.
    ///
    /// `custom_end_date` is required for [BudgetPeriod::Custom] and ignored otherwise.
    ///
    /// # Errors
    /// Returns [Error::Validation] if a custom period has no end date or ends before it starts.
    pub fn end_date(
        &self,
        start_date: Date,
        custom_end_date: Option<Date>,
    ) -> Result<Date, Error> {
        let end_date = match self {
            BudgetPeriod::Weekly => start_date.checked_add(Duration::days(6)).ok_or_else(|| {
                Error::Validation(format!("a weekly budget cannot start on {start_date}"))
            })?,
            BudgetPeriod::Monthly => add_months(start_date, 1)? - Duration::days(1),
            BudgetPeriod::Yearly => add_months(start_date, 12)? - Duration::days(1),
            BudgetPeriod::Custom => custom_end_date.ok_or_else(|| {
                Error::Validation("a custom budget requires an endDate".to_owned())
            })?,
        };

        if end_date < start_date {
            return Err(Error::Validation(format!(
                "endDate {end_date} is before startDate {start_date}"
            )));
        }

        Ok(end_date)
    }
}

impl Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            "custom" => Ok(BudgetPeriod::Custom),
            other => Err(ParseEnumError {
                kind: "budget period",
                value: other.to_owned(),
            }),
        }
    }
}

impl ToSql for BudgetPeriod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

/// A spending limit for one category over a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// The id of the budget.
    pub id: BudgetId,
    /// The user that owns the budget.
    pub user_id: UserID,
    /// The display name.
    pub name: String,
    /// The expense category the budget tracks.
    pub category: String,
    /// The amount allocated for the period.
    pub amount: Decimal,
    /// The amount spent so far.
    pub spent: Decimal,
    /// How long the budget runs for.
    pub period: BudgetPeriod,
    /// The first day of the budget.
    pub start_date: Date,
    /// The last day of the budget.
    pub end_date: Date,
    /// False once the budget has been deleted.
    pub is_active: bool,
}

impl Budget {
    fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// The request body for creating a budget.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    /// The display name.
    pub name: String,
    /// The expense category to track.
    pub category: String,
    /// The amount allocated for the period.
    pub amount: Decimal,
    /// How long the budget runs for.
    pub period: BudgetPeriod,
    /// The first day, today if omitted.
    pub start_date: Option<Date>,
    /// The last day, required for custom periods and ignored otherwise.
    pub end_date: Option<Date>,
}

/// The request body for editing a budget. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPatch {
    /// The new name.
    pub name: Option<String>,
    /// The new category.
    pub category: Option<String>,
    /// The new allocated amount.
    pub amount: Option<Decimal>,
    /// The new period.
    pub period: Option<BudgetPeriod>,
    /// The new start date.
    pub start_date: Option<Date>,
    /// The new end date for custom periods.
    pub end_date: Option<Date>,
    /// Reactivate or deactivate the budget.
    pub is_active: Option<bool>,
}

/// Create the budget table.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            amount TEXT NOT NULL,
            spent TEXT NOT NULL,
            period TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const SELECT_BUDGET: &str = "SELECT id, user_id, name, category, amount, spent, period, \
    start_date, end_date, is_active FROM budget";

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        category: row.get(3)?,
        amount: get_parsed(row, 4)?,
        spent: get_parsed(row, 5)?,
        period: get_parsed(row, 6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        is_active: row.get(9)?,
    })
}

/// Create a budget with nothing spent.
///
/// # Errors
/// Returns [Error::Validation] if a field is invalid.
pub fn create_budget(
    user_id: UserID,
    new_budget: NewBudget,
    today: Date,
    connection: &Connection,
) -> Result<Budget, Error> {
    let name = non_empty("name", &new_budget.name)?;
    let category = non_empty("category", &new_budget.category)?;
    let amount = positive_amount("amount", new_budget.amount)?;
    let start_date = new_budget.start_date.unwrap_or(today);
    let end_date = new_budget.period.end_date(start_date, new_budget.end_date)?;

    connection.execute(
        "INSERT INTO budget
            (user_id, name, category, amount, spent, period, start_date, end_date, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)",
        (
            user_id.as_i64(),
            &name,
            &category,
            amount.to_string(),
            Decimal::ZERO.to_string(),
            new_budget.period,
            start_date,
            end_date,
        ),
    )?;

    Ok(Budget {
        id: connection.last_insert_rowid(),
        user_id,
        name,
        category,
        amount,
        spent: Decimal::ZERO,
        period: new_budget.period,
        start_date,
        end_date,
        is_active: true,
    })
}

/// Get a budget owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to another user.
pub fn get_budget(id: BudgetId, user_id: UserID, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(&format!("{SELECT_BUDGET} WHERE id = ?1 AND user_id = ?2"))?
        .query_row((id, user_id.as_i64()), map_budget_row)
        .map_err(|error| error.into())
}

/// Get one page of the user's active budgets, most recent start first, and the number of active
/// budgets.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_budgets(
    user_id: UserID,
    page: PageRequest,
    connection: &Connection,
) -> Result<(Vec<Budget>, u64), Error> {
    let total: i64 = connection.query_row(
        "SELECT COUNT(*) FROM budget WHERE user_id = ?1 AND is_active = 1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let budgets = connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE user_id = ?1 AND is_active = 1 \
             ORDER BY start_date DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))?
        .query_map(
            (user_id.as_i64(), page.limit as i64, page.offset() as i64),
            map_budget_row,
        )?
        .map(|budget_result| budget_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((budgets, total as u64))
}

fn save_budget(budget: &Budget, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "UPDATE budget
         SET name = ?1, category = ?2, amount = ?3, spent = ?4, period = ?5,
             start_date = ?6, end_date = ?7, is_active = ?8
         WHERE id = ?9 AND user_id = ?10",
        (
            &budget.name,
            &budget.category,
            budget.amount.to_string(),
            budget.spent.to_string(),
            budget.period,
            budget.start_date,
            budget.end_date,
            budget.is_active,
            budget.id,
            budget.user_id.as_i64(),
        ),
    )?;

    Ok(())
}

/// Apply `patch` to a budget, recomputing the end date from the period.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to another user, or
/// [Error::Validation] if a field is invalid.
pub fn update_budget(
    id: BudgetId,
    user_id: UserID,
    patch: BudgetPatch,
    connection: &Connection,
) -> Result<Budget, Error> {
    let mut budget = get_budget(id, user_id, connection)?;

    if let Some(name) = patch.name {
        budget.name = non_empty("name", &name)?;
    }
    if let Some(category) = patch.category {
        budget.category = non_empty("category", &category)?;
    }
    if let Some(amount) = patch.amount {
        budget.amount = positive_amount("amount", amount)?;
    }
    if let Some(is_active) = patch.is_active {
        budget.is_active = is_active;
    }

    budget.period = patch.period.unwrap_or(budget.period);
    budget.start_date = patch.start_date.unwrap_or(budget.start_date);
    budget.end_date = budget
        .period
        .end_date(budget.start_date, patch.end_date.or(Some(budget.end_date)))?;

    save_budget(&budget, connection)?;

    Ok(budget)
}

/// Soft delete a budget.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to another user.
pub fn deactivate_budget(id: BudgetId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE budget SET is_active = 0 WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Add `amount` to the spending of every active budget for `category` whose period contains
/// `date`. Returns the number of budgets updated.
///
/// Not called when transactions are created; callers decide when spending is recorded.
///
/// # Errors
/// Returns [Error::SqlError] if the budgets could not be read or written, or
/// [Error::Validation] if a budget's spending would be out of range, in which case no budget
/// is changed.
pub fn record_spending(
    user_id: UserID,
    category: &str,
    amount: Decimal,
    date: Date,
    connection: &Connection,
) -> Result<usize, Error> {
    let budgets = connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE user_id = ?1 AND is_active = 1 AND category = ?2 COLLATE NOCASE \
             AND start_date <= ?3 AND end_date >= ?3"
        ))?
        .query_map((user_id.as_i64(), category, date), map_budget_row)?
        .map(|budget_result| budget_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    let budgets = budgets
        .into_iter()
        .map(|mut budget| {
            budget.spent = add_amount("budget spending", budget.spent, amount)?;
            Ok(budget)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    for budget in &budgets {
        save_budget(budget, connection)?;
    }

    Ok(budgets.len())
}

/// Set a budget's spending to the sum of the user's expenses in its category and period.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to another user.
pub fn recalculate_budget(
    id: BudgetId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Budget, Error> {
    let mut budget = get_budget(id, user_id, connection)?;

    budget.spent = get_transactions_in_range(user_id, budget.range(), connection)?
        .iter()
        .filter(|transaction| {
            transaction.transaction_type == TransactionType::Expense
                && transaction.category.eq_ignore_ascii_case(&budget.category)
        })
        .try_fold(Decimal::ZERO, |spent, transaction| {
            add_amount("budget spending", spent, transaction.amount)
        })?;

    save_budget(&budget, connection)?;
    tracing::debug!("Recalculated budget {} spending as {}", budget.id, budget.spent);

    Ok(budget)
}
