//! Settlements close a completed month or year with its income and expense totals.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, ToSql, types::ToSqlOutput};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, OffsetDateTime};

use crate::{
    Error, UserID,
    analytics::Totals,
    calendar::{DateRange, month_bounds, year_bounds},
    database_id::SettlementId,
    db::{ParseEnumError, get_parsed, is_unique_violation},
    pagination::PageRequest,
    transaction::get_transactions_in_range,
};

/// The length of the period a settlement covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementType {
    /// A calendar month.
    Monthly,
    /// A calendar year.
    Yearly,
}

impl SettlementType {
    /// Every settlement type, in the order pending settlements are reported.
    pub const ALL: [SettlementType; 2] = [SettlementType::Monthly, SettlementType::Yearly];

    /// The name used in JSON and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementType::Monthly => "monthly",
            SettlementType::Yearly => "yearly",
        }
    }

    /// The most recent period of this type that ended before `today`.
    pub fn latest_completed_period(&self, today: Date) -> DateRange {
        match self {
            SettlementType::Monthly => month_bounds(month_bounds(today).start - Duration::days(1)),
            SettlementType::Yearly => year_bounds(year_bounds(today).start - Duration::days(1)),
        }
    }

    /// The period of this type starting on `period_start`.
    ///
    /// # Errors
    /// Returns [Error::Validation] if `period_start` is not the first day of a month (or year),
    /// or if the period has not ended before `today`.
    pub fn completed_period(&self, period_start: Date, today: Date) -> Result<DateRange, Error> {
        let is_period_start = match self {
            SettlementType::Monthly => period_start.day() == 1,
            SettlementType::Yearly => period_start.day() == 1 && period_start.month() == Month::January,
        };

        if !is_period_start {
            return Err(Error::Validation(format!(
                "periodStart {period_start} is not the start of a {self} period"
            )));
        }

        let period = match self {
            SettlementType::Monthly => month_bounds(period_start),
            SettlementType::Yearly => year_bounds(period_start),
        };

        if period.end >= today {
            return Err(Error::Validation(format!(
                "the {self} period starting {period_start} has not finished"
            )));
        }

        Ok(period)
    }
}

impl Display for SettlementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettlementType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(SettlementType::Monthly),
            "yearly" => Ok(SettlementType::Yearly),
            other => Err(ParseEnumError {
                kind: "settlement type",
                value: other.to_owned(),
            }),
        }
    }
}

impl ToSql for SettlementType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

/// The totals for a completed period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    /// The id of the settlement.
    pub id: SettlementId,
    /// The user that owns the settlement.
    pub user_id: UserID,
    /// The length of the period.
    #[serde(rename = "type")]
    pub settlement_type: SettlementType,
    /// The first day of the period.
    pub period_start: Date,
    /// The last day of the period.
    pub period_end: Date,
    /// The sum of income in the period.
    pub total_income: Decimal,
    /// The sum of expenses in the period.
    pub total_expense: Decimal,
    /// Income minus expenses.
    pub net_amount: Decimal,
    /// When the settlement was created.
    #[serde(with = "time::serde::rfc3339")]
    pub settled_at: OffsetDateTime,
}

/// A completed period that has not been settled yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSettlement {
    /// The length of the period.
    #[serde(rename = "type")]
    pub settlement_type: SettlementType,
    /// The first day of the period.
    pub period_start: Date,
    /// The last day of the period.
    pub period_end: Date,
}

/// The request body for creating a settlement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSettlement {
    /// The length of the period.
    #[serde(rename = "type")]
    pub settlement_type: SettlementType,
    /// The first day of the period to settle, the latest completed period if omitted.
    pub period_start: Option<Date>,
}

/// The request body for settling the latest completed period.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSettlement {
    /// The length of the period.
    #[serde(rename = "type")]
    pub settlement_type: SettlementType,
}

/// Create the settlement table.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn create_settlement_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS settlement (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            type TEXT NOT NULL,
            period_start TEXT NOT NULL,
            period_end TEXT NOT NULL,
            total_income TEXT NOT NULL,
            total_expense TEXT NOT NULL,
            net_amount TEXT NOT NULL,
            settled_at TEXT NOT NULL,
            UNIQUE(user_id, type, period_start),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const SELECT_SETTLEMENT: &str = "SELECT id, user_id, type, period_start, period_end, \
    total_income, total_expense, net_amount, settled_at FROM settlement";

fn map_settlement_row(row: &Row) -> Result<Settlement, rusqlite::Error> {
    Ok(Settlement {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        settlement_type: get_parsed(row, 2)?,
        period_start: row.get(3)?,
        period_end: row.get(4)?,
        total_income: get_parsed(row, 5)?,
        total_expense: get_parsed(row, 6)?,
        net_amount: get_parsed(row, 7)?,
        settled_at: row.get(8)?,
    })
}

/// Settle `period` from the user's income and expense transactions within it.
///
/// # Errors
/// Returns [Error::DuplicateSettlement] if the period already has a settlement of this type.
pub fn settle_period(
    user_id: UserID,
    settlement_type: SettlementType,
    period: DateRange,
    connection: &Connection,
) -> Result<Settlement, Error> {
    let transactions = get_transactions_in_range(user_id, period, connection)?;
    let totals = Totals::from_transactions(&transactions)?;
    let settled_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO settlement
                (user_id, type, period_start, period_end, total_income, total_expense,
                 net_amount, settled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            (
                user_id.as_i64(),
                settlement_type,
                period.start,
                period.end,
                totals.income.to_string(),
                totals.expense.to_string(),
                totals.net().to_string(),
                settled_at,
            ),
        )
        .map_err(|error| {
            if is_unique_violation(&error) {
                Error::DuplicateSettlement(settlement_type, period.start)
            } else {
                error.into()
            }
        })?;

    tracing::info!(
        "Settled {settlement_type} period {} to {} for user {user_id}",
        period.start,
        period.end
    );

    Ok(Settlement {
        id: connection.last_insert_rowid(),
        user_id,
        settlement_type,
        period_start: period.start,
        period_end: period.end,
        total_income: totals.income,
        total_expense: totals.expense,
        net_amount: totals.net(),
        settled_at,
    })
}

/// Settle the period named by `new_settlement`, or the latest completed period.
///
/// # Errors
/// Returns [Error::Validation] if the requested period is not a completed period, or
/// [Error::DuplicateSettlement] if it was already settled.
pub fn create_settlement(
    user_id: UserID,
    new_settlement: NewSettlement,
    today: Date,
    connection: &Connection,
) -> Result<Settlement, Error> {
    let settlement_type = new_settlement.settlement_type;
    let period = match new_settlement.period_start {
        Some(period_start) => settlement_type.completed_period(period_start, today)?,
        None => settlement_type.latest_completed_period(today),
    };

    settle_period(user_id, settlement_type, period, connection)
}

fn is_settled(
    user_id: UserID,
    settlement_type: SettlementType,
    period_start: Date,
    connection: &Connection,
) -> Result<bool, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM settlement WHERE user_id = ?1 AND type = ?2 AND period_start = ?3",
        (user_id.as_i64(), settlement_type, period_start),
        |row| row.get(0),
    )?;

    Ok(count > 0)
}

/// The latest completed period of each type that has not been settled.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_pending_settlements(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Vec<PendingSettlement>, Error> {
    let mut pending = Vec::new();

    for settlement_type in SettlementType::ALL {
        let period = settlement_type.latest_completed_period(today);

        if !is_settled(user_id, settlement_type, period.start, connection)? {
            pending.push(PendingSettlement {
                settlement_type,
                period_start: period.start,
                period_end: period.end,
            });
        }
    }

    Ok(pending)
}

/// Get a settlement owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the settlement does not exist or belongs to another user.
pub fn get_settlement(
    id: SettlementId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Settlement, Error> {
    connection
        .prepare(&format!("{SELECT_SETTLEMENT} WHERE id = ?1 AND user_id = ?2"))?
        .query_row((id, user_id.as_i64()), map_settlement_row)
        .map_err(|error| error.into())
}

/// Get one page of the user's settlements, newest period first, and the number of settlements.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_settlements(
    user_id: UserID,
    page: PageRequest,
    connection: &Connection,
) -> Result<(Vec<Settlement>, u64), Error> {
    let total: i64 = connection.query_row(
        "SELECT COUNT(*) FROM settlement WHERE user_id = ?1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let settlements = connection
        .prepare(&format!(
            "{SELECT_SETTLEMENT} WHERE user_id = ?1 \
             ORDER BY period_start DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))?
        .query_map(
            (user_id.as_i64(), page.limit as i64, page.offset() as i64),
            map_settlement_row,
        )?
        .map(|settlement_result| settlement_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((settlements, total as u64))
}

/// Delete a settlement.
///
/// # Errors
/// Returns [Error::NotFound] if the settlement does not exist or belongs to another user.
pub fn delete_settlement(
    id: SettlementId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM settlement WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
