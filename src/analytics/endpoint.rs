//! The analytics report and its route handler.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::Response,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error, UserID,
    analytics::{
        aggregation::{
            CategoryBreakdown, DailyCashFlow, MonthlyTrendPoint, Totals, cash_flow_range,
            category_breakdown, daily_cash_flow, monthly_trend, trend_range,
        },
        window::{AnalyticsPeriod, AnalyticsQuery},
    },
    calendar::DateRange,
    db::lock_connection,
    extract::ApiQuery,
    response::ok,
    transaction::{TransactionType, get_transactions_in_range},
};

/// The state needed for the analytics endpoint.
#[derive(Debug, Clone)]
pub struct AnalyticsState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AnalyticsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A user's income and spending over a reporting period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    /// The reporting period.
    pub period: AnalyticsPeriod,
    /// The first day of the reporting period.
    pub start_date: Date,
    /// The last day of the reporting period.
    pub end_date: Date,
    /// The sum of income in the period.
    pub total_income: Decimal,
    /// The sum of expenses in the period.
    pub total_expense: Decimal,
    /// Income minus expenses.
    pub net_savings: Decimal,
    /// Net savings as a percentage of income, zero without income.
    pub savings_rate: Decimal,
    /// The number of transactions of any type in the period.
    pub transaction_count: usize,
    /// Income per category, largest first.
    pub income_by_category: Vec<CategoryBreakdown>,
    /// Expenses per category, largest first.
    pub expense_by_category: Vec<CategoryBreakdown>,
    /// The six months ending with the current month, regardless of the period.
    pub monthly_trend: Vec<MonthlyTrendPoint>,
    /// The 30 days ending today, regardless of the period.
    pub daily_cash_flow: Vec<DailyCashFlow>,
}

/// Compute the analytics for `period` over `range`, with the trailing series relative to `today`.
///
/// # Errors
/// Returns [Error::SqlError] if the transactions could not be read, or [Error::Validation] if
/// the amounts are too large to aggregate.
pub fn compute_analytics(
    user_id: UserID,
    period: AnalyticsPeriod,
    range: DateRange,
    today: Date,
    connection: &Connection,
) -> Result<Analytics, Error> {
    let transactions = get_transactions_in_range(user_id, range, connection)?;
    let totals = Totals::from_transactions(&transactions)?;

    let trend_transactions = get_transactions_in_range(user_id, trend_range(today), connection)?;
    let cash_flow_transactions =
        get_transactions_in_range(user_id, cash_flow_range(today), connection)?;

    Ok(Analytics {
        period,
        start_date: range.start,
        end_date: range.end,
        total_income: totals.income,
        total_expense: totals.expense,
        net_savings: totals.net(),
        savings_rate: totals.savings_rate()?,
        transaction_count: transactions.len(),
        income_by_category: category_breakdown(&transactions, TransactionType::Income)?,
        expense_by_category: category_breakdown(&transactions, TransactionType::Expense)?,
        monthly_trend: monthly_trend(&trend_transactions, today)?,
        daily_cash_flow: daily_cash_flow(&cash_flow_transactions, today)?,
    })
}

/// A route handler for the analytics report.
pub async fn get_analytics_endpoint(
    State(state): State<AnalyticsState>,
    Extension(user_id): Extension<UserID>,
    ApiQuery(query): ApiQuery<AnalyticsQuery>,
) -> Result<Response, Error> {
    let today = OffsetDateTime::now_utc().date();
    let (period, range) = query.resolve(today)?;

    let connection = lock_connection(&state.db_connection);
    let analytics = compute_analytics(user_id, period, range, today, &connection)?;

    Ok(ok(analytics))
}
