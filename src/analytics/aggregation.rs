//! Aggregating a user's transactions into totals, category breakdowns and time series.
//!
//! Only income and expense transactions count towards the aggregates. Transfers and
//! liability payments move money between the user's own balances.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, Duration};

use crate::{
    Error,
    calendar::{DateRange, add_months, month_bounds, month_label},
    transaction::{Transaction, TransactionType},
    validate::add_amount,
};

/// The number of months in the trailing trend.
pub const TREND_MONTHS: i32 = 6;
/// The number of days in the trailing cash flow series.
pub const CASH_FLOW_DAYS: i64 = 30;

/// Income, expense and what is left over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// The sum of income transactions.
    pub income: Decimal,
    /// The sum of expense transactions.
    pub expense: Decimal,
}

impl Totals {
    /// Sum the income and expense transactions in `transactions`.
    ///
    /// # Errors
    /// Returns [Error::Validation] if a total is too large to represent.
    pub fn from_transactions<'a>(
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Result<Self, Error> {
        transactions
            .into_iter()
            .try_fold(Totals::default(), |mut totals, transaction| {
                match transaction.transaction_type {
                    TransactionType::Income => {
                        totals.income = add_amount("total income", totals.income, transaction.amount)?
                    }
                    TransactionType::Expense => {
                        totals.expense =
                            add_amount("total expense", totals.expense, transaction.amount)?
                    }
                    TransactionType::Transfer | TransactionType::Liability => {}
                }
                Ok(totals)
            })
    }

    /// Income minus expense.
    ///
    /// Both totals are non-negative, so the difference cannot overflow.
    pub fn net(&self) -> Decimal {
        self.income - self.expense
    }

    /// The net as a percentage of income, or zero when there is no income.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the rate is too large to represent.
    pub fn savings_rate(&self) -> Result<Decimal, Error> {
        percentage(self.net(), self.income)
    }
}

/// `part / whole * 100` rounded to two decimal places, zero when `whole` is zero.
///
/// # Errors
/// Returns [Error::Validation] if the result is too large to represent.
pub fn percentage(part: Decimal, whole: Decimal) -> Result<Decimal, Error> {
    if whole.is_zero() {
        return Ok(Decimal::ZERO);
    }

    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|percent| percent.round_dp(2))
        .ok_or_else(|| Error::Validation("percentage is out of range".to_owned()))
}

/// How much of a type's total went to or came from one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    /// The category name.
    pub category: String,
    /// The sum for the category.
    pub amount: Decimal,
    /// The share of the type's total, from 0 to 100.
    pub percentage: Decimal,
}

/// Income and expense for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendPoint {
    /// A short label, e.g. "Oct 2026".
    pub month: String,
    /// The month's income.
    pub income: Decimal,
    /// The month's expense.
    pub expense: Decimal,
    /// Income minus expense.
    pub savings: Decimal,
}

/// Money in and out on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCashFlow {
    /// The day.
    pub date: Date,
    /// The day's income.
    pub inflow: Decimal,
    /// The day's expense.
    pub outflow: Decimal,
    /// Inflow minus outflow.
    pub net_flow: Decimal,
}

/// Sum the transactions of `transaction_type` per category, largest first.
///
/// # Errors
/// Returns [Error::Validation] if a sum is too large to represent.
pub fn category_breakdown(
    transactions: &[Transaction],
    transaction_type: TransactionType,
) -> Result<Vec<CategoryBreakdown>, Error> {
    let mut by_category: HashMap<&str, Decimal> = HashMap::new();
    let mut total = Decimal::ZERO;

    for transaction in transactions
        .iter()
        .filter(|transaction| transaction.transaction_type == transaction_type)
    {
        let category_total = by_category
            .entry(transaction.category.as_str())
            .or_default();
        *category_total = add_amount("category total", *category_total, transaction.amount)?;
        total = add_amount("total", total, transaction.amount)?;
    }

    let mut breakdown = by_category
        .into_iter()
        .map(|(category, amount)| {
            Ok(CategoryBreakdown {
                category: category.to_owned(),
                amount,
                percentage: percentage(amount, total)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    breakdown.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });

    Ok(breakdown)
}

/// The range of dates covered by [monthly_trend] for `today`.
pub fn trend_range(today: Date) -> DateRange {
    let first_month = add_months(today, 1 - TREND_MONTHS).unwrap_or(today);

    DateRange {
        start: month_bounds(first_month).start,
        end: month_bounds(today).end,
    }
}

/// Income and expense for each of the six months ending with the month of `today`, oldest
/// first. Months without transactions are included with zeros.
///
/// # Errors
/// Returns [Error::Validation] if a month's totals are too large to represent.
pub fn monthly_trend(
    transactions: &[Transaction],
    today: Date,
) -> Result<Vec<MonthlyTrendPoint>, Error> {
    (1 - TREND_MONTHS..=0)
        .filter_map(|offset| add_months(today, offset).ok())
        .map(|month| {
            let bounds = month_bounds(month);
            let totals = Totals::from_transactions(
                transactions
                    .iter()
                    .filter(|transaction| bounds.contains(transaction.date)),
            )?;

            Ok(MonthlyTrendPoint {
                month: month_label(month),
                income: totals.income,
                expense: totals.expense,
                savings: totals.net(),
            })
        })
        .collect()
}

/// The range of dates covered by [daily_cash_flow] for `today`.
pub fn cash_flow_range(today: Date) -> DateRange {
    DateRange {
        start: today - Duration::days(CASH_FLOW_DAYS - 1),
        end: today,
    }
}

/// Income and expense for each of the 30 days ending `today`, oldest first. Days without
/// transactions are included with zeros.
///
/// # Errors
/// Returns [Error::Validation] if a day's totals are too large to represent.
pub fn daily_cash_flow(
    transactions: &[Transaction],
    today: Date,
) -> Result<Vec<DailyCashFlow>, Error> {
    let range = cash_flow_range(today);
    let mut by_date: HashMap<Date, Vec<&Transaction>> = HashMap::new();

    for transaction in transactions
        .iter()
        .filter(|transaction| range.contains(transaction.date))
    {
        by_date.entry(transaction.date).or_default().push(transaction);
    }

    (0..CASH_FLOW_DAYS)
        .map(|day| {
            let date = range.start + Duration::days(day);
            let totals = match by_date.get(&date) {
                Some(day_transactions) => {
                    Totals::from_transactions(day_transactions.iter().copied())?
                }
                None => Totals::default(),
            };

            Ok(DailyCashFlow {
                date,
                inflow: totals.income,
                outflow: totals.expense,
                net_flow: totals.net(),
            })
        })
        .collect()
}
