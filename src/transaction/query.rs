//! Database query helpers for listing and filtering transactions.

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Deserialize;
use time::Date;

use crate::{
    Error, UserID,
    calendar::DateRange,
    database_id::AccountId,
    pagination::PageRequest,
    transaction::core::{SELECT_TRANSACTION, Transaction, TransactionType, map_transaction_row},
};

/// The number of transactions returned by [get_recent_transactions] by default.
pub const DEFAULT_RECENT_LIMIT: u64 = 5;
/// The largest number of transactions [get_recent_transactions] will return.
pub const MAX_RECENT_LIMIT: u64 = 100;

/// Narrows down the transactions returned by [list_transactions].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only transactions of this type.
    pub transaction_type: Option<TransactionType>,
    /// Only transactions that take money from or put money into this account.
    pub account_id: Option<AccountId>,
    /// Only transactions in this category, ignoring case.
    pub category: Option<String>,
    /// Only transactions on or after this date.
    pub start_date: Option<Date>,
    /// Only transactions on or before this date.
    pub end_date: Option<Date>,
}

/// The query parameters accepted by the list endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    /// The 1-based page number.
    pub page: Option<u64>,
    /// The page size.
    pub limit: Option<u64>,
    /// Only transactions of this type.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Only transactions touching this account.
    pub account_id: Option<AccountId>,
    /// Only transactions in this category.
    pub category: Option<String>,
    /// Only transactions on or after this date.
    pub start_date: Option<Date>,
    /// Only transactions on or before this date.
    pub end_date: Option<Date>,
}

impl ListTransactionsQuery {
    /// Split off the filter part of the query.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the start date is after the end date.
    pub fn filter(&self) -> Result<TransactionFilter, Error> {
        if let (Some(start_date), Some(end_date)) = (self.start_date, self.end_date) {
            if start_date > end_date {
                return Err(Error::Validation(format!(
                    "startDate {start_date} is after endDate {end_date}"
                )));
            }
        }

        Ok(TransactionFilter {
            transaction_type: self.transaction_type,
            account_id: self.account_id,
            category: self
                .category
                .as_deref()
                .map(str::trim)
                .filter(|category| !category.is_empty())
                .map(str::to_owned),
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

/// Build the WHERE clause and its parameters for `filter`.
fn where_clause(user_id: UserID, filter: &TransactionFilter) -> (String, Vec<Value>) {
    let mut conditions = vec!["user_id = ?".to_owned()];
    let mut params = vec![Value::Integer(user_id.as_i64())];

    if let Some(transaction_type) = filter.transaction_type {
        conditions.push("type = ?".to_owned());
        params.push(Value::Text(transaction_type.as_str().to_owned()));
    }

    if let Some(account_id) = filter.account_id {
        conditions.push("(account_id = ? OR to_account_id = ?)".to_owned());
        params.push(Value::Integer(account_id));
        params.push(Value::Integer(account_id));
    }

    if let Some(category) = &filter.category {
        conditions.push("category = ? COLLATE NOCASE".to_owned());
        params.push(Value::Text(category.clone()));
    }

    if let Some(start_date) = filter.start_date {
        conditions.push("date >= ?".to_owned());
        params.push(Value::Text(start_date.to_string()));
    }

    if let Some(end_date) = filter.end_date {
        conditions.push("date <= ?".to_owned());
        params.push(Value::Text(end_date.to_string()));
    }

    (format!("WHERE {}", conditions.join(" AND ")), params)
}

/// Get one page of the transactions matching `filter`, newest first, and the total number of
/// matching transactions.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    page: PageRequest,
    connection: &Connection,
) -> Result<(Vec<Transaction>, u64), Error> {
    let (where_clause, params) = where_clause(user_id, filter);

    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(*) FROM \"transaction\" {where_clause}"),
        params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let mut page_params = params;
    page_params.push(Value::Integer(page.limit as i64));
    page_params.push(Value::Integer(page.offset() as i64));

    // Sort by date, and then ID to keep transaction order stable after updates
    let transactions = connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} {where_clause} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?"
        ))?
        .query_map(params_from_iter(page_params.iter()), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((transactions, total as u64))
}

/// Get the newest `limit` transactions.
///
/// # Errors
/// Returns [Error::Validation] if `limit` is zero or above [MAX_RECENT_LIMIT].
pub fn get_recent_transactions(
    user_id: UserID,
    limit: u64,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    if limit == 0 || limit > MAX_RECENT_LIMIT {
        return Err(Error::Validation(format!(
            "limit must be between 1 and {MAX_RECENT_LIMIT}"
        )));
    }

    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE user_id = ?1 ORDER BY date DESC, id DESC LIMIT ?2"
        ))?
        .query_map((user_id.as_i64(), limit as i64), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get all transactions dated within `range`, oldest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_transactions_in_range(
    user_id: UserID,
    range: DateRange,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3 \
             ORDER BY date ASC, id ASC"
        ))?
        .query_map(
            (user_id.as_i64(), range.start, range.end),
            map_transaction_row,
        )?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{Date, Duration, macros::date};

    use crate::{
        Error, UserID,
        account::{AccountType, NewAccount, create_account},
        calendar::DateRange,
        database_id::AccountId,
        pagination::PageRequest,
        test_utils::{create_test_user, test_connection},
        transaction::{
            core::{NewTransaction, TransactionType},
            query::{
                ListTransactionsQuery, TransactionFilter, get_recent_transactions,
                get_transactions_in_range, list_transactions,
            },
            service::create_transaction,
        },
    };

    struct Fixture {
        connection: Connection,
        user_id: UserID,
        checking: AccountId,
        savings: AccountId,
    }

    fn fixture() -> Fixture {
        let connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let open = |name: &str| {
            create_account(
                user_id,
                &NewAccount {
                    name: name.to_owned(),
                    account_type: AccountType::Bank,
                    balance: Some(dec!(1000)),
                    currency: None,
                },
                &connection,
            )
            .unwrap()
            .id
        };
        let checking = open("Checking");
        let savings = open("Savings");

        Fixture {
            connection,
            user_id,
            checking,
            savings,
        }
    }

    fn add(
        fixture: &mut Fixture,
        transaction_type: TransactionType,
        amount: Decimal,
        category: &str,
        date: Date,
    ) {
        let to_account_id = match transaction_type {
            TransactionType::Transfer => Some(fixture.savings),
            _ => None,
        };

        create_transaction(
            fixture.user_id,
            NewTransaction {
                transaction_type,
                amount,
                category: category.to_owned(),
                description: String::new(),
                date: Some(date),
                account_id: fixture.checking,
                to_account_id,
            },
            &mut fixture.connection,
        )
        .unwrap();
    }

    fn first_page() -> PageRequest {
        PageRequest { page: 1, limit: 20 }
    }

    #[test]
    fn lists_newest_first_with_total() {
        let mut fixture = fixture();
        for day in 1..=3 {
            add(
                &mut fixture,
                TransactionType::Expense,
                dec!(10),
                "Food",
                date!(2026 - 10 - 01) + Duration::days(day),
            );
        }

        let (transactions, total) = list_transactions(
            fixture.user_id,
            &TransactionFilter::default(),
            first_page(),
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(total, 3);
        let dates: Vec<_> = transactions.iter().map(|t| t.date).collect();
        assert_eq!(
            dates,
            vec![date!(2026 - 10 - 04), date!(2026 - 10 - 03), date!(2026 - 10 - 02)]
        );
    }

    #[test]
    fn pages_through_results() {
        let mut fixture = fixture();
        for _ in 0..5 {
            add(
                &mut fixture,
                TransactionType::Expense,
                dec!(1),
                "Food",
                date!(2026 - 10 - 01),
            );
        }

        let (page, total) = list_transactions(
            fixture.user_id,
            &TransactionFilter::default(),
            PageRequest { page: 3, limit: 2 },
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(total, 5);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, 1, "the oldest id should be last for equal dates");
    }

    #[test]
    fn filters_by_type_category_and_dates() {
        let mut fixture = fixture();
        add(&mut fixture, TransactionType::Expense, dec!(10), "Food", date!(2026 - 09 - 30));
        add(&mut fixture, TransactionType::Expense, dec!(20), "food", date!(2026 - 10 - 05));
        add(&mut fixture, TransactionType::Expense, dec!(30), "Rent", date!(2026 - 10 - 05));
        add(&mut fixture, TransactionType::Income, dec!(40), "Food", date!(2026 - 10 - 05));

        let filter = TransactionFilter {
            transaction_type: Some(TransactionType::Expense),
            category: Some("FOOD".to_owned()),
            start_date: Some(date!(2026 - 10 - 01)),
            end_date: Some(date!(2026 - 10 - 31)),
            ..Default::default()
        };
        let (transactions, total) =
            list_transactions(fixture.user_id, &filter, first_page(), &fixture.connection)
                .unwrap();

        assert_eq!(total, 1);
        assert_eq!(transactions[0].amount, dec!(20));
    }

    #[test]
    fn account_filter_includes_incoming_transfers() {
        let mut fixture = fixture();
        add(&mut fixture, TransactionType::Expense, dec!(10), "Food", date!(2026 - 10 - 01));
        add(&mut fixture, TransactionType::Transfer, dec!(20), "Savings", date!(2026 - 10 - 02));

        let filter = TransactionFilter {
            account_id: Some(fixture.savings),
            ..Default::default()
        };
        let (transactions, total) =
            list_transactions(fixture.user_id, &filter, first_page(), &fixture.connection)
                .unwrap();

        assert_eq!(total, 1);
        assert_eq!(transactions[0].transaction_type, TransactionType::Transfer);
    }

    #[test]
    fn other_users_transactions_are_hidden() {
        let mut fixture = fixture();
        add(&mut fixture, TransactionType::Expense, dec!(10), "Food", date!(2026 - 10 - 01));
        let other = create_test_user("other@bar.baz", &fixture.connection);

        let (transactions, total) = list_transactions(
            other.id,
            &TransactionFilter::default(),
            first_page(),
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(total, 0);
        assert!(transactions.is_empty());
    }

    #[test]
    fn query_rejects_inverted_dates() {
        let query = ListTransactionsQuery {
            start_date: Some(date!(2026 - 10 - 31)),
            end_date: Some(date!(2026 - 10 - 01)),
            ..Default::default()
        };

        assert!(matches!(query.filter(), Err(Error::Validation(_))));
    }

    #[test]
    fn recent_returns_newest() {
        let mut fixture = fixture();
        for day in 0..8 {
            add(
                &mut fixture,
                TransactionType::Expense,
                dec!(1),
                "Food",
                date!(2026 - 10 - 01) + Duration::days(day),
            );
        }

        let recent = get_recent_transactions(fixture.user_id, 5, &fixture.connection).unwrap();

        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].date, date!(2026 - 10 - 08));
        assert!(get_recent_transactions(fixture.user_id, 0, &fixture.connection).is_err());
        assert!(get_recent_transactions(fixture.user_id, 101, &fixture.connection).is_err());
    }

    #[test]
    fn range_is_inclusive() {
        let mut fixture = fixture();
        for date in [
            date!(2026 - 09 - 30),
            date!(2026 - 10 - 01),
            date!(2026 - 10 - 31),
            date!(2026 - 11 - 01),
        ] {
            add(&mut fixture, TransactionType::Expense, dec!(1), "Food", date);
        }

        let transactions = get_transactions_in_range(
            fixture.user_id,
            DateRange {
                start: date!(2026 - 10 - 01),
                end: date!(2026 - 10 - 31),
            },
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].date, date!(2026 - 10 - 01));
    }
}
