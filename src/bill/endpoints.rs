//! Route handlers for bills.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::Response,
};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error, PaginationConfig, UserID,
    bill::core::{
        BillPatch, DEFAULT_UPCOMING_DAYS, NewBill, create_bill, deactivate_bill, get_bill,
        get_overdue_bills, get_upcoming_bills, list_bills, pay_bill, update_bill,
    },
    database_id::BillId,
    db::lock_connection,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::{PageParams, PageRequest, Paginated},
    response::{created, ok, ok_with_message},
};

/// The state needed for the bill endpoints.
#[derive(Debug, Clone)]
pub struct BillState {
    /// The config that controls how to page lists of bills.
    pub pagination_config: PaginationConfig,
    /// The database connection for managing bills.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BillState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pagination_config: state.pagination_config.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the upcoming bills endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct UpcomingQuery {
    /// How many days ahead of today to look.
    pub days: Option<u32>,
}

/// A route handler for listing the user's active bills, soonest due first.
pub async fn list_bills_endpoint(
    State(state): State<BillState>,
    Extension(user_id): Extension<UserID>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Response, Error> {
    let page = PageRequest::new(params.page, params.limit, &state.pagination_config)?;

    let connection = lock_connection(&state.db_connection);
    let (bills, total) = list_bills(user_id, page, &connection)?;

    Ok(ok(Paginated::new(bills, page, total)))
}

/// A route handler for creating a bill.
pub async fn create_bill_endpoint(
    State(state): State<BillState>,
    Extension(user_id): Extension<UserID>,
    ApiJson(new_bill): ApiJson<NewBill>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let bill = create_bill(user_id, new_bill, &connection)?;

    Ok(created(bill, "Bill created successfully"))
}

/// A route handler for unpaid bills due in the next few days.
pub async fn upcoming_bills_endpoint(
    State(state): State<BillState>,
    Extension(user_id): Extension<UserID>,
    ApiQuery(query): ApiQuery<UpcomingQuery>,
) -> Result<Response, Error> {
    let today = OffsetDateTime::now_utc().date();
    let days = query.days.unwrap_or(DEFAULT_UPCOMING_DAYS);

    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_upcoming_bills(user_id, days, today, &connection)?))
}

/// A route handler for unpaid bills that are past due.
pub async fn overdue_bills_endpoint(
    State(state): State<BillState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = OffsetDateTime::now_utc().date();

    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_overdue_bills(user_id, today, &connection)?))
}

/// A route handler for getting a single bill.
pub async fn get_bill_endpoint(
    State(state): State<BillState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(bill_id): ApiPath<BillId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_bill(bill_id, user_id, &connection)?))
}

/// A route handler for editing a bill.
pub async fn update_bill_endpoint(
    State(state): State<BillState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(bill_id): ApiPath<BillId>,
    ApiJson(patch): ApiJson<BillPatch>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let bill = update_bill(bill_id, user_id, patch, &connection)?;

    Ok(ok_with_message(bill, "Bill updated successfully"))
}

/// A route handler for soft deleting a bill.
pub async fn delete_bill_endpoint(
    State(state): State<BillState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(bill_id): ApiPath<BillId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    deactivate_bill(bill_id, user_id, &connection)?;

    Ok(ok_with_message((), "Bill deleted successfully"))
}

/// A route handler for paying a bill.
pub async fn pay_bill_endpoint(
    State(state): State<BillState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(bill_id): ApiPath<BillId>,
) -> Result<Response, Error> {
    let mut connection = lock_connection(&state.db_connection);
    let paid = pay_bill(bill_id, user_id, &mut connection)?;

    if let Some(next_bill) = &paid.next_bill {
        tracing::debug!(
            "Bill {bill_id} paid, next occurrence {} due {}",
            next_bill.id,
            next_bill.due_date
        );
    }

    Ok(ok_with_message(paid, "Bill paid successfully"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use time::{Duration, OffsetDateTime};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{data, register_user, test_server},
    };

    async fn create_account(server: &TestServer, token: &str) -> i64 {
        let response = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(token)
            .json(&json!({ "name": "Checking", "type": "bank" }))
            .await;
        let body: Value = response.json();
        data(&body)["id"].as_i64().unwrap()
    }

    async fn create_bill(
        server: &TestServer,
        token: &str,
        account_id: i64,
        due_in_days: i64,
        recurrence: &str,
    ) -> i64 {
        let due_date = OffsetDateTime::now_utc().date() + Duration::days(due_in_days);
        let response = server
            .post(endpoints::BILLS)
            .authorization_bearer(token)
            .json(&json!({
                "name": "Internet",
                "amount": 79.99,
                "dueDate": due_date.to_string(),
                "recurrence": recurrence,
                "accountId": account_id
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        data(&body)["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_with_unknown_account_is_invalid_reference() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;

        let response = server
            .post(endpoints::BILLS)
            .authorization_bearer(&token)
            .json(&json!({
                "name": "Internet",
                "amount": 79.99,
                "dueDate": "2026-11-01",
                "accountId": 12345
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "InvalidReference");
    }

    #[tokio::test]
    async fn upcoming_and_overdue_bills() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        let account_id = create_account(&server, &token).await;
        let overdue = create_bill(&server, &token, account_id, -3, "none").await;
        let soon = create_bill(&server, &token, account_id, 2, "none").await;
        let later = create_bill(&server, &token, account_id, 20, "none").await;

        let response = server
            .get(endpoints::UPCOMING_BILLS)
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        let ids: Vec<i64> = data(&body)
            .as_array()
            .unwrap()
            .iter()
            .map(|bill| bill["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![soon]);

        let response = server
            .get(endpoints::UPCOMING_BILLS)
            .add_query_param("days", 30)
            .authorization_bearer(&token)
            .await;
        let body: Value = response.json();
        assert_eq!(data(&body).as_array().unwrap().len(), 2);
        assert_eq!(data(&body)[1]["id"].as_i64(), Some(later));

        let response = server
            .get(endpoints::OVERDUE_BILLS)
            .authorization_bearer(&token)
            .await;
        let body: Value = response.json();
        assert_eq!(data(&body)[0]["id"].as_i64(), Some(overdue));
        assert_eq!(data(&body).as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upcoming_window_too_long_is_rejected() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;

        let response = server
            .get(endpoints::UPCOMING_BILLS)
            .add_query_param("days", 4_000_000)
            .authorization_bearer(&token)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        server
            .get(endpoints::BILLS)
            .authorization_bearer(&token)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn paying_monthly_bill_returns_next_occurrence() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        let account_id = create_account(&server, &token).await;
        let bill_id = create_bill(&server, &token, account_id, 0, "monthly").await;

        let response = server
            .post(&format_endpoint(endpoints::PAY_BILL, bill_id))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let paid = data(&body);
        assert_eq!(paid["bill"]["isPaid"], true);
        assert_eq!(paid["nextBill"]["isPaid"], false);
        assert_eq!(paid["nextBill"]["recurrence"], "monthly");
        assert_ne!(paid["nextBill"]["id"], paid["bill"]["id"]);

        let response = server
            .get(endpoints::BILLS)
            .authorization_bearer(&token)
            .await;
        let body: Value = response.json();
        assert_eq!(data(&body)["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn deleted_bill_cannot_be_paid() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        let account_id = create_account(&server, &token).await;
        let bill_id = create_bill(&server, &token, account_id, 1, "none").await;

        server
            .delete(&format_endpoint(endpoints::BILL, bill_id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        server
            .post(&format_endpoint(endpoints::PAY_BILL, bill_id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
