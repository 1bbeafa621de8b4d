//! Route handlers for managing accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::Response,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, UserID,
    account::core::{
        AccountPatch, NewAccount, create_account, deactivate_account, get_account,
        get_account_summary, list_accounts, update_account,
    },
    database_id::AccountId,
    db::lock_connection,
    extract::{ApiJson, ApiPath, ApiQuery},
    response::{created, ok, ok_with_message},
};

/// The state needed to manage accounts.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for listing accounts.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAccountsQuery {
    /// Whether to include deleted accounts.
    pub include_inactive: Option<bool>,
}

/// A route handler for listing the user's accounts.
pub async fn list_accounts_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    ApiQuery(query): ApiQuery<ListAccountsQuery>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let accounts = list_accounts(
        user_id,
        query.include_inactive.unwrap_or(false),
        &connection,
    )?;

    Ok(ok(accounts))
}

/// A route handler for creating a new account.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    ApiJson(new_account): ApiJson<NewAccount>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let account = create_account(user_id, &new_account, &connection)?;
    tracing::debug!("Created account {} for user {user_id}", account.id);

    Ok(created(account, "Account created successfully"))
}

/// A route handler for the totals across the user's active accounts.
pub async fn account_summary_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_account_summary(user_id, &connection)?))
}

/// A route handler for getting a single account.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(account_id): ApiPath<AccountId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_account(account_id, user_id, &connection)?))
}

/// A route handler for editing an account.
pub async fn update_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(account_id): ApiPath<AccountId>,
    ApiJson(patch): ApiJson<AccountPatch>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let account = update_account(account_id, user_id, &patch, &connection)?;

    Ok(ok_with_message(account, "Account updated successfully"))
}

/// A route handler for soft deleting an account.
pub async fn delete_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(account_id): ApiPath<AccountId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    deactivate_account(account_id, user_id, &connection)?;

    Ok(ok_with_message((), "Account deleted successfully"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{data, register_user, test_server},
    };

    #[tokio::test]
    async fn create_then_get_account() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;

        let response = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Checking", "type": "bank", "balance": 100.5 }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let account = data(&body);
        assert_eq!(account["type"], "bank");
        assert_eq!(account["balance"].as_f64(), Some(100.5));
        assert_eq!(account["currency"], "USD");
        assert_eq!(account["isActive"], true);

        let id = account["id"].as_i64().unwrap();
        let response = server
            .get(&format_endpoint(endpoints::ACCOUNT, id))
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(data(&body)["name"], "Checking");
    }

    #[tokio::test]
    async fn create_rejects_unknown_type() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;

        server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Checking", "type": "savings" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patch_rejects_balance() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        let response = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Checking", "type": "bank" }))
            .await;
        let body: Value = response.json();
        let id = data(&body)["id"].as_i64().unwrap();

        server
            .patch(&format_endpoint(endpoints::ACCOUNT, id))
            .authorization_bearer(&token)
            .json(&json!({ "balance": 1000000 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .patch(&format_endpoint(endpoints::ACCOUNT, id))
            .authorization_bearer(&token)
            .json(&json!({ "name": "Everyday", "type": "cash" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(data(&body)["name"], "Everyday");
        assert_eq!(data(&body)["type"], "cash");
    }

    #[tokio::test]
    async fn delete_hides_account_from_default_list() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        let response = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Checking", "type": "bank" }))
            .await;
        let body: Value = response.json();
        let id = data(&body)["id"].as_i64().unwrap();

        server
            .delete(&format_endpoint(endpoints::ACCOUNT, id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let body: Value = server
            .get(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(data(&body), &json!([]));

        let body: Value = server
            .get(endpoints::ACCOUNTS)
            .add_query_param("includeInactive", true)
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(data(&body)[0]["isActive"], false);
    }

    #[tokio::test]
    async fn other_users_account_is_not_found() {
        let server = test_server();
        let owner_token = register_user(&server, "owner@example.com").await;
        let other_token = register_user(&server, "other@example.com").await;
        let response = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(&owner_token)
            .json(&json!({ "name": "Checking", "type": "bank" }))
            .await;
        let body: Value = response.json();
        let id = data(&body)["id"].as_i64().unwrap();

        server
            .get(&format_endpoint(endpoints::ACCOUNT, id))
            .authorization_bearer(&other_token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .delete(&format_endpoint(endpoints::ACCOUNT, id))
            .authorization_bearer(&other_token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summary_totals_balances() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        for (name, account_type, balance) in [("Checking", "bank", 100), ("Visa", "credit-card", -40)]
        {
            server
                .post(endpoints::ACCOUNTS)
                .authorization_bearer(&token)
                .json(&json!({ "name": name, "type": account_type, "balance": balance }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let body: Value = server
            .get(endpoints::ACCOUNT_SUMMARY)
            .authorization_bearer(&token)
            .await
            .json();

        assert_eq!(data(&body)["totalBalance"].as_f64(), Some(60.0));
        assert_eq!(data(&body)["accountCount"], 2);
    }

    #[tokio::test]
    async fn accounts_require_auth() {
        let server = test_server();

        server
            .get(endpoints::ACCOUNTS)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
