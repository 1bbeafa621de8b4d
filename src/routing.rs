//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Response,
    routing::{get, post},
};

use crate::{
    AppState, Error,
    account::{
        account_summary_endpoint, create_account_endpoint, delete_account_endpoint,
        get_account_endpoint, list_accounts_endpoint, update_account_endpoint,
    },
    analytics::get_analytics_endpoint,
    auth::{auth_guard, log_in, me, refresh, register},
    bill::{
        create_bill_endpoint, delete_bill_endpoint, get_bill_endpoint, list_bills_endpoint,
        overdue_bills_endpoint, pay_bill_endpoint, update_bill_endpoint, upcoming_bills_endpoint,
    },
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budget_endpoint,
        list_budgets_endpoint, recalculate_budget_endpoint, update_budget_endpoint,
    },
    endpoints,
    goal::{
        contribute_to_goal_endpoint, create_goal_endpoint, delete_goal_endpoint,
        get_goal_endpoint, list_goals_endpoint, update_goal_endpoint,
    },
    response::ok,
    settlement::{
        create_settlement_endpoint, delete_settlement_endpoint, get_settlement_endpoint,
        list_settlements_endpoint, pending_settlements_endpoint, trigger_settlement_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
        list_transactions_endpoint, recent_transactions_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::REGISTER, post(register))
        .route(endpoints::LOG_IN, post(log_in))
        .route(endpoints::REFRESH, post(refresh));

    let protected_routes = Router::new()
        .route(endpoints::ME, get(me))
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(endpoints::ACCOUNT_SUMMARY, get(account_summary_endpoint))
        .route(
            endpoints::ACCOUNT,
            get(get_account_endpoint)
                .patch(update_account_endpoint)
                .delete(delete_account_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::RECENT_TRANSACTIONS,
            get(recent_transactions_endpoint),
        )
        .route(endpoints::TRANSACTION_ANALYTICS, get(get_analytics_endpoint))
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .patch(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(endpoints::ANALYTICS, get(get_analytics_endpoint))
        .route(
            endpoints::BUDGETS,
            get(list_budgets_endpoint).post(create_budget_endpoint),
        )
        .route(
            endpoints::BUDGET,
            get(get_budget_endpoint)
                .patch(update_budget_endpoint)
                .delete(delete_budget_endpoint),
        )
        .route(
            endpoints::RECALCULATE_BUDGET,
            post(recalculate_budget_endpoint),
        )
        .route(
            endpoints::GOALS,
            get(list_goals_endpoint).post(create_goal_endpoint),
        )
        .route(
            endpoints::GOAL,
            get(get_goal_endpoint)
                .patch(update_goal_endpoint)
                .delete(delete_goal_endpoint),
        )
        .route(
            endpoints::CONTRIBUTE_TO_GOAL,
            post(contribute_to_goal_endpoint),
        )
        .route(
            endpoints::BILLS,
            get(list_bills_endpoint).post(create_bill_endpoint),
        )
        .route(endpoints::UPCOMING_BILLS, get(upcoming_bills_endpoint))
        .route(endpoints::OVERDUE_BILLS, get(overdue_bills_endpoint))
        .route(
            endpoints::BILL,
            get(get_bill_endpoint)
                .patch(update_bill_endpoint)
                .delete(delete_bill_endpoint),
        )
        .route(endpoints::PAY_BILL, post(pay_bill_endpoint))
        .route(
            endpoints::SETTLEMENTS,
            get(list_settlements_endpoint).post(create_settlement_endpoint),
        )
        .route(
            endpoints::PENDING_SETTLEMENTS,
            get(pending_settlements_endpoint),
        )
        .route(
            endpoints::TRIGGER_SETTLEMENT,
            post(trigger_settlement_endpoint),
        )
        .route(
            endpoints::SETTLEMENT,
            get(get_settlement_endpoint).delete(delete_settlement_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_not_found)
        .with_state(state)
}

/// Report that the server is up.
async fn get_health() -> Response {
    ok(serde_json::json!({ "status": "ok" }))
}

async fn get_not_found() -> Error {
    Error::NotFound
}
