//! Route handlers for budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::Response,
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error, PaginationConfig, UserID,
    budget::core::{
        BudgetPatch, NewBudget, create_budget, deactivate_budget, get_budget, list_budgets,
        recalculate_budget, update_budget,
    },
    database_id::BudgetId,
    db::lock_connection,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::{PageParams, PageRequest, Paginated},
    response::{created, ok, ok_with_message},
};

/// The state needed for the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The config that controls how to page lists of budgets.
    pub pagination_config: PaginationConfig,
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pagination_config: state.pagination_config.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the user's active budgets.
pub async fn list_budgets_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Response, Error> {
    let page = PageRequest::new(params.page, params.limit, &state.pagination_config)?;

    let connection = lock_connection(&state.db_connection);
    let (budgets, total) = list_budgets(user_id, page, &connection)?;

    Ok(ok(Paginated::new(budgets, page, total)))
}

/// A route handler for creating a budget.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    ApiJson(new_budget): ApiJson<NewBudget>,
) -> Result<Response, Error> {
    let today = OffsetDateTime::now_utc().date();

    let connection = lock_connection(&state.db_connection);
    let budget = create_budget(user_id, new_budget, today, &connection)?;

    Ok(created(budget, "Budget created successfully"))
}

/// A route handler for getting a single budget.
pub async fn get_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(budget_id): ApiPath<BudgetId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_budget(budget_id, user_id, &connection)?))
}

/// A route handler for editing a budget.
pub async fn update_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(budget_id): ApiPath<BudgetId>,
    ApiJson(patch): ApiJson<BudgetPatch>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let budget = update_budget(budget_id, user_id, patch, &connection)?;

    Ok(ok_with_message(budget, "Budget updated successfully"))
}

/// A route handler for soft deleting a budget.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(budget_id): ApiPath<BudgetId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    deactivate_budget(budget_id, user_id, &connection)?;

    Ok(ok_with_message((), "Budget deleted successfully"))
}

/// A route handler for recomputing a budget's spending from its transactions.
pub async fn recalculate_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(budget_id): ApiPath<BudgetId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let budget = recalculate_budget(budget_id, user_id, &connection)?;

    Ok(ok_with_message(budget, "Budget recalculated successfully"))
}
