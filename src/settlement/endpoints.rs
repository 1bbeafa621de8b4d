//! Route handlers for settlements.

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
    database_id::SettlementId,
    db::lock_connection,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::{PageParams, PageRequest, Paginated},
    response::{created, ok, ok_with_message},
    settlement::core::{
        NewSettlement, TriggerSettlement, create_settlement, delete_settlement,
        get_pending_settlements, get_settlement, list_settlements, settle_period,
    },
};

/// The state needed for the settlement endpoints.
#[derive(Debug, Clone)]
pub struct SettlementState {
    /// The config that controls how to page lists of settlements.
    pub pagination_config: PaginationConfig,
    /// The database connection for managing settlements.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettlementState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pagination_config: state.pagination_config.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the user's settlements, newest period first.
pub async fn list_settlements_endpoint(
    State(state): State<SettlementState>,
    Extension(user_id): Extension<UserID>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Response, Error> {
    let page = PageRequest::new(params.page, params.limit, &state.pagination_config)?;

    let connection = lock_connection(&state.db_connection);
    let (settlements, total) = list_settlements(user_id, page, &connection)?;

    Ok(ok(Paginated::new(settlements, page, total)))
}

/// A route handler for settling a completed period.
pub async fn create_settlement_endpoint(
    State(state): State<SettlementState>,
    Extension(user_id): Extension<UserID>,
    ApiJson(new_settlement): ApiJson<NewSettlement>,
) -> Result<Response, Error> {
    let today = OffsetDateTime::now_utc().date();

    let connection = lock_connection(&state.db_connection);
    let settlement = create_settlement(user_id, new_settlement, today, &connection)?;

    Ok(created(settlement, "Settlement created successfully"))
}

/// A route handler for the completed periods that have not been settled.
pub async fn pending_settlements_endpoint(
    State(state): State<SettlementState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = OffsetDateTime::now_utc().date();

    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_pending_settlements(user_id, today, &connection)?))
}

/// A route handler for settling the latest completed period of a type.
pub async fn trigger_settlement_endpoint(
    State(state): State<SettlementState>,
    Extension(user_id): Extension<UserID>,
    ApiJson(trigger): ApiJson<TriggerSettlement>,
) -> Result<Response, Error> {
    let today = OffsetDateTime::now_utc().date();
    let period = trigger.settlement_type.latest_completed_period(today);

    let connection = lock_connection(&state.db_connection);
    let settlement = settle_period(user_id, trigger.settlement_type, period, &connection)?;

    Ok(created(settlement, "Settlement triggered successfully"))
}

/// A route handler for getting a single settlement.
pub async fn get_settlement_endpoint(
    State(state): State<SettlementState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(settlement_id): ApiPath<SettlementId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_settlement(settlement_id, user_id, &connection)?))
}

/// A route handler for deleting a settlement.
pub async fn delete_settlement_endpoint(
    State(state): State<SettlementState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(settlement_id): ApiPath<SettlementId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    delete_settlement(settlement_id, user_id, &connection)?;

    Ok(ok_with_message((), "Settlement deleted successfully"))
}
