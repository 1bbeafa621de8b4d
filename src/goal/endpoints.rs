//! Route handlers for savings goals.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::Response,
};
use rusqlite::Connection;

use crate::{
    AppState, Error, PaginationConfig, UserID,
    database_id::GoalId,
    db::lock_connection,
    extract::{ApiJson, ApiPath, ApiQuery},
    goal::core::{
        Contribution, GoalPatch, NewGoal, contribute, create_goal, deactivate_goal, get_goal,
        list_goals, update_goal,
    },
    pagination::{PageParams, PageRequest, Paginated},
    response::{created, ok, ok_with_message},
};

/// The state needed for the goal endpoints.
#[derive(Debug, Clone)]
pub struct GoalState {
    /// The config that controls how to page lists of goals.
    pub pagination_config: PaginationConfig,
    /// The database connection for managing goals.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pagination_config: state.pagination_config.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the user's active goals.
pub async fn list_goals_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Response, Error> {
    let page = PageRequest::new(params.page, params.limit, &state.pagination_config)?;

    let connection = lock_connection(&state.db_connection);
    let (goals, total) = list_goals(user_id, page, &connection)?;

    Ok(ok(Paginated::new(goals, page, total)))
}

/// A route handler for creating a goal.
pub async fn create_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    ApiJson(new_goal): ApiJson<NewGoal>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let goal = create_goal(user_id, new_goal, &connection)?;

    Ok(created(goal, "Goal created successfully"))
}

/// A route handler for getting a single goal.
pub async fn get_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(goal_id): ApiPath<GoalId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);

    Ok(ok(get_goal(goal_id, user_id, &connection)?))
}

/// A route handler for editing a goal.
pub async fn update_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(goal_id): ApiPath<GoalId>,
    ApiJson(patch): ApiJson<GoalPatch>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let goal = update_goal(goal_id, user_id, patch, &connection)?;

    Ok(ok_with_message(goal, "Goal updated successfully"))
}

/// A route handler for soft deleting a goal.
pub async fn delete_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(goal_id): ApiPath<GoalId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    deactivate_goal(goal_id, user_id, &connection)?;

    Ok(ok_with_message((), "Goal deleted successfully"))
}

/// A route handler for adding money to a goal.
pub async fn contribute_to_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    ApiPath(goal_id): ApiPath<GoalId>,
    ApiJson(contribution): ApiJson<Contribution>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection);
    let goal = contribute(goal_id, user_id, contribution.amount, &connection)?;
    tracing::debug!("Added {} to goal {goal_id}", contribution.amount);

    Ok(ok_with_message(goal, "Contribution added successfully"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{data, register_user, test_server},
    };

    async fn create_goal(server: &TestServer, token: &str) -> i64 {
        let response = server
            .post(endpoints::GOALS)
            .authorization_bearer(token)
            .json(&json!({
                "name": "New bike",
                "targetAmount": 1200,
                "category": "Savings",
                "targetDate": "2027-03-01"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        data(&body)["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn contribute_increases_current_amount() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        let goal_id = create_goal(&server, &token).await;

        let response = server
            .post(&format_endpoint(endpoints::CONTRIBUTE_TO_GOAL, goal_id))
            .authorization_bearer(&token)
            .json(&json!({ "amount": 150.25 }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let goal = data(&body);
        assert_eq!(goal["currentAmount"].as_f64(), Some(150.25));
        assert_eq!(goal["targetAmount"].as_f64(), Some(1200.0));
        assert_eq!(goal["targetDate"], "2027-03-01");
    }

    #[tokio::test]
    async fn contribute_rejects_zero() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        let goal_id = create_goal(&server, &token).await;

        server
            .post(&format_endpoint(endpoints::CONTRIBUTE_TO_GOAL, goal_id))
            .authorization_bearer(&token)
            .json(&json!({ "amount": 0 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patch_then_list_goals() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        let goal_id = create_goal(&server, &token).await;

        server
            .patch(&format_endpoint(endpoints::GOAL, goal_id))
            .authorization_bearer(&token)
            .json(&json!({ "name": "Road bike" }))
            .await
            .assert_status_ok();

        let response = server
            .get(endpoints::GOALS)
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        let page = data(&body);
        assert_eq!(page["pagination"]["total"], 1);
        assert_eq!(page["data"][0]["name"], "Road bike");
    }

    #[tokio::test]
    async fn deleted_goal_is_not_listed() {
        let server = test_server();
        let token = register_user(&server, "jane@example.com").await;
        let goal_id = create_goal(&server, &token).await;

        server
            .delete(&format_endpoint(endpoints::GOAL, goal_id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let response = server
            .get(endpoints::GOALS)
            .authorization_bearer(&token)
            .await;
        let body: Value = response.json();
        assert_eq!(data(&body)["data"], json!([]));
    }
}
