//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/accounts/{account_id}', use [format_endpoint].

/// Liveness check.
pub const HEALTH: &str = "/health";

/// The route for registering a new user.
pub const REGISTER: &str = "/auth/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/auth/login";
/// The route for exchanging a refresh token for a new token pair.
pub const REFRESH: &str = "/auth/refresh";
/// The route for getting the current user.
pub const ME: &str = "/auth/me";

/// The route to list and create accounts.
pub const ACCOUNTS: &str = "/accounts";
/// The route for the totals across the user's active accounts.
pub const ACCOUNT_SUMMARY: &str = "/accounts/summary";
/// The route to access a single account.
pub const ACCOUNT: &str = "/accounts/{account_id}";

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route for the most recent transactions.
pub const RECENT_TRANSACTIONS: &str = "/transactions/recent";
/// The route for transaction analytics.
pub const TRANSACTION_ANALYTICS: &str = "/transactions/analytics";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/transactions/{transaction_id}";

/// The route for analytics over a reporting period.
pub const ANALYTICS: &str = "/analytics";

/// The route to list and create budgets.
pub const BUDGETS: &str = "/budgets";
/// The route to access a single budget.
pub const BUDGET: &str = "/budgets/{budget_id}";
/// The route to recompute a budget's spending from its transactions.
pub const RECALCULATE_BUDGET: &str = "/budgets/{budget_id}/recalculate";

/// The route to list and create savings goals.
pub const GOALS: &str = "/goals";
/// The route to access a single savings goal.
pub const GOAL: &str = "/goals/{goal_id}";
/// The route to add money to a savings goal.
pub const CONTRIBUTE_TO_GOAL: &str = "/goals/{goal_id}/contribute";

/// The route to list and create bills.
pub const BILLS: &str = "/bills";
/// The route for bills due soon.
pub const UPCOMING_BILLS: &str = "/bills/upcoming";
/// The route for unpaid bills past their due date.
pub const OVERDUE_BILLS: &str = "/bills/overdue";
/// The route to access a single bill.
pub const BILL: &str = "/bills/{bill_id}";
/// The route to mark a bill as paid.
pub const PAY_BILL: &str = "/bills/{bill_id}/pay";

/// The route to list and create settlements.
pub const SETTLEMENTS: &str = "/settlements";
/// The route for completed periods that have not been settled.
pub const PENDING_SETTLEMENTS: &str = "/settlements/pending";
/// The route to settle the most recently completed period.
pub const TRIGGER_SETTLEMENT: &str = "/settlements/trigger";
/// The route to access a single settlement.
pub const SETTLEMENT: &str = "/settlements/{settlement_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/goals/{goal_id}/contribute', '{goal_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
