//! Budgets cap spending in a category over a weekly, monthly, yearly or custom period.

mod core;
mod endpoints;

pub use core::{create_budget_table, record_spending};
pub use endpoints::{
    create_budget_endpoint, delete_budget_endpoint, get_budget_endpoint, list_budgets_endpoint,
    recalculate_budget_endpoint, update_budget_endpoint,
};
