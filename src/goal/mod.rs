//! Savings goals track progress towards a target amount.

mod core;
mod endpoints;

pub use core::{create_goal_table, record_contribution_for_category};
pub use endpoints::{
    contribute_to_goal_endpoint, create_goal_endpoint, delete_goal_endpoint, get_goal_endpoint,
    list_goals_endpoint, update_goal_endpoint,
};
