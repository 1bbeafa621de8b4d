//! Income and spending analytics computed from a user's transactions on every request.

mod aggregation;
mod endpoint;
mod window;

pub use aggregation::Totals;
pub use endpoint::get_analytics_endpoint;
