//! Bearer token authentication: issuing tokens, the auth guard and the auth endpoints.

mod endpoints;
mod middleware;
mod token;

pub use endpoints::{log_in, me, refresh, register};
pub use middleware::auth_guard;
pub use token::{TokenConfig, TokenKeys};
