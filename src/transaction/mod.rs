//! Transactions and the account balance maintenance that goes with them.

mod core;
mod effect;
mod endpoints;
mod query;
mod service;

pub use core::{Transaction, TransactionType, create_transaction_table};
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
    list_transactions_endpoint, recent_transactions_endpoint, update_transaction_endpoint,
};
pub use query::get_transactions_in_range;

#[cfg(test)]
pub use core::NewTransaction;
#[cfg(test)]
pub use service::create_transaction;
