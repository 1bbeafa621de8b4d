//! Accounts hold the balances that transactions move money in and out of.

mod core;
mod endpoints;

pub use core::{adjust_balance, create_account_table, get_active_account};
pub use endpoints::{
    account_summary_endpoint, create_account_endpoint, delete_account_endpoint,
    get_account_endpoint, list_accounts_endpoint, update_account_endpoint,
};

#[cfg(test)]
pub use core::{AccountType, NewAccount, create_account, get_account};
