//! Bills are payments due on a date, optionally recurring.

mod core;
mod endpoints;

pub use core::create_bill_table;
pub use endpoints::{
    create_bill_endpoint, delete_bill_endpoint, get_bill_endpoint, list_bills_endpoint,
    overdue_bills_endpoint, pay_bill_endpoint, update_bill_endpoint, upcoming_bills_endpoint,
};
