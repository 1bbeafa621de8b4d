//! Period settlements summarising a finished month or year.

mod core;
mod endpoints;

pub use core::{SettlementType, create_settlement_table};
pub use endpoints::{
    create_settlement_endpoint, delete_settlement_endpoint, get_settlement_endpoint,
    list_settlements_endpoint, pending_settlements_endpoint, trigger_settlement_endpoint,
};
