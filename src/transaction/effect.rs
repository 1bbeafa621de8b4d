//! The effect of a transaction on account balances.
//!
//! A stored transaction always has its effect applied. Changing or removing it
//! means reverting the effect first, and applying the effect of the new state after.

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    Error,
    account::adjust_balance,
    database_id::AccountId,
    transaction::core::{Transaction, TransactionType},
};

/// A signed change to one account's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    /// The account to adjust.
    pub account_id: AccountId,
    /// The amount to add, negative to subtract.
    pub delta: Decimal,
}

/// The balance changes that applying `transaction` makes.
///
/// - income adds to the source account,
/// - expenses and liability payments subtract from the source account,
/// - transfers subtract from the source and add to the destination.
///
/// # Errors
/// Returns [Error::TransferWithoutDestination] for a transfer with no destination account.
pub fn balance_changes(transaction: &Transaction) -> Result<Vec<BalanceChange>, Error> {
    let amount = transaction.amount;
    let source = transaction.account_id;

    let changes = match (transaction.transaction_type, transaction.to_account_id) {
        (TransactionType::Income, _) => vec![BalanceChange {
            account_id: source,
            delta: amount,
        }],
        (TransactionType::Expense | TransactionType::Liability, _) => vec![BalanceChange {
            account_id: source,
            delta: -amount,
        }],
        (TransactionType::Transfer, Some(destination)) => vec![
            BalanceChange {
                account_id: source,
                delta: -amount,
            },
            BalanceChange {
                account_id: destination,
                delta: amount,
            },
        ],
        (TransactionType::Transfer, None) => {
            tracing::error!("Transfer {} has no destination account", transaction.id);
            return Err(Error::TransferWithoutDestination(transaction.id));
        }
    };

    Ok(changes)
}

/// Apply the effect of `transaction` to its accounts.
///
/// # Errors
/// Returns [Error::InvalidAccount] if an account no longer exists, or
/// [Error::TransferWithoutDestination] if a transfer is missing its destination.
pub fn apply_effect(transaction: &Transaction, connection: &Connection) -> Result<(), Error> {
    for change in balance_changes(transaction)? {
        adjust_balance(
            change.account_id,
            transaction.user_id,
            change.delta,
            connection,
        )?;
    }

    Ok(())
}

/// Undo the effect of `transaction` on its accounts, the exact inverse of [apply_effect].
///
/// # Errors
/// Returns [Error::InvalidAccount] if an account no longer exists, or
/// [Error::TransferWithoutDestination] if a transfer is missing its destination.
pub fn revert_effect(transaction: &Transaction, connection: &Connection) -> Result<(), Error> {
    for change in balance_changes(transaction)? {
        adjust_balance(
            change.account_id,
            transaction.user_id,
            -change.delta,
            connection,
        )?;
    }

    Ok(())
}
