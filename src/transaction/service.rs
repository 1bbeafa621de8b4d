//! Creating, editing and deleting transactions while keeping account balances in step.
//!
//! Each operation runs inside one SQLite transaction, so a failure at any step
//! leaves both the transaction table and the account balances untouched.

use rusqlite::Connection;
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    account::get_active_account,
    database_id::TransactionId,
    transaction::{
        core::{
            NewTransaction, Transaction, TransactionDraft, TransactionPatch, get_transaction,
            insert_transaction, overwrite_transaction, remove_transaction,
        },
        effect::{apply_effect, revert_effect},
    },
};

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Check that every account the draft touches is active and owned by `user_id`.
fn validate_accounts(
    user_id: UserID,
    draft: &TransactionDraft,
    connection: &Connection,
) -> Result<(), Error> {
    for account_id in draft.account_ids() {
        get_active_account(account_id, user_id, connection)?;
    }

    Ok(())
}

/// Create a transaction and apply its effect to the account balances.
///
/// # Errors
/// Returns [Error::Validation] or [Error::SameAccountTransfer] for an invalid payload, or
/// [Error::InvalidAccount] if an account is missing, inactive or owned by another user.
/// No balance is changed when an error is returned.
pub fn create_transaction(
    user_id: UserID,
    new_transaction: NewTransaction,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let draft = TransactionDraft::new(new_transaction, today())?;

    let sql_transaction = connection.transaction()?;
    validate_accounts(user_id, &draft, &sql_transaction)?;
    let transaction = insert_transaction(user_id, draft, &sql_transaction)?;
    apply_effect(&transaction, &sql_transaction)?;
    sql_transaction.commit()?;

    tracing::debug!(
        "Created {} transaction {} for user {user_id}",
        transaction.transaction_type,
        transaction.id
    );

    Ok(transaction)
}

/// Edit a transaction, reverting the effect of the original and applying the effect of the
/// result.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to another user, and
/// the same errors as [create_transaction] for the merged result. No balance is changed when an
/// error is returned.
pub fn update_transaction(
    id: TransactionId,
    user_id: UserID,
    patch: TransactionPatch,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.transaction()?;

    let original = get_transaction(id, user_id, &sql_transaction)?;
    revert_effect(&original, &sql_transaction)?;

    let draft = TransactionDraft::merge(&original, patch)?;
    validate_accounts(user_id, &draft, &sql_transaction)?;

    let updated = overwrite_transaction(&original, draft, &sql_transaction)?;
    apply_effect(&updated, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(updated)
}

/// Delete a transaction and revert its effect on the account balances.
///
/// The accounts do not need to be active, so old transactions of closed accounts can
/// still be removed.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to another user.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.transaction()?;

    let transaction = get_transaction(id, user_id, &sql_transaction)?;
    revert_effect(&transaction, &sql_transaction)?;
    remove_transaction(&transaction, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(transaction)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error, UserID,
        account::{AccountType, NewAccount, create_account, get_account},
        database_id::AccountId,
        test_utils::{create_test_user, test_connection},
        transaction::{
            core::{NewTransaction, TransactionPatch, TransactionType, get_transaction},
            service::{create_transaction, delete_transaction, update_transaction},
        },
    };

    fn open_account(user_id: UserID, balance: Decimal, connection: &Connection) -> AccountId {
        create_account(
            user_id,
            &NewAccount {
                name: "Account".to_owned(),
                account_type: AccountType::Bank,
                balance: Some(balance),
                currency: None,
            },
            connection,
        )
        .expect("Could not create account")
        .id
    }

    fn balance(account_id: AccountId, user_id: UserID, connection: &Connection) -> Decimal {
        get_account(account_id, user_id, connection).unwrap().balance
    }

    fn new_transaction(
        transaction_type: TransactionType,
        amount: Decimal,
        account_id: AccountId,
        to_account_id: Option<AccountId>,
    ) -> NewTransaction {
        NewTransaction {
            transaction_type,
            amount,
            category: "Test".to_owned(),
            description: String::new(),
            date: Some(date!(2026 - 10 - 01)),
            account_id,
            to_account_id,
        }
    }

    #[test]
    fn income_round_trip_restores_balance() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let account = open_account(user_id, dec!(100), &connection);

        let income = create_transaction(
            user_id,
            new_transaction(TransactionType::Income, dec!(50), account, None),
            &mut connection,
        )
        .unwrap();
        assert_eq!(balance(account, user_id, &connection), dec!(150));

        delete_transaction(income.id, user_id, &mut connection).unwrap();

        assert_eq!(balance(account, user_id, &connection), dec!(100));
        assert_eq!(
            get_transaction(income.id, user_id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn transfer_round_trip_restores_both_balances() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let source = open_account(user_id, dec!(200), &connection);
        let destination = open_account(user_id, dec!(10), &connection);

        let transfer = create_transaction(
            user_id,
            new_transaction(TransactionType::Transfer, dec!(75), source, Some(destination)),
            &mut connection,
        )
        .unwrap();
        assert_eq!(balance(source, user_id, &connection), dec!(125));
        assert_eq!(balance(destination, user_id, &connection), dec!(85));

        delete_transaction(transfer.id, user_id, &mut connection).unwrap();

        assert_eq!(balance(source, user_id, &connection), dec!(200));
        assert_eq!(balance(destination, user_id, &connection), dec!(10));
    }

    #[test]
    fn update_applies_the_difference() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let account = open_account(user_id, dec!(100), &connection);
        let expense = create_transaction(
            user_id,
            new_transaction(TransactionType::Expense, dec!(30), account, None),
            &mut connection,
        )
        .unwrap();

        update_transaction(
            expense.id,
            user_id,
            TransactionPatch {
                amount: Some(dec!(45)),
                ..Default::default()
            },
            &mut connection,
        )
        .unwrap();

        assert_eq!(balance(account, user_id, &connection), dec!(55));
    }

    #[test]
    fn same_account_transfer_changes_nothing() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let account = open_account(user_id, dec!(100), &connection);

        let result = create_transaction(
            user_id,
            new_transaction(TransactionType::Transfer, dec!(30), account, Some(account)),
            &mut connection,
        );

        assert_eq!(result, Err(Error::SameAccountTransfer));
        assert_eq!(balance(account, user_id, &connection), dec!(100));
    }

    #[test]
    fn transfer_to_inactive_account_changes_nothing() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let source = open_account(user_id, dec!(100), &connection);
        let closed = open_account(user_id, dec!(0), &connection);
        connection
            .execute("UPDATE account SET is_active = 0 WHERE id = ?1", [closed])
            .unwrap();

        let result = create_transaction(
            user_id,
            new_transaction(TransactionType::Transfer, dec!(30), source, Some(closed)),
            &mut connection,
        );

        assert_eq!(result, Err(Error::InvalidAccount(closed)));
        assert_eq!(balance(source, user_id, &connection), dec!(100));
        assert_eq!(balance(closed, user_id, &connection), dec!(0));
    }

    #[test]
    fn transfer_to_other_users_account_changes_nothing() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let other_user_id = create_test_user("other@bar.baz", &connection).id;
        let source = open_account(user_id, dec!(100), &connection);
        let foreign = open_account(other_user_id, dec!(5), &connection);

        let result = create_transaction(
            user_id,
            new_transaction(TransactionType::Transfer, dec!(30), source, Some(foreign)),
            &mut connection,
        );

        assert_eq!(result, Err(Error::InvalidAccount(foreign)));
        assert_eq!(balance(source, user_id, &connection), dec!(100));
        assert_eq!(balance(foreign, other_user_id, &connection), dec!(5));
    }

    #[test]
    fn failed_update_leaves_balances_unchanged() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let account = open_account(user_id, dec!(100), &connection);
        let expense = create_transaction(
            user_id,
            new_transaction(TransactionType::Expense, dec!(30), account, None),
            &mut connection,
        )
        .unwrap();

        let result = update_transaction(
            expense.id,
            user_id,
            TransactionPatch {
                account_id: Some(999),
                ..Default::default()
            },
            &mut connection,
        );

        assert_eq!(result, Err(Error::InvalidAccount(999)));
        assert_eq!(balance(account, user_id, &connection), dec!(70));
        assert_eq!(
            get_transaction(expense.id, user_id, &connection).unwrap(),
            expense
        );
    }

    #[test]
    fn other_users_transaction_is_not_found() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let other_user_id = create_test_user("other@bar.baz", &connection).id;
        let account = open_account(user_id, dec!(100), &connection);
        let expense = create_transaction(
            user_id,
            new_transaction(TransactionType::Expense, dec!(30), account, None),
            &mut connection,
        )
        .unwrap();

        assert_eq!(
            update_transaction(
                expense.id,
                other_user_id,
                TransactionPatch::default(),
                &mut connection
            ),
            Err(Error::NotFound)
        );
        assert_eq!(
            delete_transaction(expense.id, other_user_id, &mut connection),
            Err(Error::NotFound)
        );
        assert_eq!(balance(account, user_id, &connection), dec!(70));
    }

    #[test]
    fn deleting_transaction_of_closed_account_restores_balance() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let account = open_account(user_id, dec!(100), &connection);
        let expense = create_transaction(
            user_id,
            new_transaction(TransactionType::Expense, dec!(30), account, None),
            &mut connection,
        )
        .unwrap();
        connection
            .execute("UPDATE account SET is_active = 0 WHERE id = ?1", [account])
            .unwrap();

        delete_transaction(expense.id, user_id, &mut connection).unwrap();

        assert_eq!(balance(account, user_id, &connection), dec!(100));
    }

    #[test]
    fn worked_example() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let a = open_account(user_id, dec!(100), &connection);
        let b = open_account(user_id, dec!(0), &connection);

        let income = create_transaction(
            user_id,
            new_transaction(TransactionType::Income, dec!(50), a, None),
            &mut connection,
        )
        .unwrap();
        assert_eq!(balance(a, user_id, &connection), dec!(150));

        let transfer = create_transaction(
            user_id,
            new_transaction(TransactionType::Transfer, dec!(30), a, Some(b)),
            &mut connection,
        )
        .unwrap();
        assert_eq!(balance(a, user_id, &connection), dec!(120));
        assert_eq!(balance(b, user_id, &connection), dec!(30));

        delete_transaction(transfer.id, user_id, &mut connection).unwrap();
        assert_eq!(balance(a, user_id, &connection), dec!(150));
        assert_eq!(balance(b, user_id, &connection), dec!(0));

        delete_transaction(income.id, user_id, &mut connection).unwrap();
        assert_eq!(balance(a, user_id, &connection), dec!(100));
    }

    #[test]
    fn changing_transfer_to_expense_restores_destination() {
        let mut connection = test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection).id;
        let a = open_account(user_id, dec!(100), &connection);
        let b = open_account(user_id, dec!(0), &connection);
        let transfer = create_transaction(
            user_id,
            new_transaction(TransactionType::Transfer, dec!(30), a, Some(b)),
            &mut connection,
        )
        .unwrap();

        let updated = update_transaction(
            transfer.id,
            user_id,
            TransactionPatch {
                transaction_type: Some(TransactionType::Expense),
                ..Default::default()
            },
            &mut connection,
        )
        .unwrap();

        assert_eq!(updated.to_account_id, None);
        assert_eq!(balance(a, user_id, &connection), dec!(70));
        assert_eq!(balance(b, user_id, &connection), dec!(0));
    }
}
