//! Field checks shared by the create and patch payloads.

use rust_decimal::Decimal;

use crate::Error;

/// Trim `value`, rejecting it if nothing is left.
///
/// # Errors
/// Returns [Error::Validation] naming `field` if `value` is blank.
pub fn non_empty(field: &str, value: &str) -> Result<String, Error> {
    let value = value.trim();

    if value.is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }

    Ok(value.to_owned())
}

/// Reject amounts that are zero or negative.
///
/// # Errors
/// Returns [Error::Validation] naming `field` if `amount` is not positive.
pub fn positive_amount(field: &str, amount: Decimal) -> Result<Decimal, Error> {
    if amount <= Decimal::ZERO {
        return Err(Error::Validation(format!(
            "{field} must be greater than zero"
        )));
    }

    Ok(amount)
}

/// Add `amount` to `total`, rejecting a sum too large to represent.
///
/// # Errors
/// Returns [Error::Validation] naming `field` if the sum overflows.
pub fn add_amount(field: &str, total: Decimal, amount: Decimal) -> Result<Decimal, Error> {
    total
        .checked_add(amount)
        .ok_or_else(|| Error::Validation(format!("{field} is out of range")))
}
