//! Monetary amounts and stock quantities.
//!
//! Both are exact decimals: balances are summed and reversed many times, and
//! average costs are divided, so binary floating point is not an option.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Amount of money in the book's single currency.
pub type Money = Decimal;

/// Stock quantity (fractional for units like kg or liters).
pub type Quantity = Decimal;

/// Require a strictly positive value.
pub fn ensure_positive(value: Decimal, field: &str) -> DomainResult<()> {
    if value <= Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} must be positive")));
    }
    Ok(())
}

/// Require a zero or positive value.
pub fn ensure_non_negative(value: Decimal, field: &str) -> DomainResult<()> {
    if value < Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

/// Require a non-blank string, returning it trimmed.
pub fn ensure_not_blank(value: &str, field: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
