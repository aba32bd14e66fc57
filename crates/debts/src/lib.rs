//! Debts module: receivables and payables with an approval step and settlement.
//!
//! Settling a debt does not move money by itself. The book records a PENDING
//! cash transaction for it and links that transaction back to the debt.

pub mod debt;

pub use debt::{
    DEBT_SETTLEMENT_CATEGORY, DeleteDebt, Debt, DebtCommand, DebtDeleted, DebtEdited, DebtEvent,
    DebtKind, DebtRegistered, DebtRejected, DebtSettled, DebtValidated, EditDebt, RegisterDebt,
    RejectDebt, SettleDebt, ValidateDebt, settlement_description, settlement_kind,
};
