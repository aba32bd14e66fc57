//! Balance effects of cash transactions.
//!
//! Only VALIDATED transactions move money. A status change first undoes the
//! effect of the old status and then applies the effect of the new one, which
//! reduces to: leaving VALIDATED negates the effects, entering VALIDATED
//! applies them, anything else is a no-op.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cashflow_core::{DomainError, DomainResult, HolderId, Money};

use crate::transaction::{CashTransaction, TransactionKind, TransactionStatus};

/// A signed change to one holder's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub holder_id: HolderId,
    pub delta: Money,
}

impl BalanceDelta {
    pub fn new(holder_id: HolderId, delta: Money) -> Self {
        Self { holder_id, delta }
    }

    pub fn negated(self) -> Self {
        Self {
            holder_id: self.holder_id,
            delta: -self.delta,
        }
    }
}

/// Deltas a validated transaction applies.
///
/// A transfer without a target has no effect. The book refuses such transfers
/// at creation, so this only matters for hand-edited data files.
pub fn effects(
    kind: TransactionKind,
    amount: Money,
    holder_id: HolderId,
    target_holder_id: Option<HolderId>,
) -> Vec<BalanceDelta> {
    match kind {
        TransactionKind::Income => vec![BalanceDelta::new(holder_id, amount)],
        TransactionKind::Expense => vec![BalanceDelta::new(holder_id, -amount)],
        TransactionKind::Transfer => match target_holder_id {
            Some(target) => vec![
                BalanceDelta::new(holder_id, -amount),
                BalanceDelta::new(target, amount),
            ],
            None => vec![],
        },
    }
}

/// Deltas implied by moving `tx` from `from` to `to`.
pub fn transition_deltas(
    tx: &CashTransaction,
    from: TransactionStatus,
    to: TransactionStatus,
) -> Vec<BalanceDelta> {
    let base = effects(tx.kind(), tx.amount(), tx.holder_id(), tx.target_holder_id());
    match (from.is_validated(), to.is_validated()) {
        (true, false) => base.into_iter().map(BalanceDelta::negated).collect(),
        (false, true) => base,
        _ => vec![],
    }
}

/// Sum of deltas per holder, dropping holders that net to zero.
pub fn net_by_holder(deltas: &[BalanceDelta]) -> DomainResult<Vec<BalanceDelta>> {
    let mut out: Vec<BalanceDelta> = Vec::new();
    for d in deltas {
        match out.iter_mut().find(|o| o.holder_id == d.holder_id) {
            Some(existing) => {
                existing.delta = existing.delta.checked_add(d.delta).ok_or_else(|| {
                    DomainError::validation(format!(
                        "net balance change of holder {} overflows",
                        d.holder_id
                    ))
                })?;
            }
            None => out.push(*d),
        }
    }
    out.retain(|d| d.delta != Decimal::ZERO);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn income_credits_and_expense_debits_the_holder() {
        let h = HolderId::new();
        assert_eq!(
            effects(TransactionKind::Income, dec!(10), h, None),
            vec![BalanceDelta::new(h, dec!(10))]
        );
        assert_eq!(
            effects(TransactionKind::Expense, dec!(10), h, None),
            vec![BalanceDelta::new(h, dec!(-10))]
        );
    }

    #[test]
    fn transfer_moves_money_between_holders() {
        let from = HolderId::new();
        let to = HolderId::new();
        let deltas = effects(TransactionKind::Transfer, dec!(250), from, Some(to));
        assert_eq!(
            deltas,
            vec![BalanceDelta::new(from, dec!(-250)), BalanceDelta::new(to, dec!(250))]
        );
        assert!(net_by_holder(&deltas).unwrap().len() == 2);
    }

    #[test]
    fn transfer_without_target_has_no_effect() {
        assert!(effects(TransactionKind::Transfer, dec!(5), HolderId::new(), None).is_empty());
    }

    #[test]
    fn net_by_holder_merges_and_drops_zeroes() {
        let a = HolderId::new();
        let b = HolderId::new();
        let deltas = [
            BalanceDelta::new(a, dec!(5)),
            BalanceDelta::new(b, dec!(3)),
            BalanceDelta::new(a, dec!(-5)),
        ];
        assert_eq!(net_by_holder(&deltas).unwrap(), vec![BalanceDelta::new(b, dec!(3))]);
    }

    #[test]
    fn net_by_holder_refuses_overflow() {
        let a = HolderId::new();
        let deltas = [BalanceDelta::new(a, Decimal::MAX), BalanceDelta::new(a, dec!(1))];
        assert!(net_by_holder(&deltas).is_err());
    }
}
