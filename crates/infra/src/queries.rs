//! Read side of the book: what the logged-in holder may see, filtered and
//! aggregated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use cashflow_auth::{Capability, authorize, is_allowed};
use cashflow_core::{DomainError, ItemId, Money, Quantity};
use cashflow_debts::{Debt, DebtKind};
use cashflow_holders::Holder;
use cashflow_inventory::{InventoryItem, InventoryMovement};
use cashflow_treasury::{CashTransaction, TransactionStatus};

use crate::book::Book;
use crate::error::BookResult;
use crate::journal::LogEntry;
use crate::store::KeyValueStore;

/// Inclusive range of calendar dates (UTC). Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Case-insensitive match on description, category or amount.
    pub text: String,
    pub status: Option<TransactionStatus>,
    pub dates: DateRange,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &CashTransaction) -> bool {
        let needle = self.text.trim().to_lowercase();
        let text_ok = needle.is_empty()
            || tx.description().to_lowercase().contains(&needle)
            || tx.category().to_lowercase().contains(&needle)
            || tx.amount().to_string().contains(&needle);

        text_ok
            && self.status.is_none_or(|s| tx.status() == s)
            && self.dates.contains(tx.date())
    }
}

/// Headline figures over what the current holder can see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Sum of visible holder balances.
    pub total_cash: Money,
    pub receivables_total: Money,
    pub receivables_open: usize,
    pub payables_total: Money,
    pub payables_open: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventorySortKey {
    #[default]
    Name,
    Quantity,
    Section,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryQuery {
    /// Case-insensitive match on name or section.
    pub text: String,
    pub section: Option<String>,
    pub sort: InventorySortKey,
    pub direction: SortDirection,
}

/// One line of the inventory listing. Cost figures are `None` for holders
/// who may not see them; `total_value` is also `None` when it overflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub section: String,
    pub unit: String,
    pub quantity: Quantity,
    pub min_stock: Quantity,
    pub low_stock: bool,
    pub average_cost: Option<Money>,
    pub total_value: Option<Money>,
}

fn checked_total(values: impl IntoIterator<Item = Money>, label: &str) -> BookResult<Money> {
    values
        .into_iter()
        .try_fold(Money::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| DomainError::invariant(format!("{label} exceed the decimal range")).into())
}

impl<S: KeyValueStore> Book<S> {
    pub fn visible_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> BookResult<Vec<&CashTransaction>> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewTransactions)?;
        let see_all = actor.is_supervisor();

        Ok(self
            .db
            .transactions
            .iter()
            .filter(|tx| see_all || tx.involves(actor.holder_id))
            .filter(|tx| filter.matches(tx))
            .collect())
    }

    pub fn visible_holders(&self) -> BookResult<Vec<&Holder>> {
        let actor = self.current_principal()?;
        let see_all = is_allowed(&actor, Capability::ViewHolders);
        Ok(self
            .db
            .holders
            .iter()
            .filter(|h| see_all || h.id_typed() == actor.holder_id)
            .collect())
    }

    /// Every debt, or nothing without the debts view.
    pub fn visible_debts(&self) -> BookResult<Vec<&Debt>> {
        let actor = self.current_principal()?;
        if !is_allowed(&actor, Capability::ViewDebts) {
            return Ok(Vec::new());
        }
        Ok(self.db.debts.iter().collect())
    }

    /// Unpaid debts of one kind.
    pub fn open_debts(&self, kind: DebtKind) -> BookResult<Vec<&Debt>> {
        Ok(self
            .visible_debts()?
            .into_iter()
            .filter(|d| d.kind() == kind && !d.is_paid())
            .collect())
    }

    /// Paid debts whose payment date falls in `range`, latest payment first.
    pub fn settled_debts(&self, range: &DateRange) -> BookResult<Vec<&Debt>> {
        let mut debts: Vec<&Debt> = self
            .visible_debts()?
            .into_iter()
            .filter(|d| d.is_paid() && d.payment_date().is_some_and(|at| range.contains(at)))
            .collect();
        debts.sort_by(|a, b| b.payment_date().cmp(&a.payment_date()));
        Ok(debts)
    }

    /// Fails rather than wrapping when a total does not fit a decimal.
    pub fn dashboard(&self) -> BookResult<Dashboard> {
        let mut dashboard = Dashboard {
            total_cash: checked_total(
                self.visible_holders()?.iter().map(|h| h.balance()),
                "total cash",
            )?,
            ..Dashboard::default()
        };

        for debt in self.visible_debts()?.into_iter().filter(|d| !d.is_paid()) {
            let (total, open, label) = match debt.kind() {
                DebtKind::Receivable => (
                    &mut dashboard.receivables_total,
                    &mut dashboard.receivables_open,
                    "receivables",
                ),
                DebtKind::Payable => (
                    &mut dashboard.payables_total,
                    &mut dashboard.payables_open,
                    "payables",
                ),
            };
            *total = checked_total([*total, debt.amount()], label)?;
            *open += 1;
        }
        Ok(dashboard)
    }

    pub fn inventory_listing(&self, query: &InventoryQuery) -> BookResult<Vec<InventoryRow>> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewInventory)?;
        let show_cost = is_allowed(&actor, Capability::ViewInventoryCost);

        let needle = query.text.trim().to_lowercase();
        let mut items: Vec<&InventoryItem> = self
            .db
            .inventory
            .iter()
            .filter(|i| {
                needle.is_empty()
                    || i.name().to_lowercase().contains(&needle)
                    || i.section().to_lowercase().contains(&needle)
            })
            .filter(|i| query.section.as_deref().is_none_or(|s| i.section() == s))
            .collect();

        items.sort_by(|a, b| {
            let ord = match query.sort {
                InventorySortKey::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
                InventorySortKey::Quantity => a.quantity().cmp(&b.quantity()),
                InventorySortKey::Section => {
                    a.section().to_lowercase().cmp(&b.section().to_lowercase())
                }
            };
            match query.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });

        Ok(items
            .into_iter()
            .map(|i| InventoryRow {
                id: i.id_typed(),
                name: i.name().to_string(),
                description: i.description().to_string(),
                section: i.section().to_string(),
                unit: i.unit().to_string(),
                quantity: i.quantity(),
                min_stock: i.min_stock(),
                low_stock: i.is_below_min_stock(),
                average_cost: show_cost.then(|| i.average_cost()),
                total_value: show_cost.then(|| i.total_value()).flatten(),
            })
            .collect())
    }

    /// Movements dated within `range`, newest first.
    pub fn movement_history(&self, range: &DateRange) -> BookResult<Vec<&InventoryMovement>> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewInventory)?;

        let mut movements: Vec<&InventoryMovement> = self
            .db
            .inventory_movements
            .iter()
            .filter(|m| range.contains(m.date))
            .collect();
        movements.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(movements)
    }

    /// Items at or below their minimum stock.
    pub fn low_stock_items(&self) -> BookResult<Vec<&InventoryItem>> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewInventory)?;
        Ok(self
            .db
            .inventory
            .iter()
            .filter(|i| i.is_below_min_stock())
            .collect())
    }

    /// The audit journal, newest first.
    pub fn journal(&self) -> BookResult<&[LogEntry]> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewJournal)?;
        Ok(self.db.logs.entries())
    }
}
