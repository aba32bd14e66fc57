//! Stock movement history.
//!
//! Movements are plain records derived from item events. They keep a snapshot
//! of the item name so history stays readable if the item is renamed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cashflow_core::{Entity, ItemId, Money, MovementId, Quantity};

use crate::item::InventoryEvent;

/// Reason written on the movement generated for an item's opening stock.
pub const INITIAL_STOCK_REASON: &str = "Initial stock";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    In,
    Out,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "IN",
            MovementKind::Out => "OUT",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementKind {
    type Err = cashflow_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IN" => Ok(MovementKind::In),
            "OUT" => Ok(MovementKind::Out),
            other => Err(cashflow_core::DomainError::validation(format!(
                "unknown movement kind '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMovement {
    pub id: MovementId,
    pub item_id: ItemId,
    pub item_name: String,
    pub kind: MovementKind,
    pub quantity: Quantity,
    /// Purchase cost for IN, average cost at the time for OUT.
    pub unit_cost: Money,
    pub date: DateTime<Utc>,
    pub reason: String,
}

impl InventoryMovement {
    /// Movement record implied by an item event, if any.
    ///
    /// Creation with zero quantity, edits and min stock changes produce none.
    pub fn from_event(id: MovementId, item_name: &str, event: &InventoryEvent) -> Option<Self> {
        let (kind, quantity, unit_cost, reason, date) = match event {
            InventoryEvent::ItemCreated(e) if !e.quantity.is_zero() => (
                MovementKind::In,
                e.quantity,
                e.unit_cost,
                INITIAL_STOCK_REASON.to_string(),
                e.occurred_at,
            ),
            InventoryEvent::StockReceived(e) => (
                MovementKind::In,
                e.quantity,
                e.unit_cost,
                e.reason.clone(),
                e.occurred_at,
            ),
            InventoryEvent::StockIssued(e) => (
                MovementKind::Out,
                e.quantity,
                e.unit_cost,
                e.reason.clone(),
                e.occurred_at,
            ),
            _ => return None,
        };

        Some(Self {
            id,
            item_id: event.item_id(),
            item_name: item_name.to_string(),
            kind,
            quantity,
            unit_cost,
            date,
            reason,
        })
    }

    /// Quantity times unit cost, `None` if it does not fit a decimal.
    pub fn value(&self) -> Option<Money> {
        self.quantity.checked_mul(self.unit_cost)
    }
}

impl Entity for InventoryMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemCreated, ItemEdited, StockIssued};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn created(quantity: Quantity) -> InventoryEvent {
        InventoryEvent::ItemCreated(ItemCreated {
            item_id: ItemId::new(),
            name: "Mouse".to_string(),
            description: String::new(),
            quantity,
            unit_cost: dec!(15.50),
            unit: "u".to_string(),
            section: "Accesorios".to_string(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn opening_stock_becomes_initial_in_movement() {
        let m = InventoryMovement::from_event(MovementId::new(), "Mouse", &created(dec!(12)))
            .unwrap();
        assert_eq!(m.kind, MovementKind::In);
        assert_eq!(m.reason, INITIAL_STOCK_REASON);
        assert_eq!(m.value(), Some(dec!(186.00)));
    }

    #[test]
    fn empty_creation_and_edits_produce_no_movement() {
        let empty = created(Decimal::ZERO);
        assert!(InventoryMovement::from_event(MovementId::new(), "Mouse", &empty).is_none());
        let edit = InventoryEvent::ItemEdited(ItemEdited {
            item_id: ItemId::new(),
            name: "Mouse".to_string(),
            average_cost: dec!(1),
            description: String::new(),
            occurred_at: Utc::now(),
        });
        assert!(InventoryMovement::from_event(MovementId::new(), "Mouse", &edit).is_none());
    }

    #[test]
    fn issue_is_recorded_as_out_at_issue_cost() {
        let issued = InventoryEvent::StockIssued(StockIssued {
            item_id: ItemId::new(),
            quantity: dec!(2),
            unit_cost: dec!(450),
            new_quantity: dec!(3),
            reason: "Assigned to sales".to_string(),
            occurred_at: Utc::now(),
        });
        let m = InventoryMovement::from_event(MovementId::new(), "Laptop", &issued).unwrap();
        assert_eq!(m.kind, MovementKind::Out);
        assert_eq!(m.unit_cost, dec!(450));
        assert_eq!(m.item_name, "Laptop");
    }

    #[test]
    fn kind_parses_from_text() {
        assert_eq!("out".parse::<MovementKind>().unwrap(), MovementKind::Out);
        assert!("sideways".parse::<MovementKind>().is_err());
    }
}
