//! The book's event stream: every committed domain event, tagged by origin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cashflow_debts::DebtEvent;
use cashflow_events::{Event, EventEnvelope};
use cashflow_holders::HolderEvent;
use cashflow_inventory::InventoryEvent;
use cashflow_treasury::TransactionEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stream", content = "event", rename_all = "snake_case")]
pub enum BookEvent {
    Holder(HolderEvent),
    Transaction(TransactionEvent),
    Debt(DebtEvent),
    Inventory(InventoryEvent),
}

/// What subscribers receive.
pub type BookEnvelope = EventEnvelope<BookEvent>;

impl BookEvent {
    pub fn aggregate_type(&self) -> &'static str {
        match self {
            BookEvent::Holder(_) => "holders.holder",
            BookEvent::Transaction(_) => "treasury.transaction",
            BookEvent::Debt(_) => "debts.debt",
            BookEvent::Inventory(_) => "inventory.item",
        }
    }

    pub fn aggregate_id(&self) -> Uuid {
        match self {
            BookEvent::Holder(e) => *e.holder_id().as_uuid(),
            BookEvent::Transaction(e) => *e.transaction_id().as_uuid(),
            BookEvent::Debt(e) => *e.debt_id().as_uuid(),
            BookEvent::Inventory(e) => *e.item_id().as_uuid(),
        }
    }
}

impl Event for BookEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookEvent::Holder(e) => e.event_type(),
            BookEvent::Transaction(e) => e.event_type(),
            BookEvent::Debt(e) => e.event_type(),
            BookEvent::Inventory(e) => e.event_type(),
        }
    }

    fn version(&self) -> u32 {
        match self {
            BookEvent::Holder(e) => e.version(),
            BookEvent::Transaction(e) => e.version(),
            BookEvent::Debt(e) => e.version(),
            BookEvent::Inventory(e) => e.version(),
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BookEvent::Holder(e) => e.occurred_at(),
            BookEvent::Transaction(e) => e.occurred_at(),
            BookEvent::Debt(e) => e.occurred_at(),
            BookEvent::Inventory(e) => e.occurred_at(),
        }
    }
}
