//! Inputs of book operations, as a caller fills them in.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use cashflow_auth::{Role, ViewPermissions};
use cashflow_core::{HolderId, ItemId, Money, Quantity};
use cashflow_debts::DebtKind;
use cashflow_inventory::MovementKind;
use cashflow_treasury::TransactionKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: Money,
    /// Custodian of the cash. Defaults to the acting holder; only supervisors
    /// may name someone else.
    pub holder_id: Option<HolderId>,
    pub target_holder_id: Option<HolderId>,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHolder {
    pub name: String,
    pub username: String,
    /// Blank or missing means the default password.
    pub password: Option<String>,
    pub role: Role,
    pub permissions: ViewPermissions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderUpdate {
    pub name: String,
    pub username: String,
    /// Blank or missing keeps the current password.
    pub password: Option<String>,
    pub role: Role,
    pub permissions: ViewPermissions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDebt {
    pub kind: DebtKind,
    pub entity_name: String,
    pub amount: Money,
    pub description: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtUpdate {
    pub entity_name: String,
    pub amount: Money,
    pub description: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub description: String,
    pub quantity: Quantity,
    pub unit_cost: Money,
    pub unit: String,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub item_id: ItemId,
    pub kind: MovementKind,
    pub quantity: Quantity,
    pub unit_cost: Money,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: String,
    pub average_cost: Money,
    pub description: String,
}
