//! The database document mirrored to the store after every change.

use serde::{Deserialize, Serialize};

use cashflow_debts::Debt;
use cashflow_holders::Holder;
use cashflow_inventory::{
    Catalog, InventoryItem, InventoryMovement, InventorySection, InventoryUnit,
};
use cashflow_treasury::CashTransaction;

use crate::journal::Journal;

/// Every record collection of the book, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub holders: Vec<Holder>,
    pub transactions: Vec<CashTransaction>,
    pub debts: Vec<Debt>,
    pub inventory: Vec<InventoryItem>,
    pub inventory_movements: Vec<InventoryMovement>,
    pub logs: Journal,
    #[serde(flatten)]
    pub catalog: Catalog,
}

/// Stored shape: any collection may be missing from older documents.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDatabase {
    holders: Option<Vec<Holder>>,
    transactions: Option<Vec<CashTransaction>>,
    debts: Option<Vec<Debt>>,
    inventory: Option<Vec<InventoryItem>>,
    inventory_movements: Option<Vec<InventoryMovement>>,
    logs: Option<Journal>,
    units: Option<Vec<InventoryUnit>>,
    sections: Option<Vec<InventorySection>>,
}

impl Database {
    /// Decode a stored document. Collections absent from it are taken from
    /// `fallback` (normally the seed data).
    pub fn from_json(raw: &str, fallback: Database) -> Result<Self, serde_json::Error> {
        let stored: StoredDatabase = serde_json::from_str(raw)?;
        let (fallback_units, fallback_sections) = fallback.catalog.into_parts();

        Ok(Self {
            holders: stored.holders.unwrap_or(fallback.holders),
            transactions: stored.transactions.unwrap_or(fallback.transactions),
            debts: stored.debts.unwrap_or(fallback.debts),
            inventory: stored.inventory.unwrap_or(fallback.inventory),
            inventory_movements: stored
                .inventory_movements
                .unwrap_or(fallback.inventory_movements),
            logs: stored.logs.unwrap_or(fallback.logs),
            catalog: Catalog::new(
                stored.units.unwrap_or(fallback_units),
                stored.sections.unwrap_or(fallback_sections),
            ),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashflow_core::{SectionId, UnitId};

    fn fallback() -> Database {
        let mut catalog = Catalog::default();
        catalog.add_unit(UnitId::new(), "Unidades", "u").unwrap();
        catalog.add_section(SectionId::new(), "General").unwrap();
        Database {
            catalog,
            ..Database::default()
        }
    }

    #[test]
    fn document_uses_expected_top_level_keys() {
        let json: serde_json::Value = serde_json::from_str(&fallback().to_json().unwrap()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in [
            "holders",
            "transactions",
            "debts",
            "inventory",
            "inventoryMovements",
            "logs",
            "units",
            "sections",
        ] {
            assert!(keys.contains(&key), "missing key {key}");
        }
    }

    #[test]
    fn missing_collections_fall_back() {
        let db = Database::from_json(r#"{"debts": [], "sections": []}"#, fallback()).unwrap();
        assert_eq!(db.catalog.units().len(), 1);
        assert!(db.catalog.sections().is_empty());
    }

    #[test]
    fn round_trip_preserves_content() {
        let original = fallback();
        let json = original.to_json().unwrap();
        let decoded = Database::from_json(&json, Database::default()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(Database::from_json("not json", fallback()).is_err());
    }
}
