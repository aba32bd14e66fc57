//! First-run data: three holders, the opening capital and a small inventory.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use cashflow_auth::{Role, ViewPermissions};
use cashflow_core::{
    Aggregate, DomainResult, HolderId, ItemId, Money, Quantity, SectionId, TransactionId, UnitId,
};
use cashflow_holders::{Holder, HolderCommand, RegisterHolder};
use cashflow_inventory::{
    Catalog, CreateItem, InventoryCommand, InventoryItem, SetMinStock,
};
use cashflow_treasury::{
    CashTransaction, RecordTransaction, TransactionCommand, TransactionKind, TransactionStatus,
};

use crate::journal::Journal;
use crate::snapshot::Database;

/// Password given to seeded users and to new users created without one.
pub const DEFAULT_PASSWORD: &str = "123";

struct SeedHolder {
    name: &'static str,
    username: &'static str,
    balance: Money,
    role: Role,
    permissions: ViewPermissions,
}

struct SeedItem {
    name: &'static str,
    description: &'static str,
    quantity: Quantity,
    average_cost: Money,
    unit: &'static str,
    section: &'static str,
    min_stock: Quantity,
}

const UNITS: [(&str, &str); 5] = [
    ("Unidades", "u"),
    ("Kilogramos", "kg"),
    ("Litros", "l"),
    ("Metros", "m"),
    ("Cajas", "caja"),
];

const SECTIONS: [&str; 4] = ["General", "Bodega Principal", "Oficina", "Accesorios"];

fn seed_holders() -> [SeedHolder; 3] {
    [
        SeedHolder {
            name: "Admin General",
            username: "admin",
            balance: Decimal::new(5000, 0),
            role: Role::Admin,
            permissions: ViewPermissions::ALL,
        },
        SeedHolder {
            name: "Juan (Ventas)",
            username: "juan",
            balance: Decimal::new(1200, 0),
            role: Role::Employee,
            permissions: ViewPermissions::default(),
        },
        SeedHolder {
            name: "Maria (Contadora)",
            username: "maria",
            balance: Decimal::ZERO,
            role: Role::Accountant,
            permissions: ViewPermissions::ALL,
        },
    ]
}

fn seed_items() -> [SeedItem; 2] {
    [
        SeedItem {
            name: "Laptop Dell Inspiron",
            description: "Intel Core i5, 8GB RAM, 256GB SSD. Office staff machine.",
            quantity: Decimal::new(5, 0),
            average_cost: Decimal::new(45000, 2),
            unit: "unidades",
            section: "Oficina",
            min_stock: Decimal::new(2, 0),
        },
        SeedItem {
            name: "Mouse Inalámbrico",
            description: "Generic optical mouse, AA battery included.",
            quantity: Decimal::new(12, 0),
            average_cost: Decimal::new(1550, 2),
            unit: "unidades",
            section: "Accesorios",
            min_stock: Decimal::new(5, 0),
        },
    ]
}

/// Build the initial database.
///
/// The opening capital transaction is recorded as VALIDATED but the seeded
/// balances already include it, so its balance deltas are not applied.
pub fn seed_database(now: DateTime<Utc>) -> DomainResult<Database> {
    let mut holders = Vec::new();
    for seed in seed_holders() {
        let mut holder = Holder::empty(HolderId::new());
        holder.execute(&HolderCommand::RegisterHolder(RegisterHolder {
            holder_id: holder.id_typed(),
            name: seed.name.to_string(),
            username: seed.username.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            role: seed.role,
            permissions: seed.permissions,
            opening_balance: seed.balance,
            occurred_at: now,
        }))?;
        holders.push(holder);
    }

    let admin = holders[0].id_typed();
    let mut capital = CashTransaction::empty(TransactionId::new());
    capital.execute(&TransactionCommand::RecordTransaction(RecordTransaction {
        transaction_id: capital.id_typed(),
        kind: TransactionKind::Income,
        amount: Decimal::new(1000, 0),
        holder_id: admin,
        target_holder_id: None,
        description: "Capital inicial".to_string(),
        category: "Capital".to_string(),
        status: TransactionStatus::Validated,
        created_by: admin,
        occurred_at: now,
    }))?;

    let mut inventory = Vec::new();
    for seed in seed_items() {
        let mut item = InventoryItem::empty(ItemId::new());
        item.execute(&InventoryCommand::CreateItem(CreateItem {
            item_id: item.id_typed(),
            name: seed.name.to_string(),
            description: seed.description.to_string(),
            quantity: seed.quantity,
            unit_cost: seed.average_cost,
            unit: seed.unit.to_string(),
            section: seed.section.to_string(),
            occurred_at: now,
        }))?;
        item.execute(&InventoryCommand::SetMinStock(SetMinStock {
            item_id: item.id_typed(),
            min_stock: seed.min_stock,
            occurred_at: now,
        }))?;
        inventory.push(item);
    }

    let mut catalog = Catalog::default();
    for (name, abbreviation) in UNITS {
        catalog.add_unit(UnitId::new(), name, abbreviation)?;
    }
    for name in SECTIONS {
        catalog.add_section(SectionId::new(), name)?;
    }

    Ok(Database {
        holders,
        transactions: vec![capital],
        debts: Vec::new(),
        inventory,
        inventory_movements: Vec::new(),
        logs: Journal::default(),
        catalog,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashflow_auth::LoginAccount;
    use rust_decimal_macros::dec;

    #[test]
    fn seed_has_three_holders_and_opening_capital() {
        let db = seed_database(Utc::now()).unwrap();
        let usernames: Vec<&str> = db.holders.iter().map(|h| h.username()).collect();
        assert_eq!(usernames, ["admin", "juan", "maria"]);
        assert_eq!(db.holders[0].balance(), dec!(5000));
        assert_eq!(db.holders[1].permissions(), ViewPermissions::default());
        assert!(db.holders.iter().all(|h| h.password() == DEFAULT_PASSWORD));

        assert_eq!(db.transactions.len(), 1);
        assert_eq!(db.transactions[0].amount(), dec!(1000));
        assert_eq!(db.transactions[0].status(), TransactionStatus::Validated);
    }

    #[test]
    fn seed_inventory_and_catalog() {
        let db = seed_database(Utc::now()).unwrap();
        assert_eq!(db.inventory.len(), 2);
        assert_eq!(db.inventory[0].average_cost(), dec!(450.00));
        assert_eq!(db.inventory[1].min_stock(), dec!(5));
        assert!(db.inventory_movements.is_empty());
        assert_eq!(db.catalog.units().len(), 5);
        assert_eq!(db.catalog.sections()[1].name, "Bodega Principal");
    }
}
