//! Inventory domain module.
//!
//! Stock is valued at weighted average cost. This crate contains the item
//! aggregate, the movement history records derived from its events, and the
//! unit/section catalog. Pure domain logic only (no IO, no storage).

pub mod catalog;
pub mod item;
pub mod movement;

pub use catalog::{Catalog, InventorySection, InventoryUnit};
pub use item::{
    CreateItem, EditItem, InventoryCommand, InventoryEvent, InventoryItem, ItemCreated,
    ItemEdited, MinStockSet, RecordMovement, SetMinStock, StockIssued, StockReceived,
    weighted_average,
};
pub use movement::{INITIAL_STOCK_REASON, InventoryMovement, MovementKind};
