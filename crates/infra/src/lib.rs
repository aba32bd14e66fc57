//! Application layer of the cash book: the `Book` service, its persistence
//! slots, configuration, audit journal and seed data.

pub mod book;
pub mod config;
pub mod error;
pub mod events;
pub mod journal;
pub mod queries;
pub mod requests;
pub mod seed;
pub mod snapshot;
pub mod store;


pub use book::Book;
pub use config::{BookConfig, default_data_dir};
pub use error::{BookError, BookResult};
pub use events::{BookEnvelope, BookEvent};
pub use journal::{AuditAction, Journal, LogEntry};
pub use queries::{
    DateRange, Dashboard, InventoryQuery, InventoryRow, InventorySortKey, SortDirection,
    TransactionFilter,
};
pub use requests::{
    DebtUpdate, HolderUpdate, ItemUpdate, NewDebt, NewHolder, NewInventoryItem, NewTransaction,
    StockMovement,
};
pub use seed::{DEFAULT_PASSWORD, seed_database};
pub use snapshot::Database;
pub use store::{FileStore, InMemoryStore, KeyValueStore, StoreError};
