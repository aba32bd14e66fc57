//! Treasury module: cash transactions and their approval workflow.
//!
//! Pure domain logic only: no IO, no persistence concerns. Holder balances
//! live in `cashflow-holders`; this crate decides *which* balance deltas a
//! transaction or a status change implies.

pub mod effects;
pub mod transaction;

pub use effects::{BalanceDelta, effects, net_by_holder, transition_deltas};
pub use transaction::{
    CashTransaction, ChangeStatus, DEFAULT_CATEGORY, RecordTransaction, StatusChanged,
    TransactionCommand, TransactionEvent, TransactionKind, TransactionRecorded, TransactionStatus,
};
