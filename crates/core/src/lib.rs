//! `cashflow-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::{Entity, find_by_id};
pub use error::{DomainError, DomainResult};
pub use id::{DebtId, HolderId, ItemId, LogId, MovementId, SectionId, TransactionId, UnitId};
pub use money::{Money, Quantity, ensure_non_negative, ensure_not_blank, ensure_positive};
