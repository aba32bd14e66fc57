//! Cash holders: the people who custody the business's cash.
//!
//! Every user of the book is a holder. The running balance here is only ever
//! moved by validated transactions (see `cashflow-treasury`).

pub mod holder;

pub use holder::{
    AdjustBalance, BalanceAdjusted, EditHolder, Holder, HolderCommand, HolderEdited, HolderEvent,
    HolderRegistered, RegisterHolder,
};
