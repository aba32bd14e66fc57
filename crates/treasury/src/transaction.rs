use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cashflow_core::{
    Aggregate, AggregateRoot, DomainError, HolderId, Money, TransactionId, ensure_not_blank,
    ensure_positive,
};
use cashflow_events::Event;

use crate::effects::{BalanceDelta, effects, transition_deltas};

/// Category used when none is given.
pub const DEFAULT_CATEGORY: &str = "General";

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
            TransactionKind::Transfer => "TRANSFER",
        }
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INCOME" => Ok(TransactionKind::Income),
            "EXPENSE" => Ok(TransactionKind::Expense),
            "TRANSFER" => Ok(TransactionKind::Transfer),
            other => Err(DomainError::validation(format!("unknown transaction type '{other}'"))),
        }
    }
}

/// Approval lifecycle shared by transactions and debts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Validated,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Validated => "VALIDATED",
            TransactionStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_validated(&self) -> bool {
        matches!(self, TransactionStatus::Validated)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TransactionStatus::Pending)
    }
}

impl core::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(TransactionStatus::Pending),
            "VALIDATED" => Ok(TransactionStatus::Validated),
            "REJECTED" => Ok(TransactionStatus::Rejected),
            other => Err(DomainError::validation(format!("unknown status '{other}'"))),
        }
    }
}

/// Aggregate root: CashTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashTransaction {
    id: TransactionId,
    date: DateTime<Utc>,
    amount: Money,
    kind: TransactionKind,
    /// The holder custodying the cash (receiver for income, payer otherwise).
    holder_id: HolderId,
    target_holder_id: Option<HolderId>,
    description: String,
    category: String,
    status: TransactionStatus,
    created_by: HolderId,
    version: u64,
    created: bool,
}

impl CashTransaction {
    /// Empty aggregate, ready for `RecordTransaction`.
    pub fn empty(id: TransactionId) -> Self {
        Self {
            id,
            date: DateTime::<Utc>::UNIX_EPOCH,
            amount: Decimal::ZERO,
            kind: TransactionKind::Income,
            holder_id: HolderId::from_uuid(Uuid::nil()),
            target_holder_id: None,
            description: String::new(),
            category: String::new(),
            status: TransactionStatus::Pending,
            created_by: HolderId::from_uuid(Uuid::nil()),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> TransactionId {
        self.id
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn holder_id(&self) -> HolderId {
        self.holder_id
    }

    pub fn target_holder_id(&self) -> Option<HolderId> {
        self.target_holder_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn created_by(&self) -> HolderId {
        self.created_by
    }

    /// True when `holder` is the source or the destination of this transaction.
    pub fn involves(&self, holder: HolderId) -> bool {
        self.holder_id == holder || self.target_holder_id == Some(holder)
    }

    /// True when `holder` is the receiving side of a transfer.
    pub fn is_transfer_target(&self, holder: HolderId) -> bool {
        self.kind == TransactionKind::Transfer && self.target_holder_id == Some(holder)
    }
}

impl AggregateRoot for CashTransaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTransaction {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub holder_id: HolderId,
    pub target_holder_id: Option<HolderId>,
    pub description: String,
    pub category: String,
    /// Initial status (VALIDATED when a supervisor records it).
    pub status: TransactionStatus,
    pub created_by: HolderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub transaction_id: TransactionId,
    pub status: TransactionStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionCommand {
    RecordTransaction(RecordTransaction),
    ChangeStatus(ChangeStatus),
}

/// Event: TransactionRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecorded {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub holder_id: HolderId,
    pub target_holder_id: Option<HolderId>,
    pub description: String,
    pub category: String,
    pub status: TransactionStatus,
    pub created_by: HolderId,
    /// Balance movements to carry out (empty unless recorded as VALIDATED).
    pub balance_deltas: Vec<BalanceDelta>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub transaction_id: TransactionId,
    pub from: TransactionStatus,
    pub to: TransactionStatus,
    /// Reversal and/or application of the transaction's effects.
    pub balance_deltas: Vec<BalanceDelta>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEvent {
    TransactionRecorded(TransactionRecorded),
    StatusChanged(StatusChanged),
}

impl TransactionEvent {
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            TransactionEvent::TransactionRecorded(e) => e.transaction_id,
            TransactionEvent::StatusChanged(e) => e.transaction_id,
        }
    }

    pub fn balance_deltas(&self) -> &[BalanceDelta] {
        match self {
            TransactionEvent::TransactionRecorded(e) => &e.balance_deltas,
            TransactionEvent::StatusChanged(e) => &e.balance_deltas,
        }
    }
}

impl Event for TransactionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransactionEvent::TransactionRecorded(_) => "treasury.transaction.recorded",
            TransactionEvent::StatusChanged(_) => "treasury.transaction.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransactionEvent::TransactionRecorded(e) => e.occurred_at,
            TransactionEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for CashTransaction {
    type Command = TransactionCommand;
    type Event = TransactionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransactionEvent::TransactionRecorded(e) => {
                self.id = e.transaction_id;
                self.date = e.occurred_at;
                self.amount = e.amount;
                self.kind = e.kind;
                self.holder_id = e.holder_id;
                self.target_holder_id = e.target_holder_id;
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.status = e.status;
                self.created_by = e.created_by;
                self.created = true;
            }
            TransactionEvent::StatusChanged(e) => {
                self.status = e.to;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransactionCommand::RecordTransaction(cmd) => self.handle_record(cmd),
            TransactionCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl CashTransaction {
    fn handle_record(&self, cmd: &RecordTransaction) -> Result<Vec<TransactionEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("transaction already exists"));
        }
        ensure_positive(cmd.amount, "amount")?;
        let description = ensure_not_blank(&cmd.description, "description")?;
        let category = match cmd.category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            c => c.to_string(),
        };

        match (cmd.kind, cmd.target_holder_id) {
            (TransactionKind::Transfer, None) => {
                return Err(DomainError::validation("transfer requires a target holder"));
            }
            (TransactionKind::Transfer, Some(target)) if target == cmd.holder_id => {
                return Err(DomainError::validation(
                    "transfer target must differ from the source holder",
                ));
            }
            (TransactionKind::Income | TransactionKind::Expense, Some(_)) => {
                return Err(DomainError::validation(
                    "only transfers can have a target holder",
                ));
            }
            _ => {}
        }

        let balance_deltas = if cmd.status.is_validated() {
            effects(cmd.kind, cmd.amount, cmd.holder_id, cmd.target_holder_id)
        } else {
            vec![]
        };

        Ok(vec![TransactionEvent::TransactionRecorded(TransactionRecorded {
            transaction_id: cmd.transaction_id,
            kind: cmd.kind,
            amount: cmd.amount,
            holder_id: cmd.holder_id,
            target_holder_id: cmd.target_holder_id,
            description,
            category,
            status: cmd.status,
            created_by: cmd.created_by,
            balance_deltas,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeStatus,
    ) -> Result<Vec<TransactionEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("transaction {}", self.id)));
        }
        if self.id != cmd.transaction_id {
            return Err(DomainError::invariant("transaction_id mismatch"));
        }
        if self.status == cmd.status {
            return Ok(vec![]);
        }

        Ok(vec![TransactionEvent::StatusChanged(StatusChanged {
            transaction_id: cmd.transaction_id,
            from: self.status,
            to: cmd.status,
            balance_deltas: transition_deltas(self, self.status, cmd.status),
            occurred_at: cmd.occurred_at,
        })])
    }
}
