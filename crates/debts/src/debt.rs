use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cashflow_core::{
    Aggregate, AggregateRoot, DebtId, DomainError, HolderId, Money, TransactionId,
    ensure_not_blank, ensure_positive,
};
use cashflow_events::Event;
use cashflow_treasury::{TransactionKind, TransactionStatus};

/// Category of the cash transaction created when a debt is settled.
pub const DEBT_SETTLEMENT_CATEGORY: &str = "Debts & Advances";

/// Which side of the debt the business is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DebtKind {
    /// Owed to the business (advances fit here).
    Receivable,
    /// Owed by the business.
    Payable,
}

impl DebtKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtKind::Receivable => "receivable",
            DebtKind::Payable => "payable",
        }
    }
}

impl core::fmt::Display for DebtKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DebtKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "receivable" => Ok(DebtKind::Receivable),
            "payable" => Ok(DebtKind::Payable),
            other => Err(DomainError::validation(format!("unknown debt type '{other}'"))),
        }
    }
}

/// Cash direction of a settlement: collecting a receivable is income,
/// paying a payable is an expense.
pub fn settlement_kind(kind: DebtKind) -> TransactionKind {
    match kind {
        DebtKind::Receivable => TransactionKind::Income,
        DebtKind::Payable => TransactionKind::Expense,
    }
}

/// Description of the settlement transaction, e.g.
/// `"Settlement of payable: ACME - March rent"`.
pub fn settlement_description(debt: &Debt) -> String {
    format!(
        "Settlement of {}: {} - {}",
        debt.kind, debt.entity_name, debt.description
    )
}

/// Aggregate root: Debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    id: DebtId,
    entity_name: String,
    amount: Money,
    kind: DebtKind,
    description: String,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    is_paid: bool,
    status: TransactionStatus,
    payment_date: Option<DateTime<Utc>>,
    payment_holder_id: Option<HolderId>,
    payment_transaction_id: Option<TransactionId>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Debt {
    /// Create an empty, not-yet-registered aggregate instance.
    pub fn empty(id: DebtId) -> Self {
        Self {
            id,
            entity_name: String::new(),
            amount: Decimal::ZERO,
            kind: DebtKind::Receivable,
            description: String::new(),
            issue_date: NaiveDate::default(),
            due_date: None,
            is_paid: false,
            status: TransactionStatus::Pending,
            payment_date: None,
            payment_holder_id: None,
            payment_transaction_id: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> DebtId {
        self.id
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn kind(&self) -> DebtKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        self.payment_date
    }

    pub fn payment_holder_id(&self) -> Option<HolderId> {
        self.payment_holder_id
    }

    pub fn payment_transaction_id(&self) -> Option<TransactionId> {
        self.payment_transaction_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Invariant: only validated, unpaid debts can be settled.
    pub fn can_settle(&self) -> bool {
        self.created && !self.deleted && self.status.is_validated() && !self.is_paid
    }
}

impl AggregateRoot for Debt {
    type Id = DebtId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterDebt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDebt {
    pub debt_id: DebtId,
    pub kind: DebtKind,
    pub entity_name: String,
    pub amount: Money,
    pub description: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    /// VALIDATED when a supervisor registers the debt, PENDING otherwise.
    pub status: TransactionStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditDebt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDebt {
    pub debt_id: DebtId,
    pub entity_name: String,
    pub amount: Money,
    pub description: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteDebt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteDebt {
    pub debt_id: DebtId,
    /// Set for supervisors, who may delete validated debts too.
    pub allow_validated: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ValidateDebt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateDebt {
    pub debt_id: DebtId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectDebt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectDebt {
    pub debt_id: DebtId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SettleDebt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleDebt {
    pub debt_id: DebtId,
    pub holder_id: HolderId,
    pub transaction_id: TransactionId,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtCommand {
    RegisterDebt(RegisterDebt),
    EditDebt(EditDebt),
    DeleteDebt(DeleteDebt),
    ValidateDebt(ValidateDebt),
    RejectDebt(RejectDebt),
    SettleDebt(SettleDebt),
}

/// Event: DebtRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtRegistered {
    pub debt_id: DebtId,
    pub kind: DebtKind,
    pub entity_name: String,
    pub amount: Money,
    pub description: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: TransactionStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DebtEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtEdited {
    pub debt_id: DebtId,
    pub entity_name: String,
    pub amount: Money,
    pub description: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DebtDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtDeleted {
    pub debt_id: DebtId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DebtValidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtValidated {
    pub debt_id: DebtId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DebtRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtRejected {
    pub debt_id: DebtId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DebtSettled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSettled {
    pub debt_id: DebtId,
    pub holder_id: HolderId,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtEvent {
    DebtRegistered(DebtRegistered),
    DebtEdited(DebtEdited),
    DebtDeleted(DebtDeleted),
    DebtValidated(DebtValidated),
    DebtRejected(DebtRejected),
    DebtSettled(DebtSettled),
}

impl DebtEvent {
    pub fn debt_id(&self) -> DebtId {
        match self {
            DebtEvent::DebtRegistered(e) => e.debt_id,
            DebtEvent::DebtEdited(e) => e.debt_id,
            DebtEvent::DebtDeleted(e) => e.debt_id,
            DebtEvent::DebtValidated(e) => e.debt_id,
            DebtEvent::DebtRejected(e) => e.debt_id,
            DebtEvent::DebtSettled(e) => e.debt_id,
        }
    }
}

impl Event for DebtEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DebtEvent::DebtRegistered(_) => "debts.debt.registered",
            DebtEvent::DebtEdited(_) => "debts.debt.edited",
            DebtEvent::DebtDeleted(_) => "debts.debt.deleted",
            DebtEvent::DebtValidated(_) => "debts.debt.validated",
            DebtEvent::DebtRejected(_) => "debts.debt.rejected",
            DebtEvent::DebtSettled(_) => "debts.debt.settled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DebtEvent::DebtRegistered(e) => e.occurred_at,
            DebtEvent::DebtEdited(e) => e.occurred_at,
            DebtEvent::DebtDeleted(e) => e.occurred_at,
            DebtEvent::DebtValidated(e) => e.occurred_at,
            DebtEvent::DebtRejected(e) => e.occurred_at,
            DebtEvent::DebtSettled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Debt {
    type Command = DebtCommand;
    type Event = DebtEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DebtEvent::DebtRegistered(e) => {
                self.id = e.debt_id;
                self.kind = e.kind;
                self.entity_name = e.entity_name.clone();
                self.amount = e.amount;
                self.description = e.description.clone();
                self.issue_date = e.issue_date;
                self.due_date = e.due_date;
                self.status = e.status;
                self.is_paid = false;
                self.created = true;
            }
            DebtEvent::DebtEdited(e) => {
                self.entity_name = e.entity_name.clone();
                self.amount = e.amount;
                self.description = e.description.clone();
                self.issue_date = e.issue_date;
                self.due_date = e.due_date;
            }
            DebtEvent::DebtDeleted(_) => {
                self.deleted = true;
            }
            DebtEvent::DebtValidated(_) => {
                self.status = TransactionStatus::Validated;
            }
            DebtEvent::DebtRejected(_) => {
                self.status = TransactionStatus::Rejected;
            }
            DebtEvent::DebtSettled(e) => {
                self.is_paid = true;
                self.payment_date = Some(e.occurred_at);
                self.payment_holder_id = Some(e.holder_id);
                self.payment_transaction_id = Some(e.transaction_id);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DebtCommand::RegisterDebt(cmd) => self.handle_register(cmd),
            DebtCommand::EditDebt(cmd) => self.handle_edit(cmd),
            DebtCommand::DeleteDebt(cmd) => self.handle_delete(cmd),
            DebtCommand::ValidateDebt(cmd) => self.handle_validate(cmd),
            DebtCommand::RejectDebt(cmd) => self.handle_reject(cmd),
            DebtCommand::SettleDebt(cmd) => self.handle_settle(cmd),
        }
    }
}

impl Debt {
    fn ensure_live(&self, debt_id: DebtId) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found(format!("debt {debt_id}")));
        }
        if self.id != debt_id {
            return Err(DomainError::invariant("debt_id mismatch"));
        }
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), DomainError> {
        if !self.status.is_pending() {
            return Err(DomainError::invariant(format!(
                "debt is {}, only PENDING debts can be validated or rejected",
                self.status
            )));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterDebt) -> Result<Vec<DebtEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("debt already exists"));
        }
        let entity_name = ensure_not_blank(&cmd.entity_name, "entity_name")?;
        ensure_positive(cmd.amount, "amount")?;
        if cmd.status == TransactionStatus::Rejected {
            return Err(DomainError::validation("a debt cannot be registered as REJECTED"));
        }

        Ok(vec![DebtEvent::DebtRegistered(DebtRegistered {
            debt_id: cmd.debt_id,
            kind: cmd.kind,
            entity_name,
            amount: cmd.amount,
            description: cmd.description.trim().to_string(),
            issue_date: cmd.issue_date,
            due_date: cmd.due_date,
            status: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit(&self, cmd: &EditDebt) -> Result<Vec<DebtEvent>, DomainError> {
        self.ensure_live(cmd.debt_id)?;
        if self.status.is_validated() || self.is_paid {
            return Err(DomainError::invariant(
                "validated or paid debts cannot be edited",
            ));
        }
        let entity_name = ensure_not_blank(&cmd.entity_name, "entity_name")?;
        ensure_positive(cmd.amount, "amount")?;

        Ok(vec![DebtEvent::DebtEdited(DebtEdited {
            debt_id: cmd.debt_id,
            entity_name,
            amount: cmd.amount,
            description: cmd.description.trim().to_string(),
            issue_date: cmd.issue_date,
            due_date: cmd.due_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteDebt) -> Result<Vec<DebtEvent>, DomainError> {
        self.ensure_live(cmd.debt_id)?;
        if self.status.is_validated() && !cmd.allow_validated {
            return Err(DomainError::invariant(
                "validated debts can only be deleted by a supervisor",
            ));
        }

        Ok(vec![DebtEvent::DebtDeleted(DebtDeleted {
            debt_id: cmd.debt_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_validate(&self, cmd: &ValidateDebt) -> Result<Vec<DebtEvent>, DomainError> {
        self.ensure_live(cmd.debt_id)?;
        self.ensure_pending()?;

        Ok(vec![DebtEvent::DebtValidated(DebtValidated {
            debt_id: cmd.debt_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectDebt) -> Result<Vec<DebtEvent>, DomainError> {
        self.ensure_live(cmd.debt_id)?;
        self.ensure_pending()?;

        Ok(vec![DebtEvent::DebtRejected(DebtRejected {
            debt_id: cmd.debt_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_settle(&self, cmd: &SettleDebt) -> Result<Vec<DebtEvent>, DomainError> {
        self.ensure_live(cmd.debt_id)?;
        if !self.can_settle() {
            return Err(DomainError::invariant(
                "only validated, unpaid debts can be settled",
            ));
        }

        Ok(vec![DebtEvent::DebtSettled(DebtSettled {
            debt_id: cmd.debt_id,
            holder_id: cmd.holder_id,
            transaction_id: cmd.transaction_id,
            occurred_at: cmd.paid_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn register(kind: DebtKind, status: TransactionStatus) -> RegisterDebt {
        RegisterDebt {
            debt_id: DebtId::new(),
            kind,
            entity_name: "ACME Supplies".to_string(),
            amount: dec!(250.00),
            description: "March order".to_string(),
            issue_date: test_date(),
            due_date: Some(test_date() + chrono::Days::new(30)),
            status,
            occurred_at: test_time(),
        }
    }

    fn registered(kind: DebtKind, status: TransactionStatus) -> Debt {
        let cmd = register(kind, status);
        let mut debt = Debt::empty(cmd.debt_id);
        debt.execute(&DebtCommand::RegisterDebt(cmd)).unwrap();
        debt
    }

    fn settle_cmd(debt: &Debt) -> DebtCommand {
        DebtCommand::SettleDebt(SettleDebt {
            debt_id: debt.id_typed(),
            holder_id: HolderId::new(),
            transaction_id: TransactionId::new(),
            paid_at: test_time(),
        })
    }

    #[test]
    fn debt_kind_parses_ignoring_case() {
        assert_eq!("PAYABLE".parse::<DebtKind>().unwrap(), DebtKind::Payable);
        assert!("loan".parse::<DebtKind>().is_err());
    }

    #[test]
    fn register_debt_emits_registered_event() {
        let cmd = register(DebtKind::Payable, TransactionStatus::Pending);
        let debt = Debt::empty(cmd.debt_id);
        let events = debt.handle(&DebtCommand::RegisterDebt(cmd.clone())).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            DebtEvent::DebtRegistered(e) => {
                assert_eq!(e.debt_id, cmd.debt_id);
                assert_eq!(e.amount, dec!(250.00));
                assert_eq!(e.status, TransactionStatus::Pending);
            }
            _ => panic!("Expected DebtRegistered event"),
        }
    }

    #[test]
    fn register_requires_entity_and_positive_amount() {
        let mut cmd = register(DebtKind::Receivable, TransactionStatus::Pending);
        cmd.entity_name = " ".to_string();
        assert!(matches!(
            Debt::empty(cmd.debt_id).handle(&DebtCommand::RegisterDebt(cmd)),
            Err(DomainError::Validation(_))
        ));

        let mut cmd = register(DebtKind::Receivable, TransactionStatus::Pending);
        cmd.amount = dec!(-1);
        assert!(matches!(
            Debt::empty(cmd.debt_id).handle(&DebtCommand::RegisterDebt(cmd)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn pending_debt_can_be_edited_but_validated_cannot() {
        let mut debt = registered(DebtKind::Receivable, TransactionStatus::Pending);
        let edit = EditDebt {
            debt_id: debt.id_typed(),
            entity_name: "Client B".to_string(),
            amount: dec!(99.5),
            description: "Advance".to_string(),
            issue_date: test_date(),
            due_date: None,
            occurred_at: test_time(),
        };
        debt.execute(&DebtCommand::EditDebt(edit.clone())).unwrap();
        assert_eq!(debt.entity_name(), "Client B");
        assert_eq!(debt.amount(), dec!(99.5));
        assert_eq!(debt.due_date(), None);

        debt.execute(&DebtCommand::ValidateDebt(ValidateDebt {
            debt_id: debt.id_typed(),
            occurred_at: test_time(),
        }))
        .unwrap();
        let err = debt.handle(&DebtCommand::EditDebt(edit)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn validated_debt_delete_needs_supervisor() {
        let mut debt = registered(DebtKind::Payable, TransactionStatus::Validated);
        let mut delete = DeleteDebt {
            debt_id: debt.id_typed(),
            allow_validated: false,
            occurred_at: test_time(),
        };
        assert!(debt.handle(&DebtCommand::DeleteDebt(delete.clone())).is_err());

        delete.allow_validated = true;
        debt.execute(&DebtCommand::DeleteDebt(delete.clone())).unwrap();
        assert!(debt.is_deleted());

        // A deleted debt no longer exists.
        let err = debt.handle(&DebtCommand::DeleteDebt(delete)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn only_pending_debts_can_be_validated_or_rejected() {
        let mut debt = registered(DebtKind::Receivable, TransactionStatus::Pending);
        debt.execute(&DebtCommand::RejectDebt(RejectDebt {
            debt_id: debt.id_typed(),
            occurred_at: test_time(),
        }))
        .unwrap();
        assert_eq!(debt.status(), TransactionStatus::Rejected);

        let err = debt
            .handle(&DebtCommand::ValidateDebt(ValidateDebt {
                debt_id: debt.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn settle_marks_paid_and_records_payment() {
        let mut debt = registered(DebtKind::Payable, TransactionStatus::Validated);
        assert!(debt.can_settle());
        let cmd = settle_cmd(&debt);
        debt.execute(&cmd).unwrap();

        let DebtCommand::SettleDebt(settle) = cmd else {
            unreachable!()
        };
        assert!(debt.is_paid());
        assert_eq!(debt.payment_holder_id(), Some(settle.holder_id));
        assert_eq!(debt.payment_transaction_id(), Some(settle.transaction_id));
        assert_eq!(debt.payment_date(), Some(settle.paid_at));

        // Cannot settle twice.
        assert!(debt.handle(&settle_cmd(&debt)).is_err());
    }

    #[test]
    fn pending_debt_cannot_be_settled() {
        let debt = registered(DebtKind::Receivable, TransactionStatus::Pending);
        let err = debt.handle(&settle_cmd(&debt)).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("validated, unpaid") => {}
            _ => panic!("Expected InvariantViolation for settling a pending debt"),
        }
    }

    #[test]
    fn settlement_kind_and_description_follow_debt_side() {
        assert_eq!(settlement_kind(DebtKind::Receivable), TransactionKind::Income);
        assert_eq!(settlement_kind(DebtKind::Payable), TransactionKind::Expense);

        let debt = registered(DebtKind::Payable, TransactionStatus::Validated);
        assert_eq!(
            settlement_description(&debt),
            "Settlement of payable: ACME Supplies - March order"
        );
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let debt = registered(DebtKind::Receivable, TransactionStatus::Validated);
        let before = debt.clone();
        let _ = debt.handle(&settle_cmd(&debt)).unwrap();
        assert_eq!(debt, before);
    }
}
