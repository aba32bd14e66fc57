use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cashflow_auth::{LoginAccount, Principal, Role, ViewPermissions};
use cashflow_core::{
    Aggregate, AggregateRoot, DomainError, HolderId, Money, TransactionId, ensure_not_blank,
};
use cashflow_events::Event;

/// Aggregate root: Holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    id: HolderId,
    name: String,
    username: String,
    password: String,
    balance: Money,
    role: Role,
    permissions: ViewPermissions,
    version: u64,
    created: bool,
}

impl Holder {
    /// Create an empty, not-yet-registered aggregate instance.
    pub fn empty(id: HolderId) -> Self {
        Self {
            id,
            name: String::new(),
            username: String::new(),
            password: String::new(),
            balance: Decimal::ZERO,
            role: Role::Employee,
            permissions: ViewPermissions::default(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> HolderId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn permissions(&self) -> ViewPermissions {
        self.permissions
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Authorization view of this holder.
    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.name.clone(), self.role, self.permissions)
    }
}

impl LoginAccount for Holder {
    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }
}

impl AggregateRoot for Holder {
    type Id = HolderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterHolder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterHolder {
    pub holder_id: HolderId,
    pub name: String,
    pub username: String,
    pub password: String,
    pub role: Role,
    pub permissions: ViewPermissions,
    /// Starting balance; zero for users created through the book.
    pub opening_balance: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditHolder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditHolder {
    pub holder_id: HolderId,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub permissions: ViewPermissions,
    /// `None` keeps the current password.
    pub password: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustBalance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustBalance {
    pub holder_id: HolderId,
    pub delta: Money,
    /// Transaction whose (re)validation caused the movement.
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolderCommand {
    RegisterHolder(RegisterHolder),
    EditHolder(EditHolder),
    AdjustBalance(AdjustBalance),
}

/// Event: HolderRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderRegistered {
    pub holder_id: HolderId,
    pub name: String,
    pub username: String,
    pub password: String,
    pub role: Role,
    pub permissions: ViewPermissions,
    pub opening_balance: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: HolderEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderEdited {
    pub holder_id: HolderId,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub permissions: ViewPermissions,
    pub password: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BalanceAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAdjusted {
    pub holder_id: HolderId,
    pub delta: Money,
    pub new_balance: Money,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolderEvent {
    HolderRegistered(HolderRegistered),
    HolderEdited(HolderEdited),
    BalanceAdjusted(BalanceAdjusted),
}

impl HolderEvent {
    pub fn holder_id(&self) -> HolderId {
        match self {
            HolderEvent::HolderRegistered(e) => e.holder_id,
            HolderEvent::HolderEdited(e) => e.holder_id,
            HolderEvent::BalanceAdjusted(e) => e.holder_id,
        }
    }
}

impl Event for HolderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            HolderEvent::HolderRegistered(_) => "holders.holder.registered",
            HolderEvent::HolderEdited(_) => "holders.holder.edited",
            HolderEvent::BalanceAdjusted(_) => "holders.holder.balance_adjusted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            HolderEvent::HolderRegistered(e) => e.occurred_at,
            HolderEvent::HolderEdited(e) => e.occurred_at,
            HolderEvent::BalanceAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Holder {
    type Command = HolderCommand;
    type Event = HolderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            HolderEvent::HolderRegistered(e) => {
                self.id = e.holder_id;
                self.name = e.name.clone();
                self.username = e.username.clone();
                self.password = e.password.clone();
                self.role = e.role;
                self.permissions = e.permissions;
                self.balance = e.opening_balance;
                self.created = true;
            }
            HolderEvent::HolderEdited(e) => {
                self.name = e.name.clone();
                self.username = e.username.clone();
                self.role = e.role;
                self.permissions = e.permissions;
                if let Some(password) = &e.password {
                    self.password = password.clone();
                }
            }
            HolderEvent::BalanceAdjusted(e) => {
                self.balance = e.new_balance;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            HolderCommand::RegisterHolder(cmd) => self.handle_register(cmd),
            HolderCommand::EditHolder(cmd) => self.handle_edit(cmd),
            HolderCommand::AdjustBalance(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl Holder {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("holder {}", self.id)));
        }
        Ok(())
    }

    fn ensure_holder_id(&self, holder_id: HolderId) -> Result<(), DomainError> {
        if self.id != holder_id {
            return Err(DomainError::invariant("holder_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterHolder) -> Result<Vec<HolderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("holder already exists"));
        }
        let name = ensure_not_blank(&cmd.name, "name")?;
        let username = ensure_not_blank(&cmd.username, "username")?;
        if cmd.password.is_empty() {
            return Err(DomainError::validation("password cannot be empty"));
        }

        Ok(vec![HolderEvent::HolderRegistered(HolderRegistered {
            holder_id: cmd.holder_id,
            name,
            username,
            password: cmd.password.clone(),
            role: cmd.role,
            permissions: cmd.permissions,
            opening_balance: cmd.opening_balance,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit(&self, cmd: &EditHolder) -> Result<Vec<HolderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_holder_id(cmd.holder_id)?;
        let name = ensure_not_blank(&cmd.name, "name")?;
        let username = ensure_not_blank(&cmd.username, "username")?;
        // A blank password field means "leave unchanged".
        let password = cmd.password.clone().filter(|p| !p.is_empty());

        Ok(vec![HolderEvent::HolderEdited(HolderEdited {
            holder_id: cmd.holder_id,
            name,
            username,
            role: cmd.role,
            permissions: cmd.permissions,
            password,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustBalance) -> Result<Vec<HolderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_holder_id(cmd.holder_id)?;

        if cmd.delta.is_zero() {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        // Overdrafts are allowed: a holder may have paid out of pocket.
        let new_balance = self.balance.checked_add(cmd.delta).ok_or_else(|| {
            DomainError::validation(format!(
                "balance of holder {} would overflow adding {}",
                cmd.holder_id, cmd.delta
            ))
        })?;

        Ok(vec![HolderEvent::BalanceAdjusted(BalanceAdjusted {
            holder_id: cmd.holder_id,
            delta: cmd.delta,
            new_balance,
            transaction_id: cmd.transaction_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_holder_id() -> HolderId {
        HolderId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn register(holder_id: HolderId, opening_balance: Money) -> RegisterHolder {
        RegisterHolder {
            holder_id,
            name: "Juan (Sales)".to_string(),
            username: "juan".to_string(),
            password: "123".to_string(),
            role: Role::Employee,
            permissions: ViewPermissions::default(),
            opening_balance,
            occurred_at: test_time(),
        }
    }

    fn registered(opening_balance: Money) -> Holder {
        let id = test_holder_id();
        let mut holder = Holder::empty(id);
        holder
            .execute(&HolderCommand::RegisterHolder(register(id, opening_balance)))
            .unwrap();
        holder
    }

    #[test]
    fn register_holder_emits_registered_event() {
        let id = test_holder_id();
        let holder = Holder::empty(id);
        let events = holder
            .handle(&HolderCommand::RegisterHolder(register(id, dec!(1200))))
            .unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            HolderEvent::HolderRegistered(e) => {
                assert_eq!(e.holder_id, id);
                assert_eq!(e.opening_balance, dec!(1200));
                assert_eq!(e.username, "juan");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn register_rejects_blank_name_and_duplicates() {
        let id = test_holder_id();
        let mut cmd = register(id, Decimal::ZERO);
        cmd.name = "   ".to_string();
        let err = Holder::empty(id)
            .handle(&HolderCommand::RegisterHolder(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let holder = registered(Decimal::ZERO);
        let again = register(holder.id_typed(), Decimal::ZERO);
        let err = holder.handle(&HolderCommand::RegisterHolder(again)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn edit_without_password_keeps_the_old_one() {
        let mut holder = registered(Decimal::ZERO);
        let edit = EditHolder {
            holder_id: holder.id_typed(),
            name: "Juan Pérez".to_string(),
            username: "jperez".to_string(),
            role: Role::Partner,
            permissions: ViewPermissions::ALL,
            password: Some(String::new()),
            occurred_at: test_time(),
        };
        holder.execute(&HolderCommand::EditHolder(edit)).unwrap();

        assert_eq!(holder.name(), "Juan Pérez");
        assert_eq!(holder.username(), "jperez");
        assert_eq!(holder.password(), "123");
        assert_eq!(holder.role(), Role::Partner);
        assert_eq!(holder.permissions(), ViewPermissions::ALL);
    }

    #[test]
    fn adjust_balance_accumulates_and_may_go_negative() {
        let mut holder = registered(dec!(100));
        let tx = TransactionId::new();
        for delta in [dec!(-150), dec!(20.5)] {
            holder
                .execute(&HolderCommand::AdjustBalance(AdjustBalance {
                    holder_id: holder.id_typed(),
                    delta,
                    transaction_id: tx,
                    occurred_at: test_time(),
                }))
                .unwrap();
        }
        assert_eq!(holder.balance(), dec!(-29.5));
        assert_eq!(holder.version(), 3);
    }

    #[test]
    fn adjust_balance_rejects_zero_and_unknown_holder() {
        let holder = registered(dec!(10));
        let zero = AdjustBalance {
            holder_id: holder.id_typed(),
            delta: Decimal::ZERO,
            transaction_id: TransactionId::new(),
            occurred_at: test_time(),
        };
        assert!(holder.handle(&HolderCommand::AdjustBalance(zero.clone())).is_err());

        let ghost = Holder::empty(zero.holder_id);
        let err = ghost
            .handle(&HolderCommand::AdjustBalance(AdjustBalance {
                delta: dec!(1),
                ..zero
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn adjust_balance_refuses_overflow() {
        let holder = registered(dec!(5000));
        let err = holder
            .handle(&HolderCommand::AdjustBalance(AdjustBalance {
                holder_id: holder.id_typed(),
                delta: Decimal::MAX,
                transaction_id: TransactionId::new(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(holder.balance(), dec!(5000));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let holder = registered(dec!(50));
        let before = holder.clone();
        let _ = holder
            .handle(&HolderCommand::AdjustBalance(AdjustBalance {
                holder_id: holder.id_typed(),
                delta: dec!(5),
                transaction_id: TransactionId::new(),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(holder, before);
    }

    #[test]
    fn snapshot_uses_camel_case_fields() {
        let holder = registered(dec!(5000));
        let json = serde_json::to_value(&holder).unwrap();
        assert!(json.get("username").is_some());
        assert_eq!(json["role"], "employee");
        assert!(json["permissions"]["transactions"].as_bool().unwrap());
        let back: Holder = serde_json::from_value(json).unwrap();
        assert_eq!(back, holder);
    }
}
