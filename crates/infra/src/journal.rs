//! Audit journal: who did what, newest entry first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cashflow_auth::Principal;
use cashflow_core::{Entity, HolderId, LogId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    Logout,
    CreateTransaction,
    UpdateStatus,
    AddUser,
    EditUser,
    AddDebt,
    EditDebt,
    DeleteDebt,
    ValidateDebt,
    RejectDebt,
    PayDebt,
    InvAddItem,
    InvMovement,
    InvEditItem,
    InvSetMinStock,
    InvAddUnit,
    InvDeleteUnit,
    InvAddSection,
    InvDeleteSection,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::CreateTransaction => "CREATE_TRANSACTION",
            AuditAction::UpdateStatus => "UPDATE_STATUS",
            AuditAction::AddUser => "ADD_USER",
            AuditAction::EditUser => "EDIT_USER",
            AuditAction::AddDebt => "ADD_DEBT",
            AuditAction::EditDebt => "EDIT_DEBT",
            AuditAction::DeleteDebt => "DELETE_DEBT",
            AuditAction::ValidateDebt => "VALIDATE_DEBT",
            AuditAction::RejectDebt => "REJECT_DEBT",
            AuditAction::PayDebt => "PAY_DEBT",
            AuditAction::InvAddItem => "INV_ADD_ITEM",
            AuditAction::InvMovement => "INV_MOVEMENT",
            AuditAction::InvEditItem => "INV_EDIT_ITEM",
            AuditAction::InvSetMinStock => "INV_SET_MIN_STOCK",
            AuditAction::InvAddUnit => "INV_ADD_UNIT",
            AuditAction::InvDeleteUnit => "INV_DELETE_UNIT",
            AuditAction::InvAddSection => "INV_ADD_SECTION",
            AuditAction::InvDeleteSection => "INV_DELETE_SECTION",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: LogId,
    pub date: DateTime<Utc>,
    pub user_id: HolderId,
    /// Display name at the time of the action.
    pub user_name: String,
    pub action: AuditAction,
    pub details: String,
}

impl Entity for LogEntry {
    type Id = LogId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Journal {
    entries: Vec<LogEntry>,
}

impl Journal {
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    /// Prepend an entry attributed to `actor`.
    pub fn record(
        &mut self,
        actor: &Principal,
        action: AuditAction,
        details: impl Into<String>,
        at: DateTime<Utc>,
    ) -> &LogEntry {
        self.entries.insert(
            0,
            LogEntry {
                id: LogId::new(),
                date: at,
                user_id: actor.holder_id,
                user_name: actor.name.clone(),
                action,
                details: details.into(),
            },
        );
        &self.entries[0]
    }

    /// Newest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashflow_auth::{Role, ViewPermissions};

    #[test]
    fn newest_entry_comes_first() {
        let actor =
            Principal::new(HolderId::new(), "Admin General", Role::Admin, ViewPermissions::ALL);
        let mut journal = Journal::default();
        journal.record(&actor, AuditAction::Login, "signed in", Utc::now());
        journal.record(&actor, AuditAction::AddDebt, "ACME - 10", Utc::now());

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.entries()[0].action, AuditAction::AddDebt);
        assert_eq!(journal.entries()[1].user_name, "Admin General");
    }

    #[test]
    fn actions_serialize_as_upper_snake_case() {
        let json = serde_json::to_string(&AuditAction::InvAddItem).unwrap();
        assert_eq!(json, "\"INV_ADD_ITEM\"");
        assert_eq!(AuditAction::CreateTransaction.to_string(), "CREATE_TRANSACTION");
    }
}
