use serde::{Deserialize, Serialize};

/// Role of a holder in the book.
///
/// Admins and accountants are *supervisors*: they see every record, their
/// entries are validated on creation and they resolve everybody else's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Accountant,
    Employee,
    Partner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Accountant => "accountant",
            Role::Employee => "employee",
            Role::Partner => "partner",
        }
    }

    pub fn is_supervisor(&self) -> bool {
        matches!(self, Role::Admin | Role::Accountant)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = cashflow_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "accountant" => Ok(Role::Accountant),
            "employee" => Ok(Role::Employee),
            "partner" => Ok(Role::Partner),
            other => Err(cashflow_core::DomainError::validation(format!(
                "unknown role '{other}' (expected admin, accountant, employee or partner)"
            ))),
        }
    }
}
