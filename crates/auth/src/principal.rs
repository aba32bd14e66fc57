use serde::{Deserialize, Serialize};

use cashflow_core::HolderId;

use crate::{Role, ViewPermissions};

/// The logged-in holder, as seen by authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub holder_id: HolderId,
    pub name: String,
    pub role: Role,
    pub permissions: ViewPermissions,
}

impl Principal {
    pub fn new(
        holder_id: HolderId,
        name: impl Into<String>,
        role: Role,
        permissions: ViewPermissions,
    ) -> Self {
        Self {
            holder_id,
            name: name.into(),
            role,
            permissions,
        }
    }

    pub fn is_supervisor(&self) -> bool {
        self.role.is_supervisor()
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
