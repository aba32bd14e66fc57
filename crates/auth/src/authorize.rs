use thiserror::Error;

use crate::{Capability, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing capability '{0}'")]
    Forbidden(Capability),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("no user is logged in")]
    NotAuthenticated,
}

/// Decide whether `principal` holds `capability`.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn is_allowed(principal: &Principal, capability: Capability) -> bool {
    let supervisor = principal.is_supervisor();
    let flags = principal.permissions;

    match capability {
        Capability::ViewTransactions => supervisor || flags.transactions,
        Capability::ViewDebts => supervisor || flags.debts,
        Capability::ViewInventory => supervisor || flags.inventory,
        Capability::ManageHolders | Capability::ViewJournal | Capability::FactoryReset => {
            principal.is_admin()
        }
        Capability::ViewHolders
        | Capability::ValidateDebts
        | Capability::SelectTransactionHolder
        | Capability::SetAnyTransactionStatus
        | Capability::ManageInventoryCatalog
        | Capability::ViewInventoryCost => supervisor,
    }
}

/// Authorize a principal for a capability.
pub fn authorize(principal: &Principal, capability: Capability) -> Result<(), AuthzError> {
    if is_allowed(principal, capability) {
        Ok(())
    } else {
        tracing::debug!(
            holder = %principal.holder_id,
            role = %principal.role,
            capability = %capability,
            "authorization denied"
        );
        Err(AuthzError::Forbidden(capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Role, ViewPermissions};
    use cashflow_core::HolderId;

    fn principal(role: Role, permissions: ViewPermissions) -> Principal {
        Principal::new(HolderId::new(), "Test", role, permissions)
    }

    #[test]
    fn supervisors_see_every_view_regardless_of_flags() {
        let none = ViewPermissions {
            inventory: false,
            debts: false,
            transactions: false,
        };
        for role in [Role::Admin, Role::Accountant] {
            let p = principal(role, none);
            assert!(authorize(&p, Capability::ViewInventory).is_ok());
            assert!(authorize(&p, Capability::ViewDebts).is_ok());
            assert!(authorize(&p, Capability::ViewTransactions).is_ok());
            assert!(authorize(&p, Capability::ViewHolders).is_ok());
            assert!(authorize(&p, Capability::ValidateDebts).is_ok());
        }
    }

    #[test]
    fn regular_users_follow_their_flags() {
        let p = principal(
            Role::Employee,
            ViewPermissions {
                inventory: true,
                debts: false,
                transactions: true,
            },
        );
        assert!(authorize(&p, Capability::ViewInventory).is_ok());
        assert!(authorize(&p, Capability::ViewTransactions).is_ok());
        assert_eq!(
            authorize(&p, Capability::ViewDebts),
            Err(AuthzError::Forbidden(Capability::ViewDebts))
        );
        assert!(authorize(&p, Capability::ViewHolders).is_err());
        assert!(authorize(&p, Capability::ViewInventoryCost).is_err());
    }

    #[test]
    fn only_admins_manage_holders_and_read_the_journal() {
        let admin = principal(Role::Admin, ViewPermissions::ALL);
        let accountant = principal(Role::Accountant, ViewPermissions::ALL);
        let partner = principal(Role::Partner, ViewPermissions::ALL);

        for cap in [Capability::ManageHolders, Capability::ViewJournal, Capability::FactoryReset] {
            assert!(is_allowed(&admin, cap));
            assert!(!is_allowed(&accountant, cap));
            assert!(!is_allowed(&partner, cap));
        }
    }
}
