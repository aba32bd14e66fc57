//! `cashflow-auth` — roles, view permissions and authorization checks.
//!
//! Pure policy: no storage, no session handling.

pub mod authorize;
pub mod credentials;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize, is_allowed};
pub use credentials::{LoginAccount, verify_credentials};
pub use permissions::{Capability, ViewPermissions};
pub use principal::Principal;
pub use roles::Role;
