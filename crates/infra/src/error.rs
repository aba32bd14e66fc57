use thiserror::Error;

use cashflow_auth::{AuthzError, Capability};
use cashflow_core::DomainError;

use crate::store::StoreError;

/// Failure of a book operation.
#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode book state: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BookError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, BookError::Authz(AuthzError::Forbidden(_)))
    }

    pub fn missing_capability(&self) -> Option<Capability> {
        match self {
            BookError::Authz(AuthzError::Forbidden(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BookError::Domain(DomainError::NotFound(_)))
    }
}

pub type BookResult<T> = Result<T, BookError>;
