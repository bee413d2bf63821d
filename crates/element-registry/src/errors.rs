use thiserror::Error;

use trolley_core_types::{AutomationError, ElementToken};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The token was minted by an earlier observation pass; the underlying
    /// element may no longer exist and the mapping has been discarded.
    #[error("stale token {token} (current pass is {current_pass})")]
    Stale {
        token: ElementToken,
        current_pass: u64,
    },
    /// The token belongs to the current pass but no entry carries its index.
    #[error("unknown token {token}")]
    Unknown { token: ElementToken },
    #[error("malformed token: {0}")]
    Malformed(String),
}

impl From<RegistryError> for AutomationError {
    fn from(err: RegistryError) -> Self {
        AutomationError::ElementNotFound(err.to_string())
    }
}
