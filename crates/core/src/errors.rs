use thiserror::Error;

use crate::domain::order::OrderStatus;
use crate::store::StoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid order transition from {from:?} to {to:?}")]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures a flow can hit while handling one turn. None of these escape to
/// the UI: the flow renders [`FlowError::user_message`] as a bot message and
/// keeps its previous state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("authentication required: {0}")]
    Auth(String),
    #[error("remote write failed: {0}")]
    RemoteWrite(String),
    #[error("remote read failed: {0}")]
    RemoteRead(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl FlowError {
    pub fn read(error: StoreError) -> Self {
        Self::RemoteRead(error.to_string())
    }

    pub fn write(error: StoreError) -> Self {
        Self::RemoteWrite(error.to_string())
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::NotFound(what) => format!(
                "Sorry, we couldn't find {what}. Please try again or choose another option."
            ),
            Self::Auth(_) => "Please sign in to your account to continue.".to_owned(),
            Self::RemoteWrite(reason) => {
                format!("Sorry, we couldn't save that ({reason}). Please try again.")
            }
            Self::RemoteRead(_) => {
                "Sorry, we couldn't reach our records right now. Please try again.".to_owned()
            }
            Self::Domain(_) => "That action isn't available for this order anymore.".to_owned(),
        }
    }

    /// Class label used in structured logs.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Auth(_) => "auth",
            Self::RemoteWrite(_) => "remote_write",
            Self::RemoteRead(_) => "remote_read",
            Self::Domain(_) => "domain",
        }
    }
}
