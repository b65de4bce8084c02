//! Error kinds surfaced by the passes.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantError {
    /// Caller broke a pass precondition. Not recoverable; fix the caller.
    #[error("precondition violation: {0}")]
    PreconditionViolation(String),

    /// The pass exists as an extension point only.
    #[error("pass not implemented yet: {0}")]
    NotImplemented(&'static str),
}

impl QuantError {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        let message = message.into();
        crate::error!("{}", message);
        QuantError::PreconditionViolation(message)
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, QuantError::NotImplemented(_))
    }
}

/// Graph API failures inside a pass mean the graph handed in was not the
/// graph the ids came from.
impl From<anyhow::Error> for QuantError {
    fn from(err: anyhow::Error) -> Self {
        QuantError::precondition(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, QuantError>;
