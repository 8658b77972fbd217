use crate::domain::DependsOnError;
use crate::ports::{MutationError, RemoteError};

/// Input a control's parser cannot normalize.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{key}: {message}")]
pub struct ParseError {
    pub key: String,
    pub message: String,
}

impl ParseError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    #[error("failed to parse input: {0}")]
    Parse(#[from] ParseError),
    #[error("model update rejected: {0}")]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("no field named '{0}' in this form")]
    UnknownField(String),
    #[error(transparent)]
    Dependency(#[from] DependsOnError),
}
