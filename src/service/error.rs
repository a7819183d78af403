use crate::batch::error::BatchError;
use crate::normalize::error::ShapeError;
use crate::transport::error::TransportError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("Missing required argument `{name}`.")]
    MissingArgument { name: &'static str },

    #[error("TransportError: {0}")]
    Transport(#[from] TransportError),

    #[error("ShapeError: {0}")]
    Shape(#[from] ShapeError),

    #[error("BatchError: {0}")]
    Batch(#[from] BatchError),
}

impl ServiceError {
    /// Whether trying the same call again could succeed, i.e. whether a
    /// consumer should offer a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Transport(e) => !e.is_cancelled(),
            ServiceError::Batch(e) => !e.is_cancelled(),
            ServiceError::MissingArgument { .. } | ServiceError::Shape(_) => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            ServiceError::Transport(e) => e.is_cancelled(),
            ServiceError::Batch(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
