use crate::transport::error::TransportError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BatchError {
    /// Neither the batch endpoint nor the anime detail could be fetched.
    #[error("Batch download could not be fetched: {primary}; anime detail also failed: {detail}")]
    Transport {
        #[source]
        primary: TransportError,
        detail: TransportError,
    },

    #[error("Batch resolution was cancelled.")]
    Cancelled,
}

impl BatchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BatchError::Cancelled)
    }
}
