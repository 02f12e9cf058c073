use super::Handle;
use crate::error::{ErrorSeverity, GameError};

/// Errors raised while admitting a client-encrypted value.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodecError {
    /// Handle width/version does not match the expected type, or the backend
    /// does not know the ciphertext.
    #[error("invalid ciphertext handle {0}")]
    InvalidCiphertext(Handle),

    /// The input proof is malformed or was not issued for this
    /// (contract, submitter, handle) triple.
    #[error("input proof verification failed")]
    InvalidProof,
}

impl GameError for CodecError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCiphertext(_) => "InvalidCiphertext",
            Self::InvalidProof => "InvalidProof",
        }
    }
}
