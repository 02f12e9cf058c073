use crate::codec::{Handle, WidthTag};
use crate::error::{ErrorSeverity, GameError};
use crate::state::Address;

/// Failures reported by an FHE backend while evaluating or granting access.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FheError {
    #[error("ciphertext {0} is not registered")]
    UnknownHandle(Handle),

    #[error("operand width mismatch: expected {expected}, found {found}")]
    WidthMismatch { expected: WidthTag, found: WidthTag },

    #[error("{account} is not allowed to use ciphertext {handle}")]
    AccessDenied { handle: Handle, account: Address },

    #[error("ciphertext {0} is not marked for public decryption")]
    NotPubliclyDecryptable(Handle),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl GameError for FheError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::AccessDenied { .. } | Self::NotPubliclyDecryptable(_) => {
                ErrorSeverity::Validation
            }
            Self::UnknownHandle(_) | Self::WidthMismatch { .. } | Self::Backend(_) => {
                ErrorSeverity::Internal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownHandle(_) => "FheUnknownHandle",
            Self::WidthMismatch { .. } => "FheWidthMismatch",
            Self::AccessDenied { .. } => "FheAccessDenied",
            Self::NotPubliclyDecryptable(_) => "FheNotPubliclyDecryptable",
            Self::Backend(_) => "FheBackend",
        }
    }
}
