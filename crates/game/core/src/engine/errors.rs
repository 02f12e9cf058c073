//! Engine error taxonomy.
//!
//! One enum per component so each operation's signature lists exactly the
//! ways it can fail. [`ExecuteError`] unifies them for callers that drive
//! every operation through one channel.

use crate::codec::CodecError;
use crate::env::FheError;
use crate::error::{ErrorSeverity, GameError};
use crate::state::{Address, Amount, RequestId, RoundId, Timestamp};

// ============================================================================
// Round Store Errors
// ============================================================================

/// Errors raised by round creation and ending.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoundError {
    #[error("incorrect fee: expected {expected}, paid {paid}")]
    IncorrectFee { expected: Amount, paid: Amount },

    #[error("round {0} does not exist")]
    RoundNotFound(RoundId),

    #[error("round {0} has not reached its end time")]
    RoundStillActive(RoundId),

    #[error("round {0} has already ended")]
    RoundAlreadyEnded(RoundId),

    #[error("round duration {requested}s is below the minimum of {minimum}s")]
    InvalidDuration { requested: u64, minimum: u64 },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Fhe(#[from] FheError),
}

impl GameError for RoundError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::IncorrectFee { .. } | Self::InvalidDuration { .. } => ErrorSeverity::Validation,
            Self::RoundNotFound(_) | Self::RoundAlreadyEnded(_) => ErrorSeverity::Validation,
            Self::RoundStillActive(_) => ErrorSeverity::Recoverable,
            Self::Codec(err) => err.severity(),
            Self::Fhe(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::IncorrectFee { .. } => "IncorrectFee",
            Self::RoundNotFound(_) => "RoundNotFound",
            Self::RoundStillActive(_) => "RoundStillActive",
            Self::RoundAlreadyEnded(_) => "RoundAlreadyEnded",
            Self::InvalidDuration { .. } => "InvalidDuration",
            Self::Codec(err) => err.error_code(),
            Self::Fhe(err) => err.error_code(),
        }
    }
}

// ============================================================================
// Guess Processor Errors
// ============================================================================

/// Errors raised by guess submission.
///
/// None of these depend on the plaintext guess: an out-of-range value is
/// clamped, never rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GuessError {
    #[error("round {0} is not accepting guesses")]
    RoundNotActive(RoundId),

    #[error("incorrect fee: expected {expected}, paid {paid}")]
    IncorrectFee { expected: Amount, paid: Amount },

    #[error("{player} already submitted a guess in round {round_id}")]
    PlayerAlreadyParticipated { round_id: RoundId, player: Address },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Fhe(#[from] FheError),
}

impl GameError for GuessError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RoundNotActive(_) => ErrorSeverity::Validation,
            Self::IncorrectFee { .. } | Self::PlayerAlreadyParticipated { .. } => {
                ErrorSeverity::Validation
            }
            Self::Codec(err) => err.severity(),
            Self::Fhe(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::RoundNotActive(_) => "RoundNotActive",
            Self::IncorrectFee { .. } => "IncorrectFee",
            Self::PlayerAlreadyParticipated { .. } => "PlayerAlreadyParticipated",
            Self::Codec(err) => err.error_code(),
            Self::Fhe(err) => err.error_code(),
        }
    }
}

// ============================================================================
// Reveal Coordinator Errors
// ============================================================================

/// Errors raised by the reveal workflow.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RevealError {
    #[error("round {0} does not exist")]
    RoundNotFound(RoundId),

    #[error("round {0} has not ended yet")]
    RoundStillActive(RoundId),

    #[error("round {0} already has a pending reveal request")]
    RevealAlreadyPending(RoundId),

    #[error("round {0} has already been revealed")]
    RoundAlreadyRevealed(RoundId),

    #[error("round {0} has no pending reveal request")]
    RevealNotPending(RoundId),

    #[error("reveal for round {round_id} cannot be cancelled before {stale_at}")]
    RevealNotStale {
        round_id: RoundId,
        stale_at: Timestamp,
    },

    #[error("no pending reveal request {0}")]
    UnknownRequest(RequestId),

    #[error("decryption signature for {0} did not verify")]
    InvalidDecryptionProof(RequestId),

    #[error("expected {expected} cleartexts, received {received}")]
    MalformedDecryption { expected: usize, received: usize },

    #[error(transparent)]
    Fhe(#[from] FheError),
}

impl GameError for RevealError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RoundStillActive(_) | Self::RevealNotStale { .. } => ErrorSeverity::Recoverable,
            Self::RevealAlreadyPending(_) => ErrorSeverity::Recoverable,
            Self::RoundNotFound(_) | Self::RoundAlreadyRevealed(_) | Self::RevealNotPending(_) => {
                ErrorSeverity::Validation
            }
            Self::UnknownRequest(_)
            | Self::InvalidDecryptionProof(_)
            | Self::MalformedDecryption { .. } => ErrorSeverity::Validation,
            Self::Fhe(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::RoundNotFound(_) => "RoundNotFound",
            Self::RoundStillActive(_) => "RoundStillActive",
            Self::RevealAlreadyPending(_) => "RevealAlreadyPending",
            Self::RoundAlreadyRevealed(_) => "RoundAlreadyRevealed",
            Self::RevealNotPending(_) => "RevealNotPending",
            Self::RevealNotStale { .. } => "RevealNotStale",
            Self::UnknownRequest(_) => "UnknownRequest",
            Self::InvalidDecryptionProof(_) => "InvalidDecryptionProof",
            Self::MalformedDecryption { .. } => "MalformedDecryption",
            Self::Fhe(err) => err.error_code(),
        }
    }
}

// ============================================================================
// Unified Error
// ============================================================================

/// Any engine rejection.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecuteError {
    #[error(transparent)]
    Round(#[from] RoundError),

    #[error(transparent)]
    Guess(#[from] GuessError),

    #[error(transparent)]
    Reveal(#[from] RevealError),
}

impl GameError for ExecuteError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Round(err) => err.severity(),
            Self::Guess(err) => err.severity(),
            Self::Reveal(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Round(err) => err.error_code(),
            Self::Guess(err) => err.error_code(),
            Self::Reveal(err) => err.error_code(),
        }
    }
}
