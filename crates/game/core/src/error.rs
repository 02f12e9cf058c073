//! Common error infrastructure for game-core.
//!
//! This module provides shared types and traits used across all error types in
//! game-core. Component errors (`RoundError`, `GuessError`, `RevealError`,
//! `CodecError`) are defined next to the operations that raise them.
//!
//! Every rejection is synchronous and leaves the state untouched, so callers
//! only need the error kind to decide what to resubmit.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the same call may succeed later (e.g. a round that has
///   not reached its end time yet)
/// - **Validation**: the caller sent something wrong and must change it
/// - **Internal**: the backend or state disagrees with itself
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Retry after time passes or another party acts.
    ///
    /// Examples: round still active, reveal not stale yet
    Recoverable,

    /// Invalid input, should not retry without changes.
    ///
    /// Examples: wrong fee, malformed proof, second guess
    Validation,

    /// Unexpected backend or state inconsistency.
    ///
    /// Examples: handle missing from the ciphertext registry
    Internal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Common trait for all game-core errors.
///
/// `error_code()` returns the stable kind name (`"IncorrectFee"`,
/// `"PlayerAlreadyParticipated"`, ...) that a UI matches on.
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str;
}
