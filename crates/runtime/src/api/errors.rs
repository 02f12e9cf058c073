//! Unified error types surfaced by the runtime API.
//!
//! Wraps engine rejections, oracle failures, worker coordination and
//! repository errors so clients can bubble them up with consistent context.
use game_core::{
    ErrorSeverity, ExecuteError, FheError, GameError, GuessError, Handle, RevealError, RoundError,
};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::oracle::OracleError;
pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("game worker command channel closed")]
    CommandChannelClosed,

    #[error("game worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("game worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("snapshot {nonce} refers to ciphertext {handle} unknown to the coprocessor")]
    UnknownSnapshotHandle { nonce: u64, handle: Handle },

    #[error(transparent)]
    Fhe(#[from] FheError),
}

impl RuntimeError {
    /// Stable kind name of an engine rejection, if this is one.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Execute(err) => Some(err.error_code()),
            _ => None,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Execute(err) => err.severity(),
            Self::Oracle(_) => ErrorSeverity::Recoverable,
            _ => ErrorSeverity::Internal,
        }
    }
}

impl From<RoundError> for RuntimeError {
    fn from(err: RoundError) -> Self {
        Self::Execute(err.into())
    }
}

impl From<GuessError> for RuntimeError {
    fn from(err: GuessError) -> Self {
        Self::Execute(err.into())
    }
}

impl From<RevealError> for RuntimeError {
    fn from(err: RevealError) -> Self {
        Self::Execute(err.into())
    }
}
