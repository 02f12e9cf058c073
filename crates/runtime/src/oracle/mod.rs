//! Decryption oracle seam.
//!
//! The worker hands each reveal to a [`DecryptionOracle`] together with the
//! channel its response must come back on. Responses are asynchronous and may
//! never arrive; the worker treats them like any other inbound message.

mod relayer;

pub use relayer::{KmsRelayer, RelayMode};

use async_trait::async_trait;
use game_core::{DecryptionResponse, FheError, Handle, RequestId, RoundId};
use thiserror::Error;
use tokio::sync::mpsc;

/// Handles one round needs decrypted, in `[secret, match_1, .., match_n]` order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptionRequest {
    pub round_id: RoundId,
    pub handles: Vec<Handle>,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("decryption backend rejected the request: {0}")]
    Decryption(#[from] FheError),

    #[error("decryption oracle unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DecryptionOracle: Send + Sync {
    /// Accepts `request` and returns the id its response will carry.
    ///
    /// The response is delivered later on `reply_to`. Implementations must
    /// not block on that channel inside `submit`.
    async fn submit(
        &self,
        request: DecryptionRequest,
        reply_to: mpsc::Sender<DecryptionResponse>,
    ) -> Result<RequestId, OracleError>;
}
