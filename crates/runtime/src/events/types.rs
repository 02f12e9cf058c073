//! Event types for different topics.

use game_core::{Address, Handle, RequestId, RoundId, Timestamp};
use serde::{Deserialize, Serialize};

/// Round lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEvent {
    RoundCreated {
        round_id: RoundId,
        creator: Address,
        start_time: Timestamp,
        end_time: Timestamp,
    },

    RoundEnded {
        round_id: RoundId,
        total_guesses: u64,
    },
}

/// Accepted guesses. The hint handle is only useful to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuessEvent {
    GuessSubmitted {
        round_id: RoundId,
        player: Address,
        guess_time: Timestamp,
        total_guesses: u64,
        encrypted_hint: Handle,
    },
}

/// Reveal workflow events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealEvent {
    RevealRequested {
        round_id: RoundId,
        request_id: RequestId,
        requested_at: Timestamp,
    },

    RevealFulfilled {
        round_id: RoundId,
        request_id: RequestId,
        secret: u16,
        winner: Option<Address>,
    },

    RevealCancelled {
        round_id: RoundId,
        request_id: RequestId,
    },

    /// An oracle response was refused (unknown request, bad signature, bad shape).
    RevealRejected {
        request_id: RequestId,
        code: String,
        error: String,
    },
}
