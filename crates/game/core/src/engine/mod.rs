//! Round, guess and reveal execution.
//!
//! The [`GameEngine`] is the authoritative reducer for [`GameState`]. Every
//! operation validates its preconditions and computes all homomorphic results
//! before the first write, so a rejected call leaves the state exactly as it
//! was. Successful mutations bump `GameState::nonce`.
//!
//! The engine is synchronous and assumes its caller serializes operations;
//! the runtime does so with a single worker task.

mod errors;
mod guess;
mod reveal;
mod round;

pub use errors::{ExecuteError, GuessError, RevealError, RoundError};

use crate::codec::{ExternalInput, Handle};
use crate::config::GameConfig;
use crate::state::{Address, Amount, GameState, RequestId, RoundId, Timestamp};

/// Request to open a new round.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreateRound {
    pub creator: Address,
    /// Client-encrypted 16-bit secret.
    pub secret: ExternalInput,
    pub fee: Amount,
    /// Round length in seconds; `None` or `Some(0)` selects the configured default.
    pub duration_override: Option<u64>,
}

/// Request to submit one player's guess.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubmitGuess {
    pub player: Address,
    pub round_id: RoundId,
    /// Client-encrypted 16-bit guess.
    pub guess: ExternalInput,
    pub fee: Amount,
}

/// Result of an accepted guess. Carries handles only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuessReceipt {
    pub round_id: RoundId,
    pub player: Address,
    pub guess_time: Timestamp,
    pub total_guesses: u64,
    pub encrypted_guess: Handle,
    pub encrypted_hint: Handle,
}

/// Handles a reveal must decrypt, produced before the oracle is contacted.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevealPlan {
    pub round_id: RoundId,
    /// `[secret, match_1, .., match_n]`, participants in submission order.
    pub handles: Vec<Handle>,
}

/// Public result of a fulfilled reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevealOutcome {
    pub round_id: RoundId,
    pub request_id: RequestId,
    pub secret: u16,
    /// Earliest matching participant; `None` when nobody guessed the secret.
    pub winner: Option<Address>,
}

/// Game engine that applies operations to a borrowed [`GameState`].
pub struct GameEngine<'a> {
    state: &'a mut GameState,
    config: &'a GameConfig,
}

impl<'a> GameEngine<'a> {
    /// Creates a new game engine over the given state.
    pub fn new(state: &'a mut GameState, config: &'a GameConfig) -> Self {
        Self { state, config }
    }

    pub fn state(&self) -> &GameState {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        self.config
    }

    fn commit(&mut self) {
        self.state.nonce += 1;
    }
}
