//! Deterministic rules for the encrypted guess-the-number game.
//!
//! `game-core` defines the canonical round/guess/reveal state machine and the
//! encrypted-value contract it relies on. It never sees plaintext guesses:
//! every homomorphic operation is delegated to the capability traits in
//! [`env`], which a backend crate implements. All state mutation flows through
//! [`engine::GameEngine`], and supporting crates depend on the types
//! re-exported here.
pub mod codec;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod state;

#[cfg(test)]
mod testing;

pub use codec::{
    CodecError, EncryptedValue, ExternalInput, HANDLE_LEN, HANDLE_VERSION, Handle, InputProof,
    WidthTag,
};
pub use config::GameConfig;
pub use engine::{
    CreateRound, ExecuteError, GameEngine, GuessError, GuessReceipt, RevealError, RevealOutcome,
    RevealPlan, RoundError, SubmitGuess,
};
pub use env::{
    AccessControl, Comparator, DecryptionResponse, DecryptionVerifier, Evaluator, FheBackend,
    FheEnv, FheError, InputVerifier,
};
pub use error::{ErrorSeverity, GameError};
pub use state::{
    Address, Amount, GameState, Hint, PlayerState, PlayerStateView, RequestId, RevealPhase,
    RevealRecord, RevealRequest, RevealStatus, Round, RoundId, RoundInfo, Timestamp,
};
