//! Worker tasks that back the runtime orchestration.
//!
//! The game worker owns the authoritative state and serializes every
//! operation, including oracle responses arriving on their own channel.

pub(crate) mod game;

pub use game::{Command, GameWorker};
