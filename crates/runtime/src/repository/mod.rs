//! Repository layer for game state snapshots.
//!
//! The worker saves a snapshot after every successful mutation, indexed by
//! `GameState::nonce`, and a runtime can resume from the latest one.

mod error;
mod file;
mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileStateRepository;
pub use memory::InMemoryStateRepo;
pub use traits::StateRepository;
