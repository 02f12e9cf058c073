//! Runtime orchestration for the encrypted guessing game.
//!
//! This crate wires the FHE backend, the decryption oracle, repositories and
//! the game worker into a cohesive runtime API. Consumers embed [`Runtime`] to
//! host rounds, subscribe to events, and submit encrypted inputs through
//! [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`oracle`] relays public decryption requests and their signed responses
//! - [`repository`] stores state snapshots
//! - [`clock`] and [`config`] supply time and environment settings
pub mod api;
pub mod clock;
pub mod config;
pub mod events;
pub mod oracle;
pub mod repository;
pub mod runtime;

mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RuntimeConfig;
pub use events::{Event, EventBus, GuessEvent, RevealEvent, RoundEvent, Topic};
pub use oracle::{DecryptionOracle, DecryptionRequest, KmsRelayer, OracleError, RelayMode};
pub use repository::{FileStateRepository, InMemoryStateRepo, RepositoryError, StateRepository};
pub use runtime::{Runtime, RuntimeBuilder};
