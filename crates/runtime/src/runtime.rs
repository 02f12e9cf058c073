//! High-level runtime orchestrator.
//!
//! The runtime owns the game worker, wires up command/event channels, and
//! exposes a builder-based API for clients to drive rounds.

use std::sync::Arc;

use fhe::{Coprocessor, CoprocessorKeys};
use game_core::GameState;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::clock::{Clock, SystemClock};
use crate::config::RuntimeConfig;
use crate::events::EventBus;
use crate::oracle::{DecryptionOracle, KmsRelayer, RelayMode};
use crate::repository::{FileStateRepository, StateRepository};
use crate::workers::{Command, GameWorker};
use crate::workers::game::WorkerParts;

/// Main runtime that hosts the game worker.
///
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    coprocessor: Arc<Coprocessor>,
    worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// The FHE backend the worker evaluates on. Clients encrypt inputs and
    /// decrypt their own handles through it.
    pub fn coprocessor(&self) -> &Arc<Coprocessor> {
        &self.coprocessor
    }

    /// Shutdown the runtime gracefully
    ///
    /// The worker stops once every outstanding [`RuntimeHandle`] clone is dropped.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);

        self.worker_handle.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    state: Option<GameState>,
    coprocessor: Option<Arc<Coprocessor>>,
    oracle: Option<Arc<dyn DecryptionOracle>>,
    relay_mode: RelayMode,
    clock: Option<Arc<dyn Clock>>,
    repository: Option<Arc<dyn StateRepository>>,
    resume: bool,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            state: None,
            coprocessor: None,
            oracle: None,
            relay_mode: RelayMode::default(),
            clock: None,
            repository: None,
            resume: false,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Provide initial game state
    pub fn initial_state(mut self, state: GameState) -> Self {
        self.state = Some(state);
        self
    }

    /// Use an existing coprocessor instead of generating fresh keys.
    pub fn coprocessor(mut self, coprocessor: Arc<Coprocessor>) -> Self {
        self.coprocessor = Some(coprocessor);
        self
    }

    /// Replace the default [`KmsRelayer`]. The oracle must decrypt against
    /// the same coprocessor the runtime uses.
    pub fn oracle(mut self, oracle: Arc<dyn DecryptionOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Relay mode of the default oracle. Ignored when [`Self::oracle`] is set.
    pub fn relay_mode(mut self, mode: RelayMode) -> Self {
        self.relay_mode = mode;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Persist snapshots through `repository`. Takes precedence over
    /// `RuntimeConfig::state_dir`.
    pub fn repository(mut self, repository: Arc<dyn StateRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Start from the repository's latest snapshot when one exists.
    ///
    /// Snapshots hold ciphertext handles only, so the runtime must be given
    /// the [`Coprocessor`] that sealed them. [`Self::build`] fails with
    /// [`RuntimeError::UnknownSnapshotHandle`] otherwise.
    pub fn resume_from_repository(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Build the runtime and spawn its worker.
    pub async fn build(self) -> Result<Runtime> {
        let repository = match (self.repository, &self.config.state_dir) {
            (Some(repository), _) => Some(repository),
            (None, Some(dir)) => {
                Some(Arc::new(FileStateRepository::new(dir)?) as Arc<dyn StateRepository>)
            }
            (None, None) => None,
        };

        let resumed = match (&repository, self.resume) {
            (Some(repository), true) => repository.load_latest()?,
            _ => None,
        };
        let coprocessor = self
            .coprocessor
            .unwrap_or_else(|| Arc::new(Coprocessor::new(CoprocessorKeys::generate())));

        let initial_state = match resumed {
            Some(state) => {
                ensure_handles_registered(&state, &coprocessor)?;
                info!(nonce = state.nonce, "resuming from stored snapshot");
                state
            }
            None => self.state.unwrap_or_default(),
        };
        let oracle = self.oracle.unwrap_or_else(|| {
            Arc::new(KmsRelayer::new(coprocessor.clone(), self.relay_mode))
                as Arc<dyn DecryptionOracle>
        });
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let (command_tx, command_rx) =
            mpsc::channel::<Command>(self.config.command_buffer_size.max(1));
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);
        let handle = RuntimeHandle::new(command_tx, event_bus.clone(), self.config.contract);

        let worker = GameWorker::new(
            WorkerParts {
                state: initial_state,
                config: self.config.game,
                contract: self.config.contract,
                coprocessor: coprocessor.clone(),
                oracle,
                clock,
                repository,
                snapshot_retention: self.config.snapshot_retention,
                event_bus,
            },
            command_rx,
            self.config.command_buffer_size,
        );
        let worker_handle = tokio::spawn(worker.run());

        Ok(Runtime {
            handle,
            coprocessor,
            worker_handle,
        })
    }
}

/// Rejects a snapshot whose ciphertexts live in a different coprocessor.
fn ensure_handles_registered(state: &GameState, coprocessor: &Coprocessor) -> Result<()> {
    for handle in state.handles() {
        if !coprocessor.is_registered(&handle)? {
            warn!(nonce = state.nonce, %handle, "snapshot handle not registered");
            return Err(RuntimeError::UnknownSnapshotHandle {
                nonce: state.nonce,
                handle,
            });
        }
    }
    Ok(())
}
