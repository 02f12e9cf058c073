//! Game worker that owns the authoritative [`game_core::GameState`].
//!
//! Receives commands from [`crate::RuntimeHandle`] and decryption responses
//! from the oracle, executes them through [`game_core::GameEngine`], persists
//! a snapshot after every mutation and publishes events to the EventBus.

use std::sync::Arc;

use fhe::Coprocessor;
use game_core::{
    Address, CreateRound, DecryptionResponse, FheEnv, GameConfig, GameEngine, GameError,
    GameState, GuessReceipt, PlayerStateView, RequestId, RevealError, RevealOutcome,
    RevealStatus, RoundError, RoundId, RoundInfo, SubmitGuess,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::api::Result;
use crate::clock::Clock;
use crate::events::{EventBus, GuessEvent, RevealEvent, RoundEvent};
use crate::oracle::{DecryptionOracle, DecryptionRequest};
use crate::repository::StateRepository;

/// Commands that can be sent to the game worker
pub enum Command {
    CreateRound {
        command: CreateRound,
        reply: oneshot::Sender<Result<RoundId>>,
    },
    SubmitGuess {
        command: SubmitGuess,
        reply: oneshot::Sender<Result<GuessReceipt>>,
    },
    EndRound {
        round_id: RoundId,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Marks the round's handles public and hands them to the oracle.
    RequestReveal {
        round_id: RoundId,
        reply: oneshot::Sender<Result<RequestId>>,
    },
    CancelReveal {
        round_id: RoundId,
        reply: oneshot::Sender<Result<RequestId>>,
    },
    /// Oracle callback delivered through the handle instead of the response channel.
    FulfillReveal {
        response: DecryptionResponse,
        reply: oneshot::Sender<Result<RevealOutcome>>,
    },
    RoundInfo {
        round_id: RoundId,
        reply: oneshot::Sender<Result<RoundInfo>>,
    },
    PlayerState {
        round_id: RoundId,
        player: Address,
        reply: oneshot::Sender<Result<PlayerStateView>>,
    },
    RevealStatus {
        round_id: RoundId,
        reply: oneshot::Sender<Result<RevealStatus>>,
    },
    HasPlayerWon {
        round_id: RoundId,
        player: Address,
        reply: oneshot::Sender<bool>,
    },
    CurrentRoundId {
        reply: oneshot::Sender<RoundId>,
    },
    /// Query the current game state (read-only).
    QueryState {
        reply: oneshot::Sender<GameState>,
    },
}

/// Everything the worker needs besides its channels.
pub(crate) struct WorkerParts {
    pub state: GameState,
    pub config: GameConfig,
    pub contract: Address,
    pub coprocessor: Arc<Coprocessor>,
    pub oracle: Arc<dyn DecryptionOracle>,
    pub clock: Arc<dyn Clock>,
    pub repository: Option<Arc<dyn StateRepository>>,
    pub snapshot_retention: usize,
    pub event_bus: EventBus,
}

/// Background task that processes game commands and oracle responses.
pub struct GameWorker {
    state: GameState,
    config: GameConfig,
    contract: Address,
    coprocessor: Arc<Coprocessor>,
    oracle: Arc<dyn DecryptionOracle>,
    clock: Arc<dyn Clock>,
    repository: Option<Arc<dyn StateRepository>>,
    snapshot_retention: usize,
    event_bus: EventBus,
    command_rx: mpsc::Receiver<Command>,
    response_tx: mpsc::Sender<DecryptionResponse>,
    response_rx: mpsc::Receiver<DecryptionResponse>,
}

impl GameWorker {
    pub(crate) fn new(
        parts: WorkerParts,
        command_rx: mpsc::Receiver<Command>,
        response_buffer: usize,
    ) -> Self {
        let (response_tx, response_rx) = mpsc::channel(response_buffer.max(1));

        info!(
            contract = %parts.contract,
            rounds = parts.state.rounds.len(),
            nonce = parts.state.nonce,
            "GameWorker initialized"
        );

        Self {
            state: parts.state,
            config: parts.config,
            contract: parts.contract,
            coprocessor: parts.coprocessor,
            oracle: parts.oracle,
            clock: parts.clock,
            repository: parts.repository,
            snapshot_retention: parts.snapshot_retention,
            event_bus: parts.event_bus,
            command_rx,
            response_tx,
            response_rx,
        }
    }

    /// Main worker loop. Exits once every command sender is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                Some(response) = self.response_rx.recv() => {
                    let _ = self.fulfill(response);
                }
            }
        }
        debug!("GameWorker stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::CreateRound { command, reply } => {
                let result = self.create_round(command);
                respond(reply, result, "CreateRound");
            }
            Command::SubmitGuess { command, reply } => {
                let result = self.submit_guess(command);
                respond(reply, result, "SubmitGuess");
            }
            Command::EndRound { round_id, reply } => {
                let result = self.end_round(round_id);
                respond(reply, result, "EndRound");
            }
            Command::RequestReveal { round_id, reply } => {
                let result = self.request_reveal(round_id).await;
                respond(reply, result, "RequestReveal");
            }
            Command::CancelReveal { round_id, reply } => {
                let result = self.cancel_reveal(round_id);
                respond(reply, result, "CancelReveal");
            }
            Command::FulfillReveal { response, reply } => {
                let result = self.fulfill(response);
                respond(reply, result, "FulfillReveal");
            }
            Command::RoundInfo { round_id, reply } => {
                let result: Result<RoundInfo> = self
                    .state
                    .round_info(round_id)
                    .ok_or_else(|| RoundError::RoundNotFound(round_id).into());
                respond(reply, result, "RoundInfo");
            }
            Command::PlayerState {
                round_id,
                player,
                reply,
            } => {
                let result: Result<PlayerStateView> = match self.state.round(round_id) {
                    Some(_) => Ok(self.state.player_state(round_id, &player)),
                    None => Err(RoundError::RoundNotFound(round_id).into()),
                };
                respond(reply, result, "PlayerState");
            }
            Command::RevealStatus { round_id, reply } => {
                let result: Result<RevealStatus> = self
                    .state
                    .reveal_status(round_id)
                    .ok_or_else(|| RoundError::RoundNotFound(round_id).into());
                respond(reply, result, "RevealStatus");
            }
            Command::HasPlayerWon {
                round_id,
                player,
                reply,
            } => {
                respond(reply, self.state.has_player_won(round_id, &player), "HasPlayerWon");
            }
            Command::CurrentRoundId { reply } => {
                respond(reply, self.state.current_round_id(), "CurrentRoundId");
            }
            Command::QueryState { reply } => {
                respond(reply, self.state.clone(), "QueryState");
            }
        }
    }

    fn create_round(&mut self, command: CreateRound) -> Result<RoundId> {
        let now = self.clock.now();
        let creator = command.creator;
        let round_id = {
            let ctx = self.coprocessor.context(self.contract);
            let env = FheEnv::from_backend(&ctx, self.contract);
            GameEngine::new(&mut self.state, &self.config).create_round(env, command, now)?
        };

        let Some(info) = self.state.round_info(round_id) else {
            return Err(RoundError::RoundNotFound(round_id).into());
        };
        info!(%round_id, %creator, end_time = %info.end_time, "round created");
        self.persist();
        self.event_bus.publish(RoundEvent::RoundCreated {
            round_id,
            creator,
            start_time: info.start_time,
            end_time: info.end_time,
        });
        Ok(round_id)
    }

    fn submit_guess(&mut self, command: SubmitGuess) -> Result<GuessReceipt> {
        let now = self.clock.now();
        let receipt = {
            let ctx = self.coprocessor.context(self.contract);
            let env = FheEnv::from_backend(&ctx, self.contract);
            GameEngine::new(&mut self.state, &self.config).submit_guess(env, command, now)?
        };

        info!(
            round_id = %receipt.round_id,
            player = %receipt.player,
            total_guesses = receipt.total_guesses,
            "guess accepted"
        );
        self.persist();
        self.event_bus.publish(GuessEvent::GuessSubmitted {
            round_id: receipt.round_id,
            player: receipt.player,
            guess_time: receipt.guess_time,
            total_guesses: receipt.total_guesses,
            encrypted_hint: receipt.encrypted_hint,
        });
        Ok(receipt)
    }

    fn end_round(&mut self, round_id: RoundId) -> Result<()> {
        let now = self.clock.now();
        GameEngine::new(&mut self.state, &self.config).end_round(round_id, now)?;

        let total_guesses = self
            .state
            .round(round_id)
            .map(|round| round.total_guesses)
            .unwrap_or_default();
        info!(%round_id, total_guesses, "round ended");
        self.persist();
        self.event_bus.publish(RoundEvent::RoundEnded {
            round_id,
            total_guesses,
        });
        Ok(())
    }

    async fn request_reveal(&mut self, round_id: RoundId) -> Result<RequestId> {
        // The FHE environment borrows the coprocessor and must not live across the await.
        let plan = {
            let ctx = self.coprocessor.context(self.contract);
            let env = FheEnv::from_backend(&ctx, self.contract);
            GameEngine::new(&mut self.state, &self.config).prepare_reveal(env, round_id)?
        };

        let request = DecryptionRequest {
            round_id,
            handles: plan.handles.clone(),
        };
        // A failed submission leaves the handles public but the state untouched.
        let request_id = self
            .oracle
            .submit(request, self.response_tx.clone())
            .await
            .inspect_err(|err| warn!(%round_id, "oracle refused reveal: {err}"))?;

        let now = self.clock.now();
        GameEngine::new(&mut self.state, &self.config).commit_reveal(plan, request_id, now)?;

        info!(%round_id, %request_id, "reveal requested");
        self.persist();
        self.event_bus.publish(RevealEvent::RevealRequested {
            round_id,
            request_id,
            requested_at: now,
        });
        Ok(request_id)
    }

    fn cancel_reveal(&mut self, round_id: RoundId) -> Result<RequestId> {
        let now = self.clock.now();
        let request_id =
            GameEngine::new(&mut self.state, &self.config).cancel_reveal(round_id, now)?;

        warn!(%round_id, %request_id, "stale reveal cancelled");
        self.persist();
        self.event_bus.publish(RevealEvent::RevealCancelled {
            round_id,
            request_id,
        });
        Ok(request_id)
    }

    /// Applies an oracle response. Rejections leave the state untouched and
    /// are published so observers can see refused callbacks.
    fn fulfill(&mut self, response: DecryptionResponse) -> Result<RevealOutcome> {
        let request_id = response.request_id;
        let result = {
            let ctx = self.coprocessor.context(self.contract);
            let env = FheEnv::from_backend(&ctx, self.contract);
            GameEngine::new(&mut self.state, &self.config).fulfill_reveal(env, &response)
        };

        match result {
            Ok(outcome) => {
                info!(
                    round_id = %outcome.round_id,
                    %request_id,
                    secret = outcome.secret,
                    winner = ?outcome.winner,
                    "round revealed"
                );
                self.persist();
                self.event_bus.publish(RevealEvent::RevealFulfilled {
                    round_id: outcome.round_id,
                    request_id,
                    secret: outcome.secret,
                    winner: outcome.winner,
                });
                Ok(outcome)
            }
            Err(err) => {
                self.report_rejection(request_id, &err);
                Err(err.into())
            }
        }
    }

    fn report_rejection(&self, request_id: RequestId, err: &RevealError) {
        warn!(%request_id, code = err.error_code(), "decryption response rejected: {err}");
        self.event_bus.publish(RevealEvent::RevealRejected {
            request_id,
            code: err.error_code().to_string(),
            error: err.to_string(),
        });
    }

    fn persist(&self) {
        let Some(repository) = &self.repository else {
            return;
        };
        let nonce = self.state.nonce;
        if let Err(err) = repository.save(nonce, &self.state) {
            error!(nonce, "failed to persist game state: {err}");
            return;
        }
        // Zero keeps every snapshot.
        if self.snapshot_retention == 0 {
            return;
        }
        let keep_from = (nonce + 1).saturating_sub(self.snapshot_retention as u64);
        match repository.prune_before(keep_from) {
            Ok(0) => {}
            Ok(pruned) => debug!(nonce, pruned, "pruned old snapshots"),
            Err(err) => warn!(nonce, "failed to prune snapshots: {err}"),
        }
    }
}

fn respond<T>(reply: oneshot::Sender<T>, value: T, command: &'static str) {
    if reply.send(value).is_err() {
        debug!(command, "reply channel closed (caller dropped)");
    }
}
