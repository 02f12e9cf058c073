//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! every game operation, plus streaming events from specific topics.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use game_core::{
    Address, Amount, CreateRound, DecryptionResponse, ExternalInput, GameState, GuessReceipt,
    PlayerStateView, RequestId, RevealOutcome, RevealStatus, RoundId, RoundInfo, SubmitGuess,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
    contract: Address,
}

impl RuntimeHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
        contract: Address,
    ) -> Self {
        Self {
            command_tx,
            event_bus,
            contract,
        }
    }

    /// Address input proofs must be issued for.
    pub fn contract(&self) -> Address {
        self.contract
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Open a round with an encrypted secret. `duration` of `None` or
    /// `Some(0)` uses the configured default.
    pub async fn create_round(
        &self,
        creator: Address,
        secret: ExternalInput,
        fee: Amount,
        duration: Option<u64>,
    ) -> Result<RoundId> {
        let command = CreateRound {
            creator,
            secret,
            fee,
            duration_override: duration,
        };
        self.request(|reply| Command::CreateRound { command, reply })
            .await?
    }

    pub async fn submit_guess(
        &self,
        player: Address,
        round_id: RoundId,
        guess: ExternalInput,
        fee: Amount,
    ) -> Result<GuessReceipt> {
        let command = SubmitGuess {
            player,
            round_id,
            guess,
            fee,
        };
        self.request(|reply| Command::SubmitGuess { command, reply })
            .await?
    }

    pub async fn end_round(&self, round_id: RoundId) -> Result<()> {
        self.request(|reply| Command::EndRound { round_id, reply })
            .await?
    }

    /// Ask the oracle to decrypt the secret and every match flag.
    pub async fn request_round_reveal(&self, round_id: RoundId) -> Result<RequestId> {
        self.request(|reply| Command::RequestReveal { round_id, reply })
            .await?
    }

    /// Abandon a reveal that has been pending for at least the reveal timeout.
    pub async fn cancel_reveal(&self, round_id: RoundId) -> Result<RequestId> {
        self.request(|reply| Command::CancelReveal { round_id, reply })
            .await?
    }

    /// Deliver an oracle response directly, as a relayer callback would.
    pub async fn fulfill_reveal(&self, response: DecryptionResponse) -> Result<RevealOutcome> {
        self.request(|reply| Command::FulfillReveal { response, reply })
            .await?
    }

    pub async fn get_round_info(&self, round_id: RoundId) -> Result<RoundInfo> {
        self.request(|reply| Command::RoundInfo { round_id, reply })
            .await?
    }

    pub async fn get_player_state(
        &self,
        round_id: RoundId,
        player: Address,
    ) -> Result<PlayerStateView> {
        self.request(|reply| Command::PlayerState {
            round_id,
            player,
            reply,
        })
        .await?
    }

    pub async fn get_reveal_status(&self, round_id: RoundId) -> Result<RevealStatus> {
        self.request(|reply| Command::RevealStatus { round_id, reply })
            .await?
    }

    /// Id of the most recently created round; zero before the first.
    pub async fn current_round_id(&self) -> Result<RoundId> {
        self.request(|reply| Command::CurrentRoundId { reply }).await
    }

    /// `true` only once the round is revealed and `player` is its winner.
    pub async fn has_player_won(&self, round_id: RoundId, player: Address) -> Result<bool> {
        self.request(|reply| Command::HasPlayerWon {
            round_id,
            player,
            reply,
        })
        .await
    }

    /// Query the current game state (read-only snapshot)
    pub async fn query_state(&self) -> Result<GameState> {
        self.request(|reply| Command::QueryState { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Round` - Round creation and ending
    /// - `Topic::Guess` - Accepted guesses
    /// - `Topic::Reveal` - Reveal requests, results, cancellations and rejected responses
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::Topic;
    ///
    /// let mut reveals = handle.subscribe(Topic::Reveal);
    /// while let Ok(event) = reveals.recv().await {
    ///     // Handle reveal events
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    ///
    /// Returns a map of topic to receiver for each requested topic.
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
