//! Authoritative game state representation.
//!
//! This module owns the data structures that describe rounds, player
//! submissions and reveal bookkeeping. Runtime layers clone or query this
//! state but mutate it exclusively through the engine.
mod common;
mod reveal;
mod round;

use std::collections::BTreeMap;

use crate::codec::Handle;

pub use common::{Address, Amount, Hint, RequestId, RoundId, Timestamp};
pub use reveal::{RevealPhase, RevealRecord, RevealRequest, RevealStatus};
pub use round::{PlayerState, PlayerStateView, Round, RoundInfo};

/// Canonical snapshot of every round the game has hosted.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameState {
    /// Number of successful mutations applied so far.
    ///
    /// Used by repositories to index snapshots.
    pub nonce: u64,

    /// Id of the most recently created round (`RoundId::NONE` before the first).
    current_round: RoundId,

    pub rounds: BTreeMap<RoundId, Round>,

    /// Pending oracle requests, for correlating responses with rounds.
    pub(crate) pending_requests: BTreeMap<RequestId, RoundId>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_round_id(&self) -> RoundId {
        self.current_round
    }

    pub(crate) fn allocate_round_id(&mut self) -> RoundId {
        self.current_round = self.current_round.next();
        self.current_round
    }

    pub fn round(&self, round_id: RoundId) -> Option<&Round> {
        self.rounds.get(&round_id)
    }

    pub(crate) fn round_mut(&mut self, round_id: RoundId) -> Option<&mut Round> {
        self.rounds.get_mut(&round_id)
    }

    pub fn round_info(&self, round_id: RoundId) -> Option<RoundInfo> {
        self.round(round_id).map(Round::info)
    }

    /// Public view of a player's submission; the default view when the round
    /// or the player is unknown.
    pub fn player_state(&self, round_id: RoundId, player: &Address) -> PlayerStateView {
        self.round(round_id)
            .and_then(|round| round.players.get(player))
            .map(PlayerState::view)
            .unwrap_or_default()
    }

    pub fn reveal_status(&self, round_id: RoundId) -> Option<RevealStatus> {
        self.round(round_id).map(|round| round.reveal.status())
    }

    pub fn has_player_won(&self, round_id: RoundId, player: &Address) -> bool {
        self.round(round_id)
            .filter(|round| round.reveal.is_revealed())
            .and_then(|round| round.reveal.winner)
            .is_some_and(|winner| winner == *player)
    }

    /// Every ciphertext handle the state refers to: each round's secret and
    /// pot, then each player's guess, hint and match flag.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.rounds.values().flat_map(|round| {
            [round.secret.handle(), round.pot.handle()]
                .into_iter()
                .chain(round.players.values().flat_map(|player| {
                    [
                        player.encrypted_guess.handle(),
                        player.encrypted_hint.handle(),
                        player.encrypted_match.handle(),
                    ]
                }))
        })
    }

    /// Round a pending request belongs to.
    pub fn round_for_request(&self, request_id: RequestId) -> Option<RoundId> {
        self.pending_requests.get(&request_id).copied()
    }
}
