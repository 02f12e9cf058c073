use std::collections::BTreeMap;

use super::common::{Address, RoundId, Timestamp};
use super::reveal::RevealRecord;
use crate::codec::{EncryptedValue, Handle};

/// Authoritative record of one round. Rounds are never deleted.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Round {
    pub id: RoundId,
    /// Account that created and funded the round; may decrypt the pot.
    pub creator: Address,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub is_active: bool,
    /// 16-bit secret, immutable after creation.
    pub secret: EncryptedValue,
    /// 64-bit prize pool accumulator.
    pub pot: EncryptedValue,
    pub total_guesses: u64,
    /// Players in submission order.
    pub participants: Vec<Address>,
    pub players: BTreeMap<Address, PlayerState>,
    pub reveal: RevealRecord,
}

impl Round {
    /// True while guesses may still be submitted at `now`.
    pub fn accepts_guesses(&self, now: Timestamp) -> bool {
        self.is_active && now < self.end_time
    }

    pub fn info(&self) -> RoundInfo {
        RoundInfo {
            start_time: self.start_time,
            end_time: self.end_time,
            is_active: self.is_active,
            total_guesses: self.total_guesses,
            pot: self.pot.handle(),
        }
    }
}

/// Read-only projection of a round. Exposes the pot handle, never an amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoundInfo {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub is_active: bool,
    pub total_guesses: u64,
    pub pot: Handle,
}

/// One player's accepted submission in a round.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerState {
    pub has_submitted: bool,
    pub guess_time: Timestamp,
    /// Sanitized guess, decryptable by the player only.
    pub encrypted_guess: EncryptedValue,
    /// 0 = exact, 1 = too high, 2 = too low; decryptable by the player only.
    pub encrypted_hint: EncryptedValue,
    /// `guess == secret`, decryptable by the game only; consumed by the reveal.
    pub encrypted_match: EncryptedValue,
}

impl PlayerState {
    pub fn view(&self) -> PlayerStateView {
        PlayerStateView {
            has_submitted: self.has_submitted,
            guess_time: self.guess_time,
            encrypted_guess: self.encrypted_guess.handle(),
            encrypted_hint: self.encrypted_hint.handle(),
        }
    }
}

/// Public projection of a player's state; default when the player never played.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerStateView {
    pub has_submitted: bool,
    pub guess_time: Timestamp,
    pub encrypted_guess: Handle,
    pub encrypted_hint: Handle,
}
