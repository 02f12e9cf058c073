use super::common::{Address, RequestId, RoundId, Timestamp};
use crate::codec::Handle;

/// Lifecycle of a single decryption request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RevealPhase {
    Pending,
    Fulfilled,
    Cancelled,
}

/// A decryption request submitted to the oracle for one round.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevealRequest {
    pub request_id: RequestId,
    pub round_id: RoundId,
    pub requested_at: Timestamp,
    pub status: RevealPhase,
    /// `[secret, match_1, .., match_n]`, participants in submission order.
    pub handles: Vec<Handle>,
}

impl RevealRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RevealPhase::Pending
    }

    /// Earliest time at which the request may be cancelled.
    pub fn stale_at(&self, timeout: u64) -> Timestamp {
        self.requested_at.saturating_add(timeout)
    }
}

/// Reveal bookkeeping attached to a round.
///
/// `current` is the latest request; cancelled requests move to `cancelled`
/// and leave `current` empty so a new request can be made.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevealRecord {
    pub current: Option<RevealRequest>,
    pub cancelled: Vec<RevealRequest>,
    pub revealed_secret: Option<u16>,
    pub winner: Option<Address>,
}

impl RevealRecord {
    pub fn is_revealed(&self) -> bool {
        matches!(&self.current, Some(request) if request.status == RevealPhase::Fulfilled)
    }

    pub fn pending(&self) -> Option<&RevealRequest> {
        self.current.as_ref().filter(|request| request.is_pending())
    }

    pub fn status(&self) -> RevealStatus {
        let request_id = self
            .current
            .as_ref()
            .map(|request| request.request_id)
            .unwrap_or(RequestId::NONE);

        RevealStatus {
            is_revealed: self.is_revealed(),
            reveal_pending: self.pending().is_some(),
            revealed_secret: self.revealed_secret.unwrap_or(0),
            winner: self.winner.unwrap_or(Address::ZERO),
            request_id,
        }
    }
}

/// Public projection of a round's reveal.
///
/// `revealed_secret` and `winner` stay zero until the request is fulfilled;
/// `request_id` is zero when there is no pending or fulfilled request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevealStatus {
    pub is_revealed: bool,
    pub reveal_pending: bool,
    pub revealed_secret: u16,
    pub winner: Address,
    pub request_id: RequestId,
}
