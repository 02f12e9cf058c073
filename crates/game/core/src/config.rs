use crate::state::Amount;

/// Game configuration constants and tunable parameters.
///
/// One configuration applies to every round hosted by a runtime; rounds do
/// not carry their own fee or timeout.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    /// Exact fee required to create a round or submit a guess, in base units.
    pub entry_fee: Amount,
    /// Default round length in seconds, used when no override is supplied.
    pub round_duration: u64,
    /// Seconds a reveal request may stay pending before it can be cancelled.
    pub reveal_timeout: u64,
    /// Lowest accepted guess; smaller values are coerced to this bound.
    pub guess_min: u16,
    /// Highest accepted guess; larger values are coerced to `guess_min`.
    pub guess_max: u16,
}

impl GameConfig {
    // ===== protocol constants =====
    /// 0.001 native units (18 decimals).
    pub const ENTRY_FEE: Amount = 1_000_000_000_000_000;
    pub const GUESS_MIN: u16 = 1;
    pub const GUESS_MAX: u16 = 100;
    /// Shortest duration a caller may request through an override.
    pub const MIN_ROUND_DURATION: u64 = 60;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_ROUND_DURATION: u64 = 300;
    pub const DEFAULT_REVEAL_TIMEOUT: u64 = 3_600;

    pub fn new() -> Self {
        Self {
            entry_fee: Self::ENTRY_FEE,
            round_duration: Self::DEFAULT_ROUND_DURATION,
            reveal_timeout: Self::DEFAULT_REVEAL_TIMEOUT,
            guess_min: Self::GUESS_MIN,
            guess_max: Self::GUESS_MAX,
        }
    }

    pub fn with_round_duration(mut self, round_duration: u64) -> Self {
        self.round_duration = round_duration;
        self
    }

    pub fn with_reveal_timeout(mut self, reveal_timeout: u64) -> Self {
        self.reveal_timeout = reveal_timeout;
        self
    }

    /// Resolves the duration of a new round from an optional caller override.
    ///
    /// `None` and `Some(0)` both select the configured default.
    pub fn resolve_duration(&self, duration_override: Option<u64>) -> Option<u64> {
        match duration_override {
            None | Some(0) => Some(self.round_duration),
            Some(requested) if requested >= Self::MIN_ROUND_DURATION => Some(requested),
            Some(_) => None,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
