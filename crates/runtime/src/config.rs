//! Runtime configuration and environment loading.
use std::env;
use std::path::PathBuf;

use game_core::{Address, GameConfig};

/// Configuration shared by the runtime orchestrator and its worker.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub game: GameConfig,
    /// Address the game acts as towards the FHE backend. Input proofs must be
    /// issued for it.
    pub contract: Address,
    pub command_buffer_size: usize,
    /// Capacity of each event topic.
    pub event_buffer_size: usize,
    /// Directory for file-backed snapshots; `None` disables persistence
    /// unless a repository is injected directly.
    pub state_dir: Option<PathBuf>,
    /// Number of most recent snapshots kept after each save; `0` keeps all.
    pub snapshot_retention: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_CONTRACT: Address = Address::from_low_u8(0x47);
    pub const DEFAULT_COMMAND_BUFFER: usize = 32;
    pub const DEFAULT_EVENT_BUFFER: usize = 100;
    pub const DEFAULT_SNAPSHOT_RETENTION: usize = 16;

    /// Construct configuration from process environment variables.
    ///
    /// - `GUESS_ROUND_DURATION` - default round length in seconds
    /// - `GUESS_REVEAL_TIMEOUT` - seconds before a pending reveal may be cancelled
    /// - `GUESS_CONTRACT_ADDRESS` - 20-byte hex address, `0x` prefix optional
    /// - `GUESS_COMMAND_BUFFER` / `GUESS_EVENT_BUFFER` - channel capacities
    /// - `GUESS_STATE_DIR` - enables file snapshots in this directory
    /// - `GUESS_SNAPSHOT_RETENTION` - snapshots kept per save, `0` keeps all
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(duration) = read_env::<u64>("GUESS_ROUND_DURATION") {
            config.game.round_duration = duration.max(GameConfig::MIN_ROUND_DURATION);
        }

        if let Some(timeout) = read_env::<u64>("GUESS_REVEAL_TIMEOUT") {
            config.game.reveal_timeout = timeout;
        }

        if let Ok(raw) = env::var("GUESS_CONTRACT_ADDRESS") {
            match parse_address(&raw) {
                Some(address) => config.contract = address,
                None => tracing::warn!(value = %raw, "ignoring invalid GUESS_CONTRACT_ADDRESS"),
            }
        }

        if let Some(capacity) = read_env::<usize>("GUESS_COMMAND_BUFFER") {
            config.command_buffer_size = capacity.max(1);
        }

        if let Some(capacity) = read_env::<usize>("GUESS_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }

        config.state_dir = env::var("GUESS_STATE_DIR").ok().map(PathBuf::from);

        if let Some(retention) = read_env::<usize>("GUESS_SNAPSHOT_RETENTION") {
            config.snapshot_retention = retention;
        }

        config
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            contract: Self::DEFAULT_CONTRACT,
            command_buffer_size: Self::DEFAULT_COMMAND_BUFFER,
            event_buffer_size: Self::DEFAULT_EVENT_BUFFER,
            state_dir: None,
            snapshot_retention: Self::DEFAULT_SNAPSHOT_RETENTION,
        }
    }
}

/// Parses a 20-byte hex address.
pub fn parse_address(raw: &str) -> Option<Address> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes: [u8; 20] = hex::decode(digits).ok()?.try_into().ok()?;
    Some(Address::new(bytes))
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_addresses_with_and_without_prefix() {
        let expected = Address::from_low_u8(0xAB);
        let digits = format!("{}ab", "00".repeat(19));

        assert_eq!(parse_address(&digits), Some(expected));
        assert_eq!(parse_address(&format!("0x{digits}")), Some(expected));
        assert_eq!(parse_address(&expected.to_string()), Some(expected));
    }

    #[test]
    fn rejects_wrong_length_or_non_hex() {
        assert_eq!(parse_address("0x1234"), None);
        assert_eq!(parse_address(&"zz".repeat(20)), None);
    }

    #[test]
    fn defaults_match_game_constants() {
        let config = RuntimeConfig::default();
        assert_eq!(config.game.round_duration, GameConfig::DEFAULT_ROUND_DURATION);
        assert_eq!(config.game.reveal_timeout, GameConfig::DEFAULT_REVEAL_TIMEOUT);
        assert_eq!(config.game.entry_fee, GameConfig::ENTRY_FEE);
        assert!(config.state_dir.is_none());
        assert_eq!(config.snapshot_retention, RuntimeConfig::DEFAULT_SNAPSHOT_RETENTION);
    }
}
