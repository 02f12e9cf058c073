//! Round store operations: creation and ending.

use std::collections::BTreeMap;

use super::{CreateRound, GameEngine, RoundError};
use crate::codec::{self, EncryptedValue, WidthTag};
use crate::config::GameConfig;
use crate::env::{FheEnv, FheError};
use crate::state::{RevealRecord, Round, RoundId, Timestamp};

impl GameEngine<'_> {
    /// Opens a new round funded by the creator's entry fee.
    ///
    /// The pot starts as an encryption of the fee so no plaintext pool
    /// exists. The secret is clamped into the guess range the same way
    /// guesses are, so every round is winnable.
    pub fn create_round(
        &mut self,
        env: FheEnv<'_>,
        command: CreateRound,
        now: Timestamp,
    ) -> Result<RoundId, RoundError> {
        if command.fee != self.config.entry_fee {
            return Err(RoundError::IncorrectFee {
                expected: self.config.entry_fee,
                paid: command.fee,
            });
        }

        let duration = self
            .config
            .resolve_duration(command.duration_override)
            .ok_or(RoundError::InvalidDuration {
                requested: command.duration_override.unwrap_or_default(),
                minimum: GameConfig::MIN_ROUND_DURATION,
            })?;

        let contract = env.contract();
        let raw_secret = codec::ingest(
            env.inputs(),
            &command.secret,
            WidthTag::U16,
            &contract,
            &command.creator,
        )?;
        let secret = clamp_into_range(env, self.config, &raw_secret)?;
        let pot = env.evaluator().trivial(command.fee, WidthTag::U64)?;

        env.acl().allow(&secret, &contract)?;
        env.acl().allow(&pot, &contract)?;
        env.acl().allow(&pot, &command.creator)?;

        let round_id = self.state.allocate_round_id();
        self.state.rounds.insert(
            round_id,
            Round {
                id: round_id,
                creator: command.creator,
                start_time: now,
                end_time: now.saturating_add(duration),
                is_active: true,
                secret,
                pot,
                total_guesses: 0,
                participants: Vec::new(),
                players: BTreeMap::new(),
                reveal: RevealRecord::default(),
            },
        );
        self.commit();

        Ok(round_id)
    }

    /// Closes a round once its end time has passed.
    ///
    /// Fails closed on a second call instead of succeeding silently.
    pub fn end_round(&mut self, round_id: RoundId, now: Timestamp) -> Result<(), RoundError> {
        let round = self
            .state
            .round_mut(round_id)
            .ok_or(RoundError::RoundNotFound(round_id))?;

        if !round.is_active {
            return Err(RoundError::RoundAlreadyEnded(round_id));
        }
        if now < round.end_time {
            return Err(RoundError::RoundStillActive(round_id));
        }

        round.is_active = false;
        self.commit();

        Ok(())
    }
}

/// Coerces an encrypted 16-bit value into `[guess_min, guess_max]` without
/// decrypting it. Out-of-range values become `guess_min`.
pub(super) fn clamp_into_range(
    env: FheEnv<'_>,
    config: &GameConfig,
    raw: &EncryptedValue,
) -> Result<EncryptedValue, FheError> {
    let evaluator = env.evaluator();
    let comparator = env.comparator();

    let min = evaluator.trivial(u64::from(config.guess_min), WidthTag::U16)?;
    let max = evaluator.trivial(u64::from(config.guess_max), WidthTag::U16)?;

    let above_min = comparator.greater_or_equal(raw, &min)?;
    let below_max = comparator.less_or_equal(raw, &max)?;
    let in_range = evaluator.and(&above_min, &below_max)?;

    evaluator.select(&in_range, raw, &min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecuteError;
    use crate::state::{Address, GameState};
    use crate::testing::{CONTRACT, ClearBackend};

    const CREATOR: Address = Address::from_low_u8(0xA1);

    fn create(
        backend: &ClearBackend,
        state: &mut GameState,
        config: &GameConfig,
        secret: u64,
        fee: u64,
        now: u64,
    ) -> Result<RoundId, RoundError> {
        let env = FheEnv::from_backend(backend, CONTRACT);
        let command = CreateRound {
            creator: CREATOR,
            secret: backend.encrypt_input(secret, WidthTag::U16, CREATOR),
            fee,
            duration_override: None,
        };
        GameEngine::new(state, config).create_round(env, command, Timestamp(now))
    }

    #[test]
    fn creates_active_round_with_encrypted_pot() {
        let backend = ClearBackend::new();
        let config = GameConfig::default();
        let mut state = GameState::new();

        let round_id = create(&backend, &mut state, &config, 64, config.entry_fee, 1_000).unwrap();

        assert_eq!(round_id, RoundId::FIRST);
        assert_eq!(state.current_round_id(), RoundId::FIRST);

        let info = state.round_info(round_id).unwrap();
        assert!(info.is_active);
        assert_eq!(info.total_guesses, 0);
        assert_eq!(info.start_time, Timestamp(1_000));
        assert_eq!(
            info.end_time,
            Timestamp(1_000 + GameConfig::DEFAULT_ROUND_DURATION)
        );
        assert_eq!(backend.user_decrypt(info.pot, &CREATOR), Some(config.entry_fee));
        assert_eq!(state.nonce, 1);
    }

    #[test]
    fn round_ids_are_sequential() {
        let backend = ClearBackend::new();
        let config = GameConfig::default();
        let mut state = GameState::new();

        for expected in 1..=3 {
            let id = create(&backend, &mut state, &config, 10, config.entry_fee, 0).unwrap();
            assert_eq!(id, RoundId(expected));
        }
    }

    #[test]
    fn rejects_incorrect_fee_without_state_change() {
        let backend = ClearBackend::new();
        let config = GameConfig::default();
        let mut state = GameState::new();

        let err = create(&backend, &mut state, &config, 10, config.entry_fee + 1, 0).unwrap_err();

        assert!(matches!(err, RoundError::IncorrectFee { .. }));
        assert_eq!(state.current_round_id(), RoundId::NONE);
        assert!(state.rounds.is_empty());
        assert_eq!(state.nonce, 0);
    }

    #[test]
    fn rejects_forged_secret_proof() {
        let backend = ClearBackend::new();
        let config = GameConfig::default();
        let mut state = GameState::new();
        let env = FheEnv::from_backend(&backend, CONTRACT);

        // Proof issued to a different submitter.
        let secret = backend.encrypt_input(50, WidthTag::U16, Address::from_low_u8(0xEE));
        let command = CreateRound {
            creator: CREATOR,
            secret,
            fee: config.entry_fee,
            duration_override: None,
        };
        let err = GameEngine::new(&mut state, &config)
            .create_round(env, command, Timestamp(0))
            .unwrap_err();

        assert_eq!(err.to_string(), "input proof verification failed");
        assert!(state.rounds.is_empty());
    }

    #[test]
    fn honours_duration_override() {
        let backend = ClearBackend::new();
        let config = GameConfig::default();
        let mut state = GameState::new();
        let env = FheEnv::from_backend(&backend, CONTRACT);

        let command = CreateRound {
            creator: CREATOR,
            secret: backend.encrypt_input(5, WidthTag::U16, CREATOR),
            fee: config.entry_fee,
            duration_override: Some(900),
        };
        let id = GameEngine::new(&mut state, &config)
            .create_round(env, command.clone(), Timestamp(100))
            .unwrap();
        assert_eq!(state.round_info(id).unwrap().end_time, Timestamp(1_000));

        let too_short = CreateRound {
            duration_override: Some(GameConfig::MIN_ROUND_DURATION - 1),
            ..command
        };
        let err = GameEngine::new(&mut state, &config)
            .create_round(env, too_short, Timestamp(100))
            .unwrap_err();
        assert!(matches!(err, RoundError::InvalidDuration { .. }));
    }

    #[test]
    fn out_of_range_secret_is_clamped() {
        let backend = ClearBackend::new();
        let config = GameConfig::default();
        let mut state = GameState::new();

        let id = create(&backend, &mut state, &config, 4_000, config.entry_fee, 0).unwrap();
        let secret = state.round(id).unwrap().secret.handle();

        assert_eq!(backend.peek(secret), u64::from(config.guess_min));
    }

    #[test]
    fn end_round_requires_end_time_and_fails_twice() {
        let backend = ClearBackend::new();
        let config = GameConfig::default();
        let mut state = GameState::new();
        let id = create(&backend, &mut state, &config, 42, config.entry_fee, 0).unwrap();
        let end = state.round_info(id).unwrap().end_time.as_secs();

        let mut engine = GameEngine::new(&mut state, &config);
        assert_eq!(
            engine.end_round(id, Timestamp(end - 1)),
            Err(RoundError::RoundStillActive(id))
        );
        engine.end_round(id, Timestamp(end)).unwrap();
        for later in [end, end + 1, end + 10_000] {
            assert_eq!(
                engine.end_round(id, Timestamp(later)),
                Err(RoundError::RoundAlreadyEnded(id))
            );
        }

        assert!(!state.round_info(id).unwrap().is_active);
    }

    #[test]
    fn end_unknown_round_is_not_found() {
        let config = GameConfig::default();
        let mut state = GameState::new();
        let err = GameEngine::new(&mut state, &config)
            .end_round(RoundId(9), Timestamp(0))
            .unwrap_err();

        assert_eq!(err, RoundError::RoundNotFound(RoundId(9)));
        let unified: ExecuteError = err.into();
        assert_eq!(
            crate::error::GameError::error_code(&unified),
            "RoundNotFound"
        );
    }
}
