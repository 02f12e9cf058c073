//! Guess processing: sanitize, compare, accumulate.

use super::round::clamp_into_range;
use super::{GameEngine, GuessError, GuessReceipt, SubmitGuess};
use crate::codec::{self, EncryptedValue, WidthTag};
use crate::env::{FheEnv, FheError};
use crate::state::{Hint, PlayerState, Timestamp};

impl GameEngine<'_> {
    /// Accepts one encrypted guess per player while the round is open.
    ///
    /// The guess is clamped into range, compared against the secret, and the
    /// fee is folded into the encrypted pot. The player may decrypt their
    /// sanitized guess and hint; the match flag is kept for the reveal.
    pub fn submit_guess(
        &mut self,
        env: FheEnv<'_>,
        command: SubmitGuess,
        now: Timestamp,
    ) -> Result<GuessReceipt, GuessError> {
        let round_id = command.round_id;
        let round = self
            .state
            .round(round_id)
            .filter(|round| round.accepts_guesses(now))
            .ok_or(GuessError::RoundNotActive(round_id))?;

        if command.fee != self.config.entry_fee {
            return Err(GuessError::IncorrectFee {
                expected: self.config.entry_fee,
                paid: command.fee,
            });
        }
        if round.players.contains_key(&command.player) {
            return Err(GuessError::PlayerAlreadyParticipated {
                round_id,
                player: command.player,
            });
        }

        let contract = env.contract();
        let raw_guess = codec::ingest(
            env.inputs(),
            &command.guess,
            WidthTag::U16,
            &contract,
            &command.player,
        )?;
        let guess = clamp_into_range(env, self.config, &raw_guess)?;

        let is_match = env.comparator().equals(&guess, &round.secret)?;
        let hint = encrypted_hint(env, &guess, &round.secret, &is_match)?;

        let fee = env.evaluator().trivial(command.fee, WidthTag::U64)?;
        let pot = env.evaluator().add(&round.pot, &fee)?;

        let acl = env.acl();
        acl.allow(&guess, &contract)?;
        acl.allow(&guess, &command.player)?;
        acl.allow(&hint, &contract)?;
        acl.allow(&hint, &command.player)?;
        acl.allow(&is_match, &contract)?;
        acl.allow(&pot, &contract)?;
        acl.allow(&pot, &round.creator)?;

        let round = self
            .state
            .round_mut(round_id)
            .ok_or(GuessError::RoundNotActive(round_id))?;

        round.pot = pot;
        round.total_guesses += 1;
        round.participants.push(command.player);
        round.players.insert(
            command.player,
            PlayerState {
                has_submitted: true,
                guess_time: now,
                encrypted_guess: guess,
                encrypted_hint: hint,
                encrypted_match: is_match,
            },
        );

        let receipt = GuessReceipt {
            round_id,
            player: command.player,
            guess_time: now,
            total_guesses: round.total_guesses,
            encrypted_guess: guess.handle(),
            encrypted_hint: hint.handle(),
        };
        self.commit();

        Ok(receipt)
    }
}

/// `guess == secret ? Exact : (guess > secret ? TooHigh : TooLow)`, encrypted.
fn encrypted_hint(
    env: FheEnv<'_>,
    guess: &EncryptedValue,
    secret: &EncryptedValue,
    is_match: &EncryptedValue,
) -> Result<EncryptedValue, FheError> {
    let evaluator = env.evaluator();

    let is_high = env.comparator().greater_than(guess, secret)?;
    let exact = evaluator.trivial(Hint::Exact.code(), WidthTag::U16)?;
    let too_high = evaluator.trivial(Hint::TooHigh.code(), WidthTag::U16)?;
    let too_low = evaluator.trivial(Hint::TooLow.code(), WidthTag::U16)?;

    let direction = evaluator.select(&is_high, &too_high, &too_low)?;
    evaluator.select(is_match, &exact, &direction)
}
