//! Reveal coordination.
//!
//! A reveal is split in two so the engine never waits on the oracle:
//! [`GameEngine::prepare_reveal`] validates the round and marks the handles
//! for public decryption, the caller submits them to the oracle, and
//! [`GameEngine::commit_reveal`] records the request under the id the oracle
//! assigned. The response later arrives through
//! [`GameEngine::fulfill_reveal`].

use super::{GameEngine, RevealError, RevealOutcome, RevealPlan};
use crate::env::{DecryptionResponse, FheEnv};
use crate::state::{RequestId, RevealPhase, RevealRequest, Round, RoundId, Timestamp};

impl GameEngine<'_> {
    /// Validates that `round_id` may be revealed and returns the handles to
    /// decrypt: the secret followed by each participant's match flag.
    ///
    /// The public marks are not undone if the plan is never committed. The
    /// round has already ended, and preparing it again re-marks the same
    /// handles.
    pub fn prepare_reveal(
        &self,
        env: FheEnv<'_>,
        round_id: RoundId,
    ) -> Result<RevealPlan, RevealError> {
        let round = self
            .state
            .round(round_id)
            .ok_or(RevealError::RoundNotFound(round_id))?;
        ensure_revealable(round)?;

        let mut values = Vec::with_capacity(round.participants.len() + 1);
        values.push(round.secret);
        for player in &round.participants {
            if let Some(state) = round.players.get(player) {
                values.push(state.encrypted_match);
            }
        }

        for value in &values {
            env.acl().allow_public_decryption(value)?;
        }

        Ok(RevealPlan {
            round_id,
            handles: values.iter().map(|value| value.handle()).collect(),
        })
    }

    /// Records the oracle request created from `plan`.
    ///
    /// Re-validates the round, since another operation may have run between
    /// preparing and committing.
    pub fn commit_reveal(
        &mut self,
        plan: RevealPlan,
        request_id: RequestId,
        now: Timestamp,
    ) -> Result<(), RevealError> {
        let round_id = plan.round_id;
        let round = self
            .state
            .round_mut(round_id)
            .ok_or(RevealError::RoundNotFound(round_id))?;
        ensure_revealable(round)?;

        round.reveal.current = Some(RevealRequest {
            request_id,
            round_id,
            requested_at: now,
            status: RevealPhase::Pending,
            handles: plan.handles,
        });
        self.state.pending_requests.insert(request_id, round_id);
        self.commit();

        Ok(())
    }

    /// Applies an oracle response to the pending request it answers.
    ///
    /// The winner is the earliest participant whose match flag decrypted to
    /// true; with no match the round has no winner.
    pub fn fulfill_reveal(
        &mut self,
        env: FheEnv<'_>,
        response: &DecryptionResponse,
    ) -> Result<RevealOutcome, RevealError> {
        let request_id = response.request_id;
        let round_id = self
            .state
            .round_for_request(request_id)
            .ok_or(RevealError::UnknownRequest(request_id))?;
        let round = self
            .state
            .round(round_id)
            .ok_or(RevealError::UnknownRequest(request_id))?;
        let request = round
            .reveal
            .pending()
            .filter(|request| request.request_id == request_id)
            .ok_or(RevealError::UnknownRequest(request_id))?;

        if !env.decryption().verify_decryption(
            request_id,
            &request.handles,
            &response.cleartexts,
            &response.signature,
        ) {
            return Err(RevealError::InvalidDecryptionProof(request_id));
        }
        if response.cleartexts.len() != request.handles.len() {
            return Err(RevealError::MalformedDecryption {
                expected: request.handles.len(),
                received: response.cleartexts.len(),
            });
        }

        let (secret, matches) = response
            .cleartexts
            .split_first()
            .ok_or(RevealError::MalformedDecryption {
                expected: request.handles.len(),
                received: 0,
            })?;
        let secret = u16::try_from(*secret).map_err(|_| RevealError::MalformedDecryption {
            expected: request.handles.len(),
            received: response.cleartexts.len(),
        })?;
        let winner = round
            .participants
            .iter()
            .zip(matches)
            .find(|(_, flag)| **flag != 0)
            .map(|(player, _)| *player);

        let round = self
            .state
            .round_mut(round_id)
            .ok_or(RevealError::UnknownRequest(request_id))?;
        if let Some(request) = round.reveal.current.as_mut() {
            request.status = RevealPhase::Fulfilled;
        }
        round.reveal.revealed_secret = Some(secret);
        round.reveal.winner = winner;
        self.state.pending_requests.remove(&request_id);
        self.commit();

        Ok(RevealOutcome {
            round_id,
            request_id,
            secret,
            winner,
        })
    }

    /// Abandons a request the oracle has not answered within the reveal timeout.
    ///
    /// Returns the cancelled request id. A new reveal may be requested after.
    pub fn cancel_reveal(
        &mut self,
        round_id: RoundId,
        now: Timestamp,
    ) -> Result<RequestId, RevealError> {
        let timeout = self.config.reveal_timeout;
        let round = self
            .state
            .round_mut(round_id)
            .ok_or(RevealError::RoundNotFound(round_id))?;

        let stale_at = round
            .reveal
            .pending()
            .map(|request| request.stale_at(timeout))
            .ok_or(RevealError::RevealNotPending(round_id))?;
        if now < stale_at {
            return Err(RevealError::RevealNotStale { round_id, stale_at });
        }

        let mut request = round
            .reveal
            .current
            .take()
            .ok_or(RevealError::RevealNotPending(round_id))?;
        request.status = RevealPhase::Cancelled;
        let request_id = request.request_id;
        round.reveal.cancelled.push(request);

        self.state.pending_requests.remove(&request_id);
        self.commit();

        Ok(request_id)
    }
}

fn ensure_revealable(round: &Round) -> Result<(), RevealError> {
    if round.is_active {
        return Err(RevealError::RoundStillActive(round.id));
    }
    if round.reveal.is_revealed() {
        return Err(RevealError::RoundAlreadyRevealed(round.id));
    }
    if round.reveal.pending().is_some() {
        return Err(RevealError::RevealAlreadyPending(round.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::WidthTag;
    use crate::config::GameConfig;
    use crate::engine::{CreateRound, SubmitGuess};
    use crate::state::{Address, GameState};
    use crate::testing::{CONTRACT, ClearBackend};

    const CREATOR: Address = Address::from_low_u8(0xC0);

    struct Fixture {
        backend: ClearBackend,
        config: GameConfig,
        state: GameState,
        round_id: RoundId,
        end: Timestamp,
    }

    impl Fixture {
        /// Round with `secret`, one guess per entry, then ended.
        fn ended(secret: u64, guesses: &[(u8, u64)]) -> Self {
            let backend = ClearBackend::new();
            let config = GameConfig::default();
            let mut state = GameState::new();
            let env = FheEnv::from_backend(&backend, CONTRACT);

            let mut engine = GameEngine::new(&mut state, &config);
            let round_id = engine
                .create_round(
                    env,
                    CreateRound {
                        creator: CREATOR,
                        secret: backend.encrypt_input(secret, WidthTag::U16, CREATOR),
                        fee: config.entry_fee,
                        duration_override: None,
                    },
                    Timestamp(0),
                )
                .unwrap();
            for (offset, (tag, value)) in guesses.iter().enumerate() {
                let player = Address::from_low_u8(*tag);
                engine
                    .submit_guess(
                        env,
                        SubmitGuess {
                            player,
                            round_id,
                            guess: backend.encrypt_input(*value, WidthTag::U16, player),
                            fee: config.entry_fee,
                        },
                        Timestamp(1 + offset as u64),
                    )
                    .unwrap();
            }
            let end = Timestamp(GameConfig::DEFAULT_ROUND_DURATION);
            engine.end_round(round_id, end).unwrap();

            Self {
                backend,
                config,
                state,
                round_id,
                end,
            }
        }

        fn request(&mut self, request_id: u64, now: Timestamp) -> Result<RevealPlan, RevealError> {
            let env = FheEnv::from_backend(&self.backend, CONTRACT);
            let mut engine = GameEngine::new(&mut self.state, &self.config);
            let plan = engine.prepare_reveal(env, self.round_id)?;
            engine.commit_reveal(plan.clone(), RequestId(request_id), now)?;
            Ok(plan)
        }

        fn fulfill(
            &mut self,
            response: &DecryptionResponse,
        ) -> Result<RevealOutcome, RevealError> {
            let env = FheEnv::from_backend(&self.backend, CONTRACT);
            GameEngine::new(&mut self.state, &self.config).fulfill_reveal(env, response)
        }

        fn cancel(&mut self, now: Timestamp) -> Result<RequestId, RevealError> {
            GameEngine::new(&mut self.state, &self.config).cancel_reveal(self.round_id, now)
        }
    }

    #[test]
    fn reveal_requires_ended_round() {
        let backend = ClearBackend::new();
        let config = GameConfig::default();
        let mut state = GameState::new();
        let env = FheEnv::from_backend(&backend, CONTRACT);
        let mut engine = GameEngine::new(&mut state, &config);

        assert_eq!(
            engine.prepare_reveal(env, RoundId(1)),
            Err(RevealError::RoundNotFound(RoundId(1)))
        );

        let round_id = engine
            .create_round(
                env,
                CreateRound {
                    creator: CREATOR,
                    secret: backend.encrypt_input(9, WidthTag::U16, CREATOR),
                    fee: config.entry_fee,
                    duration_override: None,
                },
                Timestamp(0),
            )
            .unwrap();
        assert_eq!(
            engine.prepare_reveal(env, round_id),
            Err(RevealError::RoundStillActive(round_id))
        );
    }

    #[test]
    fn plan_lists_secret_then_match_flags_in_submission_order() {
        let mut fx = Fixture::ended(42, &[(0x0B, 10), (0x0A, 42)]);
        let plan = fx.request(7, fx.end).unwrap();

        let round = fx.state.round(fx.round_id).unwrap();
        let expected = vec![
            round.secret.handle(),
            round.players[&Address::from_low_u8(0x0B)].encrypted_match.handle(),
            round.players[&Address::from_low_u8(0x0A)].encrypted_match.handle(),
        ];
        assert_eq!(plan.handles, expected);
        assert!(expected.iter().all(|handle| fx.backend.is_public(*handle)));

        // Guesses and hints stay private.
        let player = &round.players[&Address::from_low_u8(0x0A)];
        assert!(!fx.backend.is_public(player.encrypted_guess.handle()));
        assert!(!fx.backend.is_public(player.encrypted_hint.handle()));

        let status = fx.state.reveal_status(fx.round_id).unwrap();
        assert!(status.reveal_pending);
        assert!(!status.is_revealed);
        assert_eq!(status.request_id, RequestId(7));
        assert_eq!(status.revealed_secret, 0);
        assert_eq!(status.winner, Address::ZERO);
        assert_eq!(fx.state.round_for_request(RequestId(7)), Some(fx.round_id));
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let mut fx = Fixture::ended(42, &[]);
        fx.request(1, fx.end).unwrap();

        assert_eq!(
            fx.request(2, fx.end).unwrap_err(),
            RevealError::RevealAlreadyPending(fx.round_id)
        );
    }

    #[test]
    fn fulfillment_picks_earliest_matching_player() {
        let mut fx = Fixture::ended(60, &[(0x01, 80), (0x02, 60), (0x03, 60)]);
        let plan = fx.request(11, fx.end).unwrap();
        let response = fx.backend.respond(RequestId(11), &plan.handles);

        let outcome = fx.fulfill(&response).unwrap();

        let first_match = Address::from_low_u8(0x02);
        assert_eq!(outcome.secret, 60);
        assert_eq!(outcome.winner, Some(first_match));

        let status = fx.state.reveal_status(fx.round_id).unwrap();
        assert!(status.is_revealed);
        assert!(!status.reveal_pending);
        assert_eq!(status.revealed_secret, 60);
        assert_eq!(status.winner, first_match);
        assert_eq!(status.request_id, RequestId(11));

        assert!(fx.state.has_player_won(fx.round_id, &first_match));
        assert!(!fx.state.has_player_won(fx.round_id, &Address::from_low_u8(0x03)));
        assert!(!fx.state.has_player_won(fx.round_id, &Address::from_low_u8(0x01)));
        assert_eq!(fx.state.round_for_request(RequestId(11)), None);

        assert_eq!(
            fx.request(12, fx.end).unwrap_err(),
            RevealError::RoundAlreadyRevealed(fx.round_id)
        );
    }

    #[test]
    fn fulfillment_without_match_has_no_winner() {
        let mut fx = Fixture::ended(33, &[(0x01, 32), (0x02, 34)]);
        let plan = fx.request(3, fx.end).unwrap();
        let response = fx.backend.respond(RequestId(3), &plan.handles);

        let outcome = fx.fulfill(&response).unwrap();

        assert_eq!(outcome.winner, None);
        let status = fx.state.reveal_status(fx.round_id).unwrap();
        assert!(status.is_revealed);
        assert_eq!(status.revealed_secret, 33);
        assert_eq!(status.winner, Address::ZERO);
        assert!(!fx.state.has_player_won(fx.round_id, &Address::ZERO));
    }

    #[test]
    fn forged_signature_is_rejected_and_request_stays_pending() {
        let mut fx = Fixture::ended(5, &[(0x01, 5)]);
        let plan = fx.request(4, fx.end).unwrap();
        let mut response = fx.backend.respond(RequestId(4), &plan.handles);
        response.cleartexts[0] = 6;

        assert_eq!(
            fx.fulfill(&response).unwrap_err(),
            RevealError::InvalidDecryptionProof(RequestId(4))
        );
        assert!(fx.state.reveal_status(fx.round_id).unwrap().reveal_pending);
    }

    #[test]
    fn unknown_request_is_rejected() {
        let mut fx = Fixture::ended(5, &[]);
        let response = DecryptionResponse {
            request_id: RequestId(99),
            cleartexts: vec![5],
            signature: Vec::new(),
        };

        assert_eq!(
            fx.fulfill(&response).unwrap_err(),
            RevealError::UnknownRequest(RequestId(99))
        );
    }

    #[test]
    fn cancel_only_after_timeout_boundary() {
        let mut fx = Fixture::ended(5, &[(0x01, 4)]);
        let requested_at = fx.end;
        fx.request(8, requested_at).unwrap();
        let stale_at = requested_at.saturating_add(fx.config.reveal_timeout);

        assert_eq!(
            fx.cancel(Timestamp(stale_at.as_secs() - 1)).unwrap_err(),
            RevealError::RevealNotStale {
                round_id: fx.round_id,
                stale_at,
            }
        );
        assert_eq!(fx.cancel(stale_at), Ok(RequestId(8)));

        let round = fx.state.round(fx.round_id).unwrap();
        assert!(round.reveal.current.is_none());
        assert_eq!(round.reveal.cancelled.len(), 1);
        assert_eq!(round.reveal.cancelled[0].status, RevealPhase::Cancelled);

        let status = fx.state.reveal_status(fx.round_id).unwrap();
        assert!(!status.reveal_pending);
        assert_eq!(status.request_id, RequestId::NONE);

        assert_eq!(
            fx.cancel(stale_at).unwrap_err(),
            RevealError::RevealNotPending(fx.round_id)
        );
    }

    #[test]
    fn late_response_after_cancel_is_unknown_and_retry_succeeds() {
        let mut fx = Fixture::ended(70, &[(0x01, 70)]);
        let plan = fx.request(20, fx.end).unwrap();
        let late = fx.backend.respond(RequestId(20), &plan.handles);
        let stale_at = fx.end.saturating_add(fx.config.reveal_timeout);
        fx.cancel(stale_at).unwrap();

        assert_eq!(
            fx.fulfill(&late).unwrap_err(),
            RevealError::UnknownRequest(RequestId(20))
        );

        let retry = fx.request(21, stale_at).unwrap();
        let response = fx.backend.respond(RequestId(21), &retry.handles);
        let outcome = fx.fulfill(&response).unwrap();
        assert_eq!(outcome.request_id, RequestId(21));
        assert_eq!(outcome.winner, Some(Address::from_low_u8(0x01)));
    }

    #[test]
    fn signed_but_short_cleartexts_are_malformed() {
        let mut fx = Fixture::ended(70, &[(0x01, 70), (0x02, 1)]);
        let plan = fx.request(30, fx.end).unwrap();
        let short = vec![70, 1];
        let response = DecryptionResponse {
            request_id: RequestId(30),
            signature: fx.backend.sign(RequestId(30), &plan.handles, &short),
            cleartexts: short,
        };

        assert_eq!(
            fx.fulfill(&response).unwrap_err(),
            RevealError::MalformedDecryption {
                expected: 3,
                received: 2,
            }
        );
        assert!(fx.state.reveal_status(fx.round_id).unwrap().reveal_pending);
    }

    #[test]
    fn cancel_without_request_is_not_pending() {
        let mut fx = Fixture::ended(5, &[]);
        assert_eq!(
            fx.cancel(fx.end).unwrap_err(),
            RevealError::RevealNotPending(fx.round_id)
        );
        assert_eq!(
            GameEngine::new(&mut fx.state, &fx.config)
                .cancel_reveal(RoundId(50), fx.end)
                .unwrap_err(),
            RevealError::RoundNotFound(RoundId(50))
        );
    }
}
