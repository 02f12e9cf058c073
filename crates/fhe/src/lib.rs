//! Simulated FHE backend for the guessing game.
//!
//! [`Coprocessor`] plays the roles a real FHE deployment splits across
//! services: the ciphertext store and evaluator, the input verifier that
//! issues proofs to the encryption client, the decrypt client that honours
//! per-ciphertext grants, and the KMS that signs public decryptions.
//! Ciphertexts are sealed with ChaCha20-Poly1305 under a network key; proofs
//! and decryption responses are ed25519 signatures.
//!
//! The engine reaches the coprocessor through [`ContractContext`], which
//! implements the `game-core` capability traits for one contract address.
mod context;
mod coprocessor;
mod digest;
mod input;
mod keys;

pub use context::ContractContext;
pub use coprocessor::Coprocessor;
pub use input::{EncryptedInput, InputBundle};
pub use keys::CoprocessorKeys;

#[cfg(test)]
mod tests {
    use game_core::{
        Address, CreateRound, FheEnv, GameConfig, GameEngine, GameState, Hint, RequestId,
        SubmitGuess, Timestamp,
    };

    use super::*;

    const CONTRACT: Address = Address::from_low_u8(0xC7);
    const HOST: Address = Address::from_low_u8(0x01);
    const ALICE: Address = Address::from_low_u8(0xA1);
    const BOB: Address = Address::from_low_u8(0xB0);

    #[test]
    fn engine_round_trip_on_sealed_backend() {
        let coprocessor = Coprocessor::from_seed([11; 32]);
        let ctx = coprocessor.context(CONTRACT);
        let env = FheEnv::from_backend(&ctx, CONTRACT);
        let config = GameConfig::default();
        let mut state = GameState::new();
        let mut engine = GameEngine::new(&mut state, &config);

        let secret = coprocessor.encrypt_input(CONTRACT, HOST).add16(60).encrypt().unwrap();
        let round_id = engine
            .create_round(
                env,
                CreateRound {
                    creator: HOST,
                    secret: secret.input(0).unwrap(),
                    fee: config.entry_fee,
                    duration_override: None,
                },
                Timestamp(0),
            )
            .unwrap();

        let mut receipts = Vec::new();
        for (player, value) in [(ALICE, 80u16), (BOB, 60)] {
            let bundle = coprocessor.encrypt_input(CONTRACT, player).add16(value).encrypt().unwrap();
            let receipt = engine
                .submit_guess(
                    env,
                    SubmitGuess {
                        player,
                        round_id,
                        guess: bundle.input(0).unwrap(),
                        fee: config.entry_fee,
                    },
                    Timestamp(5),
                )
                .unwrap();
            receipts.push(receipt);
        }

        let hint = |index: usize| {
            let receipt = &receipts[index];
            coprocessor
                .user_decrypt(&receipt.encrypted_hint, &receipt.player)
                .ok()
                .and_then(Hint::from_code)
        };
        assert_eq!(receipts[0].encrypted_hint.width(), Some(game_core::WidthTag::U16));
        assert_eq!(hint(0), Some(Hint::TooHigh));
        assert_eq!(hint(1), Some(Hint::Exact));
        assert!(
            coprocessor
                .user_decrypt(&receipts[0].encrypted_hint, &BOB)
                .is_err()
        );

        let pot = engine.state().round_info(round_id).unwrap().pot;
        assert_eq!(coprocessor.user_decrypt(&pot, &HOST), Ok(3 * config.entry_fee));

        engine
            .end_round(round_id, Timestamp(config.round_duration))
            .unwrap();
        let plan = engine.prepare_reveal(env, round_id).unwrap();
        let handles = plan.handles.clone();
        engine
            .commit_reveal(plan, RequestId(1), Timestamp(config.round_duration))
            .unwrap();

        let response = coprocessor.public_decrypt(RequestId(1), &handles).unwrap();
        let outcome = engine.fulfill_reveal(env, &response).unwrap();

        assert_eq!(outcome.secret, 60);
        assert_eq!(outcome.winner, Some(BOB));
        assert!(engine.state().has_player_won(round_id, &BOB));
        // Alice's guess was never made public.
        assert!(
            coprocessor
                .public_decrypt(RequestId(2), &[receipts[0].encrypted_guess])
                .is_err()
        );
    }

    #[test]
    fn registry_keeps_every_sealed_ciphertext() {
        let coprocessor = Coprocessor::from_seed([12; 32]);
        let ctx = coprocessor.context(CONTRACT);
        let env = FheEnv::from_backend(&ctx, CONTRACT);
        let config = GameConfig::default();
        let mut state = GameState::new();
        let mut engine = GameEngine::new(&mut state, &config);

        let secret = coprocessor.encrypt_input(CONTRACT, HOST).add16(7).encrypt().unwrap();
        let round_id = engine
            .create_round(
                env,
                CreateRound {
                    creator: HOST,
                    secret: secret.input(0).unwrap(),
                    fee: config.entry_fee,
                    duration_override: None,
                },
                Timestamp(0),
            )
            .unwrap();

        // Bound to Alice, submitted by Bob: rejected before any evaluation.
        let stolen = coprocessor.encrypt_input(CONTRACT, ALICE).add16(7).encrypt().unwrap();
        let before_rejected = coprocessor.ciphertext_count().unwrap();
        let rejected = engine.submit_guess(
            env,
            SubmitGuess {
                player: BOB,
                round_id,
                guess: stolen.input(0).unwrap(),
                fee: config.entry_fee,
            },
            Timestamp(1),
        );
        assert!(rejected.is_err());
        assert_eq!(coprocessor.ciphertext_count().unwrap(), before_rejected);

        let bundle = coprocessor.encrypt_input(CONTRACT, ALICE).add16(7).encrypt().unwrap();
        let before_guess = coprocessor.ciphertext_count().unwrap();
        engine
            .submit_guess(
                env,
                SubmitGuess {
                    player: ALICE,
                    round_id,
                    guess: bundle.input(0).unwrap(),
                    fee: config.entry_fee,
                },
                Timestamp(1),
            )
            .unwrap();
        let after_guess = coprocessor.ciphertext_count().unwrap();
        // Intermediates such as the clamp bounds stay registered too.
        assert!(after_guess > before_guess + 3);

        engine
            .end_round(round_id, Timestamp(config.round_duration))
            .unwrap();
        let plan = engine.prepare_reveal(env, round_id).unwrap();
        let handles = plan.handles.clone();
        engine
            .commit_reveal(plan, RequestId(1), Timestamp(config.round_duration))
            .unwrap();
        let response = coprocessor.public_decrypt(RequestId(1), &handles).unwrap();
        engine.fulfill_reveal(env, &response).unwrap();

        assert!(coprocessor.ciphertext_count().unwrap() >= after_guess);
        for handle in engine.state().handles() {
            assert_eq!(coprocessor.is_registered(&handle), Ok(true));
        }
    }
}
