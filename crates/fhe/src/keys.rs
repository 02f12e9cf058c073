use core::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

/// Key material held by the coprocessor.
///
/// * `network_key` seals ciphertexts at rest.
/// * `input_signer` issues input proofs to the encryption client.
/// * `kms_signer` signs public decryption responses.
#[derive(Clone)]
pub struct CoprocessorKeys {
    pub(crate) network_key: [u8; 32],
    pub(crate) input_signer: SigningKey,
    pub(crate) kms_signer: SigningKey,
}

impl CoprocessorKeys {
    /// Derives every key from one seed. Deterministic, for tests and demos.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            network_key: derive(b"network", &seed),
            input_signer: SigningKey::from_bytes(&derive(b"input-signer", &seed)),
            kms_signer: SigningKey::from_bytes(&derive(b"kms-signer", &seed)),
        }
    }

    /// Fresh keys from the OS random source.
    pub fn generate() -> Self {
        Self::from_seed(rand::random())
    }

    pub fn input_verifying_key(&self) -> VerifyingKey {
        self.input_signer.verifying_key()
    }

    pub fn kms_verifying_key(&self) -> VerifyingKey {
        self.kms_signer.verifying_key()
    }
}

impl fmt::Debug for CoprocessorKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoprocessorKeys")
            .field("input", &hex::encode(self.input_verifying_key().as_bytes()))
            .field("kms", &hex::encode(self.kms_verifying_key().as_bytes()))
            .finish_non_exhaustive()
    }
}

fn derive(label: &[u8], seed: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"guess-fhe/key/");
    hasher.update(label);
    hasher.update(seed);
    hasher.finalize().into()
}
