//! Domain-separated SHA-256 digests signed or embedded by the coprocessor.

use game_core::{Address, Handle, RequestId, WidthTag};
use sha2::{Digest, Sha256};

const HANDLE_DOMAIN: &[u8] = b"guess-fhe/handle/v0";
const INPUT_PROOF_DOMAIN: &[u8] = b"guess-fhe/input-proof/v0";
const DECRYPTION_DOMAIN: &[u8] = b"guess-fhe/public-decryption/v0";

/// Digest a fresh handle is derived from. Unique per sealed ciphertext.
pub(crate) fn handle_digest(nonce: &[u8; 12], ciphertext: &[u8], width: WidthTag) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(HANDLE_DOMAIN);
    hasher.update(nonce);
    hasher.update([width as u8]);
    hasher.update(ciphertext);
    hasher.finalize().into()
}

/// Message an input proof signs.
pub(crate) fn input_proof_digest(
    contract: &Address,
    submitter: &Address,
    handles: &[Handle],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(INPUT_PROOF_DOMAIN);
    hasher.update(contract.as_bytes());
    hasher.update(submitter.as_bytes());
    for handle in handles {
        hasher.update(handle.as_bytes());
    }
    hasher.finalize().into()
}

/// Message a public decryption response signs.
pub(crate) fn decryption_digest(
    request_id: RequestId,
    handles: &[Handle],
    cleartexts: &[u64],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DECRYPTION_DOMAIN);
    hasher.update(request_id.0.to_be_bytes());
    hasher.update((handles.len() as u64).to_be_bytes());
    for handle in handles {
        hasher.update(handle.as_bytes());
    }
    hasher.update((cleartexts.len() as u64).to_be_bytes());
    for value in cleartexts {
        hasher.update(value.to_be_bytes());
    }
    hasher.finalize().into()
}
