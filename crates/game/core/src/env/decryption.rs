use crate::codec::Handle;
use crate::state::RequestId;

/// Oracle reply carrying the plaintexts of a public decryption request.
///
/// `cleartexts[i]` is the plaintext of the i-th handle in the request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecryptionResponse {
    pub request_id: RequestId,
    pub cleartexts: Vec<u64>,
    pub signature: Vec<u8>,
}

/// Authenticates oracle responses before the engine trusts their plaintexts.
pub trait DecryptionVerifier {
    /// Returns true if `signature` attests that `handles` decrypt to
    /// `cleartexts` under `request_id`.
    fn verify_decryption(
        &self,
        request_id: RequestId,
        handles: &[Handle],
        cleartexts: &[u64],
        signature: &[u8],
    ) -> bool;
}
