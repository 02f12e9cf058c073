//! Sealed ciphertext registry and the operations that open it.
//!
//! Plaintexts never leave the registry except through [`Coprocessor::user_decrypt`]
//! (ACL-checked) and [`Coprocessor::public_decrypt`] (signed by the KMS key).
//! Everything else works on handles.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};
use game_core::{
    Address, CodecError, DecryptionResponse, EncryptedValue, FheError, Handle, InputProof,
    RequestId, WidthTag,
};
use tracing::{debug, warn};

use crate::context::ContractContext;
use crate::digest;
use crate::input::{self, EncryptedInput, InputBundle};
use crate::keys::CoprocessorKeys;

struct Sealed {
    width: WidthTag,
    nonce: [u8; 12],
    bytes: Vec<u8>,
    acl: BTreeSet<Address>,
    public: bool,
}

#[derive(Default)]
pub(crate) struct Registry {
    ciphertexts: HashMap<Handle, Sealed>,
    sealed_count: u64,
}

impl Registry {
    fn get(&self, handle: &Handle) -> Result<&Sealed, FheError> {
        self.ciphertexts
            .get(handle)
            .ok_or(FheError::UnknownHandle(*handle))
    }

    fn get_mut(&mut self, handle: &Handle) -> Result<&mut Sealed, FheError> {
        self.ciphertexts
            .get_mut(handle)
            .ok_or(FheError::UnknownHandle(*handle))
    }
}

/// Simulated FHE coprocessor.
///
/// Stores every ciphertext sealed under the network key and keeps one grant
/// list per ciphertext. Shared by reference; interior state sits behind a
/// mutex.
///
/// The registry only grows. Nothing is ever evicted, and an engine call that
/// is rejected after some evaluations leaves those intermediate ciphertexts
/// registered with no owner in the game state. The registry also lives only
/// in memory, so a resumed game must keep using the coprocessor that sealed
/// its handles.
pub struct Coprocessor {
    keys: CoprocessorKeys,
    cipher: ChaCha20Poly1305,
    registry: Mutex<Registry>,
}

impl Coprocessor {
    pub fn new(keys: CoprocessorKeys) -> Self {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&keys.network_key));
        Self {
            keys,
            cipher,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::new(CoprocessorKeys::from_seed(seed))
    }

    pub fn keys(&self) -> &CoprocessorKeys {
        &self.keys
    }

    pub fn kms_verifying_key(&self) -> VerifyingKey {
        self.keys.kms_verifying_key()
    }

    /// Capability view used by the game engine for `contract`.
    pub fn context(&self, contract: Address) -> ContractContext<'_> {
        ContractContext::new(self, contract)
    }

    /// Starts a client-side encryption bound to `(contract, submitter)`.
    pub fn encrypt_input(&self, contract: Address, submitter: Address) -> EncryptedInput<'_> {
        EncryptedInput::new(self, contract, submitter)
    }

    /// Number of ciphertexts currently registered.
    pub fn ciphertext_count(&self) -> Result<usize, FheError> {
        Ok(self.registry()?.ciphertexts.len())
    }

    /// True when `handle` was sealed by this coprocessor.
    pub fn is_registered(&self, handle: &Handle) -> Result<bool, FheError> {
        Ok(self.registry()?.ciphertexts.contains_key(handle))
    }

    pub fn is_publicly_decryptable(&self, handle: &Handle) -> Result<bool, FheError> {
        Ok(self.registry()?.get(handle)?.public)
    }

    /// Decrypts `handle` for `requester`, who must hold a grant on it.
    pub fn user_decrypt(&self, handle: &Handle, requester: &Address) -> Result<u64, FheError> {
        let registry = self.registry()?;
        let sealed = registry.get(handle)?;
        if !sealed.acl.contains(requester) {
            warn!(%handle, %requester, "user decryption denied");
            return Err(FheError::AccessDenied {
                handle: *handle,
                account: *requester,
            });
        }
        self.open(sealed)
    }

    /// KMS side of the reveal oracle: decrypts handles marked public and
    /// signs `(request_id, handles, cleartexts)`.
    pub fn public_decrypt(
        &self,
        request_id: RequestId,
        handles: &[Handle],
    ) -> Result<DecryptionResponse, FheError> {
        let registry = self.registry()?;
        let cleartexts = handles
            .iter()
            .map(|handle| {
                let sealed = registry.get(handle)?;
                if !sealed.public {
                    return Err(FheError::NotPubliclyDecryptable(*handle));
                }
                self.open(sealed)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let message = digest::decryption_digest(request_id, handles, &cleartexts);
        let signature = self.keys.kms_signer.sign(&message).to_bytes().to_vec();
        debug!(%request_id, handles = handles.len(), "public decryption signed");

        Ok(DecryptionResponse {
            request_id,
            cleartexts,
            signature,
        })
    }

    /// Checks a KMS signature over a decryption result.
    pub fn verify_decryption(
        &self,
        request_id: RequestId,
        handles: &[Handle],
        cleartexts: &[u64],
        signature: &[u8],
    ) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        let message = digest::decryption_digest(request_id, handles, cleartexts);
        self.kms_verifying_key().verify(&message, &signature).is_ok()
    }

    pub(crate) fn registry(&self) -> Result<MutexGuard<'_, Registry>, FheError> {
        self.registry
            .lock()
            .map_err(|_| FheError::Backend("ciphertext registry lock poisoned".to_string()))
    }

    fn seal(&self, registry: &mut Registry, value: u64, width: WidthTag) -> Result<Handle, FheError> {
        registry.sealed_count += 1;
        let mut nonce = [0u8; 12];
        nonce[4..].copy_from_slice(&registry.sealed_count.to_be_bytes());

        let plaintext = width.truncate(value).to_le_bytes();
        let bytes = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &plaintext,
                    aad: &[width as u8],
                },
            )
            .map_err(|_| FheError::Backend("sealing failed".to_string()))?;

        let handle = Handle::from_digest(digest::handle_digest(&nonce, &bytes, width), width);
        registry.ciphertexts.insert(
            handle,
            Sealed {
                width,
                nonce,
                bytes,
                acl: BTreeSet::new(),
                public: false,
            },
        );
        Ok(handle)
    }

    fn open(&self, sealed: &Sealed) -> Result<u64, FheError> {
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&sealed.nonce),
                Payload {
                    msg: &sealed.bytes,
                    aad: &[sealed.width as u8],
                },
            )
            .map_err(|_| FheError::Backend("ciphertext failed authentication".to_string()))?;
        let bytes: [u8; 8] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| FheError::Backend("unexpected plaintext length".to_string()))?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Seals a constant with no grants.
    pub(crate) fn seal_value(&self, value: u64, width: WidthTag) -> Result<Handle, FheError> {
        let mut registry = self.registry()?;
        self.seal(&mut registry, value, width)
    }

    /// Seals a constant usable by `contract`.
    pub(crate) fn trivial(
        &self,
        contract: &Address,
        value: u64,
        width: WidthTag,
    ) -> Result<EncryptedValue, FheError> {
        let mut registry = self.registry()?;
        let handle = self.seal(&mut registry, value, width)?;
        registry.get_mut(&handle)?.acl.insert(*contract);
        wrap(handle, width)
    }

    /// Opens `operands` on behalf of `contract`, applies `op`, and seals the
    /// result at `width`. The result is granted to `contract`.
    pub(crate) fn evaluate<const N: usize>(
        &self,
        contract: &Address,
        operands: [&EncryptedValue; N],
        width: WidthTag,
        op: impl FnOnce([u64; N]) -> u64,
    ) -> Result<EncryptedValue, FheError> {
        let mut registry = self.registry()?;

        let mut plaintexts = [0u64; N];
        for (slot, operand) in plaintexts.iter_mut().zip(operands) {
            let handle = operand.handle();
            let sealed = registry.get(&handle)?;
            if sealed.width != operand.width() {
                return Err(FheError::WidthMismatch {
                    expected: operand.width(),
                    found: sealed.width,
                });
            }
            if !sealed.acl.contains(contract) {
                return Err(FheError::AccessDenied {
                    handle,
                    account: *contract,
                });
            }
            *slot = self.open(sealed)?;
        }

        let handle = self.seal(&mut registry, op(plaintexts), width)?;
        registry.get_mut(&handle)?.acl.insert(*contract);
        wrap(handle, width)
    }

    /// Adds `account` to the grant list. `caller` must already hold a grant.
    pub(crate) fn grant(
        &self,
        caller: &Address,
        value: &EncryptedValue,
        account: &Address,
    ) -> Result<(), FheError> {
        let mut registry = self.registry()?;
        let sealed = registry.get_mut(&value.handle())?;
        if !sealed.acl.contains(caller) {
            return Err(FheError::AccessDenied {
                handle: value.handle(),
                account: *caller,
            });
        }
        sealed.acl.insert(*account);
        Ok(())
    }

    pub(crate) fn mark_public(
        &self,
        caller: &Address,
        value: &EncryptedValue,
    ) -> Result<(), FheError> {
        let mut registry = self.registry()?;
        let sealed = registry.get_mut(&value.handle())?;
        if !sealed.acl.contains(caller) {
            return Err(FheError::AccessDenied {
                handle: value.handle(),
                account: *caller,
            });
        }
        sealed.public = true;
        Ok(())
    }

    /// Signs an input proof covering `handles`.
    pub(crate) fn sign_input(
        &self,
        contract: &Address,
        submitter: &Address,
        handles: Vec<Handle>,
    ) -> Result<InputBundle, FheError> {
        let message = digest::input_proof_digest(contract, submitter, &handles);
        let signature = self.keys.input_signer.sign(&message);
        let proof = input::encode_proof(&handles, &signature)
            .ok_or_else(|| FheError::Backend("too many values in one input".to_string()))?;
        Ok(InputBundle::new(handles, proof))
    }

    /// Verifies an input proof and grants the ciphertext to `contract`.
    pub(crate) fn admit_input(
        &self,
        value: &EncryptedValue,
        proof: &InputProof,
        contract: &Address,
        submitter: &Address,
    ) -> Result<(), CodecError> {
        let handle = value.handle();
        let (handles, signature) =
            input::decode_proof(proof.as_bytes()).ok_or(CodecError::InvalidProof)?;
        if !handles.contains(&handle) {
            return Err(CodecError::InvalidProof);
        }
        let message = digest::input_proof_digest(contract, submitter, &handles);
        self.keys
            .input_verifying_key()
            .verify(&message, &signature)
            .map_err(|_| CodecError::InvalidProof)?;

        let mut registry = self.registry().map_err(|err| {
            warn!(%err, "input admission failed");
            CodecError::InvalidCiphertext(handle)
        })?;
        let sealed = registry
            .get_mut(&handle)
            .map_err(|_| CodecError::InvalidCiphertext(handle))?;
        if sealed.width != value.width() {
            return Err(CodecError::InvalidCiphertext(handle));
        }
        sealed.acl.insert(*contract);
        Ok(())
    }
}

fn wrap(handle: Handle, width: WidthTag) -> Result<EncryptedValue, FheError> {
    EncryptedValue::wrap(handle, width).map_err(|err| FheError::Backend(err.to_string()))
}
