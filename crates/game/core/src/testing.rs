//! Plaintext stand-in for an FHE backend, used by the engine unit tests.
//!
//! Values are stored in the clear behind opaque handles. Grants, input proofs
//! and oracle signatures are checked for shape only.

use std::cell::{Cell, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use crate::codec::{CodecError, EncryptedValue, ExternalInput, HANDLE_LEN, Handle, InputProof, WidthTag};
use crate::env::{
    AccessControl, Comparator, DecryptionResponse, DecryptionVerifier, Evaluator, FheError,
    InputVerifier,
};
use crate::state::{Address, RequestId};

pub(crate) const CONTRACT: Address = Address::from_low_u8(0xC7);

struct Entry {
    value: u64,
    grants: BTreeSet<Address>,
    public: bool,
}

#[derive(Default)]
pub(crate) struct ClearBackend {
    entries: RefCell<HashMap<Handle, Entry>>,
    counter: Cell<u64>,
}

impl ClearBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn fresh(&self, value: u64, width: WidthTag) -> Result<EncryptedValue, FheError> {
        let id = self.counter.get() + 1;
        self.counter.set(id);

        let mut digest = [0u8; HANDLE_LEN];
        digest[..8].copy_from_slice(&id.to_le_bytes());
        digest[8] = 0xAB;
        let handle = Handle::from_digest(digest, width);

        self.entries.borrow_mut().insert(
            handle,
            Entry {
                value: width.truncate(value),
                grants: BTreeSet::new(),
                public: false,
            },
        );
        EncryptedValue::wrap(handle, width).map_err(|err| FheError::Backend(err.to_string()))
    }

    fn operand(&self, value: &EncryptedValue) -> Result<u64, FheError> {
        self.entries
            .borrow()
            .get(&value.handle())
            .map(|entry| entry.value)
            .ok_or(FheError::UnknownHandle(value.handle()))
    }

    fn same_width(a: &EncryptedValue, b: &EncryptedValue) -> Result<(), FheError> {
        if a.width() != b.width() {
            return Err(FheError::WidthMismatch {
                expected: a.width(),
                found: b.width(),
            });
        }
        Ok(())
    }

    fn compare(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
        op: impl Fn(u64, u64) -> bool,
    ) -> Result<EncryptedValue, FheError> {
        Self::same_width(a, b)?;
        let result = op(self.operand(a)?, self.operand(b)?);
        self.fresh(u64::from(result), WidthTag::Bool)
    }

    /// Registers a value with no grants, as if computed elsewhere.
    pub(crate) fn encrypt_value(&self, value: u64, width: WidthTag) -> EncryptedValue {
        self.fresh(value, width).expect("fresh ciphertext")
    }

    /// Client-side encryption bound to [`CONTRACT`] and `submitter`.
    pub(crate) fn encrypt_input(
        &self,
        value: u64,
        width: WidthTag,
        submitter: Address,
    ) -> ExternalInput {
        let handle = self.encrypt_value(value, width).handle();
        ExternalInput::new(handle, proof_bytes(&CONTRACT, &submitter, &handle))
    }

    /// Reads a plaintext regardless of grants.
    pub(crate) fn peek(&self, handle: Handle) -> u64 {
        self.entries.borrow()[&handle].value
    }

    /// Reads a plaintext only if `requester` holds a grant.
    pub(crate) fn user_decrypt(&self, handle: Handle, requester: &Address) -> Option<u64> {
        self.entries
            .borrow()
            .get(&handle)
            .filter(|entry| entry.grants.contains(requester))
            .map(|entry| entry.value)
    }

    pub(crate) fn is_public(&self, handle: Handle) -> bool {
        self.entries
            .borrow()
            .get(&handle)
            .is_some_and(|entry| entry.public)
    }

    /// Oracle reply for publicly decryptable `handles`.
    pub(crate) fn respond(&self, request_id: RequestId, handles: &[Handle]) -> DecryptionResponse {
        let cleartexts: Vec<u64> = handles
            .iter()
            .map(|handle| {
                assert!(self.is_public(*handle), "handle {handle} is not public");
                self.peek(*handle)
            })
            .collect();
        let signature = self.sign(request_id, handles, &cleartexts);
        DecryptionResponse {
            request_id,
            cleartexts,
            signature,
        }
    }

    /// Oracle signature over an arbitrary payload.
    pub(crate) fn sign(&self, request_id: RequestId, handles: &[Handle], cleartexts: &[u64]) -> Vec<u8> {
        sign(request_id, handles, cleartexts)
    }
}

fn proof_bytes(contract: &Address, submitter: &Address, handle: &Handle) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(72);
    bytes.extend_from_slice(contract.as_bytes());
    bytes.extend_from_slice(submitter.as_bytes());
    bytes.extend_from_slice(handle.as_bytes());
    bytes
}

fn sign(request_id: RequestId, handles: &[Handle], cleartexts: &[u64]) -> Vec<u8> {
    let mut hasher = DefaultHasher::new();
    "clear-kms".hash(&mut hasher);
    request_id.hash(&mut hasher);
    handles.hash(&mut hasher);
    cleartexts.hash(&mut hasher);
    hasher.finish().to_be_bytes().to_vec()
}

impl InputVerifier for ClearBackend {
    fn verify_proof(
        &self,
        value: &EncryptedValue,
        proof: &InputProof,
        contract: &Address,
        submitter: &Address,
    ) -> Result<(), CodecError> {
        let handle = value.handle();
        if proof.as_bytes() != proof_bytes(contract, submitter, &handle).as_slice() {
            return Err(CodecError::InvalidProof);
        }
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(&handle)
            .ok_or(CodecError::InvalidCiphertext(handle))?;
        entry.grants.insert(*contract);
        Ok(())
    }
}

impl Comparator for ClearBackend {
    fn equals(&self, a: &EncryptedValue, b: &EncryptedValue) -> Result<EncryptedValue, FheError> {
        self.compare(a, b, |x, y| x == y)
    }

    fn greater_than(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError> {
        self.compare(a, b, |x, y| x > y)
    }

    fn less_than(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError> {
        self.compare(a, b, |x, y| x < y)
    }

    fn greater_or_equal(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError> {
        self.compare(a, b, |x, y| x >= y)
    }

    fn less_or_equal(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError> {
        self.compare(a, b, |x, y| x <= y)
    }
}

impl Evaluator for ClearBackend {
    fn trivial(&self, value: u64, width: WidthTag) -> Result<EncryptedValue, FheError> {
        self.fresh(value, width)
    }

    fn add(&self, a: &EncryptedValue, b: &EncryptedValue) -> Result<EncryptedValue, FheError> {
        Self::same_width(a, b)?;
        let sum = self.operand(a)?.wrapping_add(self.operand(b)?);
        self.fresh(sum, a.width())
    }

    fn and(&self, a: &EncryptedValue, b: &EncryptedValue) -> Result<EncryptedValue, FheError> {
        Self::same_width(a, b)?;
        let both = self.operand(a)? & self.operand(b)?;
        self.fresh(both, a.width())
    }

    fn select(
        &self,
        condition: &EncryptedValue,
        if_true: &EncryptedValue,
        if_false: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError> {
        Self::same_width(if_true, if_false)?;
        let chosen = if self.operand(condition)? != 0 {
            self.operand(if_true)?
        } else {
            self.operand(if_false)?
        };
        self.fresh(chosen, if_true.width())
    }
}

impl AccessControl for ClearBackend {
    fn allow(&self, value: &EncryptedValue, account: &Address) -> Result<(), FheError> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(&value.handle())
            .ok_or(FheError::UnknownHandle(value.handle()))?;
        entry.grants.insert(*account);
        Ok(())
    }

    fn allow_public_decryption(&self, value: &EncryptedValue) -> Result<(), FheError> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(&value.handle())
            .ok_or(FheError::UnknownHandle(value.handle()))?;
        entry.public = true;
        Ok(())
    }
}

impl DecryptionVerifier for ClearBackend {
    fn verify_decryption(
        &self,
        request_id: RequestId,
        handles: &[Handle],
        cleartexts: &[u64],
        signature: &[u8],
    ) -> bool {
        signature == sign(request_id, handles, cleartexts).as_slice()
    }
}
