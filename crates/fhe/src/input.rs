//! Encryption client: turns plaintexts into handles plus an input proof.
//!
//! Proof layout: `[count: u8][count x 32-byte handle][64-byte ed25519 signature]`.
//! The signature covers the contract, the submitter and every handle, so a
//! proof cannot be replayed by another account or against another contract.

use ed25519_dalek::Signature;
use game_core::{Address, ExternalInput, FheError, HANDLE_LEN, Handle, InputProof, WidthTag};

use crate::coprocessor::Coprocessor;

const SIGNATURE_LEN: usize = 64;

/// Builder for one client submission.
pub struct EncryptedInput<'a> {
    coprocessor: &'a Coprocessor,
    contract: Address,
    submitter: Address,
    values: Vec<(u64, WidthTag)>,
}

impl<'a> EncryptedInput<'a> {
    pub(crate) fn new(coprocessor: &'a Coprocessor, contract: Address, submitter: Address) -> Self {
        Self {
            coprocessor,
            contract,
            submitter,
            values: Vec::new(),
        }
    }

    pub fn add(mut self, value: u64, width: WidthTag) -> Self {
        self.values.push((value, width));
        self
    }

    pub fn add_bool(self, value: bool) -> Self {
        self.add(u64::from(value), WidthTag::Bool)
    }

    pub fn add8(self, value: u8) -> Self {
        self.add(u64::from(value), WidthTag::U8)
    }

    pub fn add16(self, value: u16) -> Self {
        self.add(u64::from(value), WidthTag::U16)
    }

    pub fn add32(self, value: u32) -> Self {
        self.add(u64::from(value), WidthTag::U32)
    }

    pub fn add64(self, value: u64) -> Self {
        self.add(value, WidthTag::U64)
    }

    /// Seals every value and signs one proof over all of them.
    pub fn encrypt(self) -> Result<InputBundle, FheError> {
        let handles = self
            .values
            .iter()
            .map(|&(value, width)| self.coprocessor.seal_value(value, width))
            .collect::<Result<Vec<_>, _>>()?;
        self.coprocessor
            .sign_input(&self.contract, &self.submitter, handles)
    }
}

/// Handles produced by one [`EncryptedInput`] and the proof that covers them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputBundle {
    handles: Vec<Handle>,
    proof: InputProof,
}

impl InputBundle {
    pub(crate) fn new(handles: Vec<Handle>, proof: InputProof) -> Self {
        Self { handles, proof }
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn proof(&self) -> &InputProof {
        &self.proof
    }

    /// The `index`-th value paired with the shared proof.
    pub fn input(&self, index: usize) -> Option<ExternalInput> {
        self.handles
            .get(index)
            .map(|handle| ExternalInput::new(*handle, self.proof.clone()))
    }
}

pub(crate) fn encode_proof(handles: &[Handle], signature: &Signature) -> Option<InputProof> {
    let count = u8::try_from(handles.len()).ok()?;
    let mut bytes = Vec::with_capacity(1 + handles.len() * HANDLE_LEN + SIGNATURE_LEN);
    bytes.push(count);
    for handle in handles {
        bytes.extend_from_slice(handle.as_bytes());
    }
    bytes.extend_from_slice(&signature.to_bytes());
    Some(InputProof(bytes))
}

pub(crate) fn decode_proof(bytes: &[u8]) -> Option<(Vec<Handle>, Signature)> {
    let (&count, rest) = bytes.split_first()?;
    let handles_len = usize::from(count) * HANDLE_LEN;
    if rest.len() != handles_len + SIGNATURE_LEN {
        return None;
    }
    let (handle_bytes, signature) = rest.split_at(handles_len);

    let handles = handle_bytes
        .chunks_exact(HANDLE_LEN)
        .map(|chunk| chunk.try_into().map(Handle))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    let signature = Signature::from_slice(signature).ok()?;
    Some((handles, signature))
}
