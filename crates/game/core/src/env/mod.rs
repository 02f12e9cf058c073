//! Capabilities the engine needs from an FHE backend.
//!
//! The engine never inspects operands. It asks these traits to verify inputs,
//! compare and combine ciphertexts, grant decrypt rights, and authenticate
//! oracle decryptions. [`FheEnv`] bundles them for one contract so the engine
//! can reach everything it needs without coupling to a concrete backend.
mod decryption;
mod error;

pub use decryption::{DecryptionResponse, DecryptionVerifier};
pub use error::FheError;

use crate::codec::{CodecError, EncryptedValue, InputProof, WidthTag};
use crate::state::Address;

/// Verifies client input proofs.
pub trait InputVerifier {
    /// Checks that `proof` covers `value` for the `(contract, submitter)` pair.
    ///
    /// On success the ciphertext becomes usable by `contract` in later
    /// homomorphic operations.
    fn verify_proof(
        &self,
        value: &EncryptedValue,
        proof: &InputProof,
        contract: &Address,
        submitter: &Address,
    ) -> Result<(), CodecError>;
}

/// Homomorphic comparisons. Every result is an encrypted `Bool`.
pub trait Comparator {
    fn equals(&self, a: &EncryptedValue, b: &EncryptedValue) -> Result<EncryptedValue, FheError>;

    fn greater_than(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError>;

    fn less_than(&self, a: &EncryptedValue, b: &EncryptedValue)
    -> Result<EncryptedValue, FheError>;

    fn greater_or_equal(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError>;

    fn less_or_equal(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError>;
}

/// Homomorphic arithmetic and selection.
pub trait Evaluator {
    /// Encrypts a public constant so it can take part in homomorphic operations.
    fn trivial(&self, value: u64, width: WidthTag) -> Result<EncryptedValue, FheError>;

    /// Wrapping addition at the operands' width.
    fn add(&self, a: &EncryptedValue, b: &EncryptedValue) -> Result<EncryptedValue, FheError>;

    fn and(&self, a: &EncryptedValue, b: &EncryptedValue) -> Result<EncryptedValue, FheError>;

    /// `condition ? if_true : if_false` without revealing `condition`.
    fn select(
        &self,
        condition: &EncryptedValue,
        if_true: &EncryptedValue,
        if_false: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError>;
}

/// Per-ciphertext decrypt grants.
pub trait AccessControl {
    /// Adds `account` to the grant list of `value`.
    fn allow(&self, value: &EncryptedValue, account: &Address) -> Result<(), FheError>;

    /// Marks `value` as decryptable by the public decryption oracle.
    fn allow_public_decryption(&self, value: &EncryptedValue) -> Result<(), FheError>;
}

/// Everything a complete backend provides.
pub trait FheBackend: InputVerifier + Comparator + Evaluator + AccessControl + DecryptionVerifier {}

impl<T> FheBackend for T where
    T: InputVerifier + Comparator + Evaluator + AccessControl + DecryptionVerifier + ?Sized
{
}

/// Aggregates the capabilities required by the engine, scoped to one contract.
#[derive(Clone, Copy)]
pub struct FheEnv<'a> {
    inputs: &'a dyn InputVerifier,
    comparator: &'a dyn Comparator,
    evaluator: &'a dyn Evaluator,
    acl: &'a dyn AccessControl,
    decryption: &'a dyn DecryptionVerifier,
    contract: Address,
}

impl<'a> FheEnv<'a> {
    pub fn new(
        inputs: &'a dyn InputVerifier,
        comparator: &'a dyn Comparator,
        evaluator: &'a dyn Evaluator,
        acl: &'a dyn AccessControl,
        decryption: &'a dyn DecryptionVerifier,
        contract: Address,
    ) -> Self {
        Self {
            inputs,
            comparator,
            evaluator,
            acl,
            decryption,
            contract,
        }
    }

    /// Uses one backend for every capability.
    pub fn from_backend<B>(backend: &'a B, contract: Address) -> Self
    where
        B: FheBackend,
    {
        Self::new(backend, backend, backend, backend, backend, contract)
    }

    pub fn inputs(&self) -> &'a dyn InputVerifier {
        self.inputs
    }

    pub fn comparator(&self) -> &'a dyn Comparator {
        self.comparator
    }

    pub fn evaluator(&self) -> &'a dyn Evaluator {
        self.evaluator
    }

    pub fn acl(&self) -> &'a dyn AccessControl {
        self.acl
    }

    pub fn decryption(&self) -> &'a dyn DecryptionVerifier {
        self.decryption
    }

    /// Address the game runs under; input proofs are bound to it.
    pub fn contract(&self) -> Address {
        self.contract
    }
}
