use game_core::{
    AccessControl, Address, CodecError, Comparator, DecryptionVerifier, EncryptedValue, Evaluator,
    FheError, Handle, InputProof, InputVerifier, RequestId, WidthTag,
};

use crate::coprocessor::Coprocessor;

/// The coprocessor as seen by one contract.
///
/// Implements every capability trait `game-core` needs. Operands must be
/// granted to the contract; results are granted to it automatically.
#[derive(Clone, Copy)]
pub struct ContractContext<'a> {
    coprocessor: &'a Coprocessor,
    contract: Address,
}

impl<'a> ContractContext<'a> {
    pub(crate) fn new(coprocessor: &'a Coprocessor, contract: Address) -> Self {
        Self {
            coprocessor,
            contract,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    fn compare(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
        op: impl FnOnce(u64, u64) -> bool,
    ) -> Result<EncryptedValue, FheError> {
        same_width(a, b)?;
        self.coprocessor
            .evaluate(&self.contract, [a, b], WidthTag::Bool, |[x, y]| {
                u64::from(op(x, y))
            })
    }
}

fn same_width(a: &EncryptedValue, b: &EncryptedValue) -> Result<(), FheError> {
    if a.width() == b.width() {
        Ok(())
    } else {
        Err(FheError::WidthMismatch {
            expected: a.width(),
            found: b.width(),
        })
    }
}

impl InputVerifier for ContractContext<'_> {
    fn verify_proof(
        &self,
        value: &EncryptedValue,
        proof: &InputProof,
        contract: &Address,
        submitter: &Address,
    ) -> Result<(), CodecError> {
        if *contract != self.contract {
            return Err(CodecError::InvalidProof);
        }
        self.coprocessor
            .admit_input(value, proof, contract, submitter)
    }
}

impl Comparator for ContractContext<'_> {
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

impl Evaluator for ContractContext<'_> {
    fn trivial(&self, value: u64, width: WidthTag) -> Result<EncryptedValue, FheError> {
        self.coprocessor.trivial(&self.contract, value, width)
    }

    fn add(&self, a: &EncryptedValue, b: &EncryptedValue) -> Result<EncryptedValue, FheError> {
        same_width(a, b)?;
        let width = a.width();
        self.coprocessor
            .evaluate(&self.contract, [a, b], width, |[x, y]| {
                width.truncate(x.wrapping_add(y))
            })
    }

    fn and(&self, a: &EncryptedValue, b: &EncryptedValue) -> Result<EncryptedValue, FheError> {
        same_width(a, b)?;
        self.coprocessor
            .evaluate(&self.contract, [a, b], a.width(), |[x, y]| x & y)
    }

    fn select(
        &self,
        condition: &EncryptedValue,
        if_true: &EncryptedValue,
        if_false: &EncryptedValue,
    ) -> Result<EncryptedValue, FheError> {
        if condition.width() != WidthTag::Bool {
            return Err(FheError::WidthMismatch {
                expected: WidthTag::Bool,
                found: condition.width(),
            });
        }
        same_width(if_true, if_false)?;
        self.coprocessor.evaluate(
            &self.contract,
            [condition, if_true, if_false],
            if_true.width(),
            |[c, t, f]| if c != 0 { t } else { f },
        )
    }
}

impl AccessControl for ContractContext<'_> {
    fn allow(&self, value: &EncryptedValue, account: &Address) -> Result<(), FheError> {
        self.coprocessor.grant(&self.contract, value, account)
    }

    fn allow_public_decryption(&self, value: &EncryptedValue) -> Result<(), FheError> {
        self.coprocessor.mark_public(&self.contract, value)
    }
}

impl DecryptionVerifier for ContractContext<'_> {
    fn verify_decryption(
        &self,
        request_id: RequestId,
        handles: &[Handle],
        cleartexts: &[u64],
        signature: &[u8],
    ) -> bool {
        self.coprocessor
            .verify_decryption(request_id, handles, cleartexts, signature)
    }
}
