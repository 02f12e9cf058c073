//! Encrypted-value codec.
//!
//! Ciphertexts live in the FHE backend; the game only ever holds 32-byte
//! [`Handle`]s that reference them. A handle carries its width tag in byte 30
//! and a layout version in byte 31, so [`EncryptedValue::wrap`] can reject a
//! handle whose declared type does not match how the game intends to use it.
//!
//! Fresh client inputs arrive as [`ExternalInput`] (handle + proof) and are
//! admitted through [`ingest`], which checks the width and asks the backend to
//! verify the proof for the `(contract, submitter)` pair.
mod error;

use core::fmt;

pub use error::CodecError;

use crate::env::InputVerifier;
use crate::state::Address;

/// Length of a ciphertext handle in bytes.
pub const HANDLE_LEN: usize = 32;

/// Current handle layout version (byte 31).
pub const HANDLE_VERSION: u8 = 0;

const WIDTH_BYTE: usize = 30;
const VERSION_BYTE: usize = 31;

/// Opaque reference to a ciphertext registered with the FHE backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Handle(pub [u8; HANDLE_LEN]);

impl Handle {
    /// The all-zero handle, used as "no value" in read projections.
    pub const ZERO: Self = Self([0u8; HANDLE_LEN]);

    /// Builds a handle from a 32-byte digest, stamping the width tag and version.
    pub fn from_digest(mut digest: [u8; HANDLE_LEN], width: WidthTag) -> Self {
        digest[WIDTH_BYTE] = width as u8;
        digest[VERSION_BYTE] = HANDLE_VERSION;
        Self(digest)
    }

    pub const fn as_bytes(&self) -> &[u8; HANDLE_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HANDLE_LEN]
    }

    /// Width tag embedded in the handle, if the byte encodes a known width.
    pub fn width(&self) -> Option<WidthTag> {
        WidthTag::from_byte(self.0[WIDTH_BYTE])
    }

    pub const fn version(&self) -> u8 {
        self.0[VERSION_BYTE]
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self)
    }
}

/// Bit width of an encrypted integer.
///
/// Discriminants follow the byte stamped into handles.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum WidthTag {
    #[strum(serialize = "ebool")]
    Bool = 0,
    #[strum(serialize = "euint8")]
    U8 = 2,
    #[strum(serialize = "euint16")]
    U16 = 3,
    #[strum(serialize = "euint32")]
    U32 = 4,
    #[strum(serialize = "euint64")]
    U64 = 5,
}

impl WidthTag {
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Bool),
            2 => Some(Self::U8),
            3 => Some(Self::U16),
            4 => Some(Self::U32),
            5 => Some(Self::U64),
            _ => None,
        }
    }

    pub const fn bits(&self) -> u32 {
        match self {
            Self::Bool => 1,
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::U64 => 64,
        }
    }

    /// Largest plaintext representable at this width.
    pub const fn max_value(&self) -> u64 {
        match self {
            Self::U64 => u64::MAX,
            other => (1u64 << other.bits()) - 1,
        }
    }

    /// Reduces a plaintext modulo the width, as FHE integer arithmetic does.
    pub const fn truncate(&self, value: u64) -> u64 {
        value & self.max_value()
    }
}

/// A typed reference to an encrypted value.
///
/// Construction goes through [`EncryptedValue::wrap`], so the width tag always
/// agrees with the tag embedded in the handle. There is deliberately no
/// `PartialEq`: equality of plaintexts is only observable through the
/// homomorphic comparator.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncryptedValue {
    handle: Handle,
    width: WidthTag,
}

impl EncryptedValue {
    /// Wraps a handle as a value of the given width.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidCiphertext` if the handle is zero, uses an
    /// unknown layout version, or embeds a different width tag.
    pub fn wrap(handle: Handle, width: WidthTag) -> Result<Self, CodecError> {
        if handle.is_zero() || handle.version() != HANDLE_VERSION {
            return Err(CodecError::InvalidCiphertext(handle));
        }
        match handle.width() {
            Some(found) if found == width => Ok(Self { handle, width }),
            _ => Err(CodecError::InvalidCiphertext(handle)),
        }
    }

    pub const fn handle(&self) -> Handle {
        self.handle
    }

    pub const fn width(&self) -> WidthTag {
        self.width
    }
}

/// Proof blob accompanying a fresh ciphertext submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputProof(pub Vec<u8>);

impl InputProof {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for InputProof {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// A client-encrypted value as submitted to the game.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExternalInput {
    pub handle: Handle,
    pub proof: InputProof,
}

impl ExternalInput {
    pub fn new(handle: Handle, proof: impl Into<InputProof>) -> Self {
        Self {
            handle,
            proof: proof.into(),
        }
    }
}

/// Admits a client input as an encrypted value usable by `contract`.
///
/// The width is checked before the proof so a mistyped handle is reported as
/// `InvalidCiphertext` rather than `InvalidProof`.
pub fn ingest(
    verifier: &dyn InputVerifier,
    input: &ExternalInput,
    width: WidthTag,
    contract: &Address,
    submitter: &Address,
) -> Result<EncryptedValue, CodecError> {
    let value = EncryptedValue::wrap(input.handle, width)?;
    verifier.verify_proof(&value, &input.proof, contract, submitter)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn wrap_accepts_matching_width() {
        let handle = Handle::from_digest([7u8; HANDLE_LEN], WidthTag::U16);
        let value = EncryptedValue::wrap(handle, WidthTag::U16).unwrap();
        assert_eq!(value.handle(), handle);
        assert_eq!(value.width(), WidthTag::U16);
    }

    #[test]
    fn wrap_rejects_width_mismatch() {
        let handle = Handle::from_digest([7u8; HANDLE_LEN], WidthTag::U64);
        let result = EncryptedValue::wrap(handle, WidthTag::U16);
        assert_eq!(result.unwrap_err(), CodecError::InvalidCiphertext(handle));
    }

    #[test]
    fn wrap_rejects_zero_and_unknown_version() {
        assert!(EncryptedValue::wrap(Handle::ZERO, WidthTag::Bool).is_err());

        let mut bytes = Handle::from_digest([1u8; HANDLE_LEN], WidthTag::U8).0;
        bytes[31] = 9;
        assert!(EncryptedValue::wrap(Handle(bytes), WidthTag::U8).is_err());
    }

    #[test]
    fn width_byte_round_trips_for_every_tag() {
        for width in WidthTag::iter() {
            assert_eq!(WidthTag::from_byte(width as u8), Some(width));
        }
        assert_eq!(WidthTag::from_byte(1), None);
    }

    #[test]
    fn truncate_wraps_like_fhe_integers() {
        assert_eq!(WidthTag::U8.truncate(300), 44);
        assert_eq!(WidthTag::U16.truncate(999), 999);
        assert_eq!(WidthTag::Bool.truncate(3), 1);
        assert_eq!(WidthTag::U64.truncate(u64::MAX), u64::MAX);
    }
}
