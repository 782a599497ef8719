use std::fmt;

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::Error;

/// A 16-byte AES-128 key.
///
/// Key material is zeroized when the value is dropped, and the `Debug`
/// representation is redacted so a key can never leak through logging.
/// Persisting a key is an explicit act via [`AesKey::to_hex`].
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AesKey([u8; 16]);

impl AesKey {
    /// Key length in bytes.
    pub const LEN: usize = 16;

    /// Wrap an existing 16-byte array.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Copy a key out of a slice.
    ///
    /// Fails with [`Error::InvalidKeySize`] unless the slice is exactly
    /// 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKeySize(bytes.len()))?;
        Ok(Self(bytes))
    }

    /// Parse a key from its 32-character hex encoding.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        Self::from_slice(&hex::decode(s)?)
    }

    /// Generate a fresh random key.
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase hex encoding, for persistence.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let key = AesKey::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(key.to_hex(), "000102030405060708090a0b0c0d0e0f");
        assert_eq!(key.as_bytes()[0], 0x00);
        assert_eq!(key.as_bytes()[15], 0x0f);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            AesKey::from_slice(&[0u8; 8]),
            Err(Error::InvalidKeySize(8))
        );
        assert!(AesKey::from_hex("0011").is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let key = AesKey::random();
        assert_eq!(format!("{key:?}"), "AesKey(<redacted>)");
    }

    #[test]
    fn random_keys_differ() {
        assert_ne!(AesKey::random(), AesKey::random());
    }
}
