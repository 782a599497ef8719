//! AES-128-CBC with caller-controlled padding.
//!
//! The cipher calls never pad: the NTAG 424 DNA protocol pads with `0x80`
//! followed by zeros, and only where a frame is not already block-aligned.
//! Padding and its removal are therefore separate, explicit steps.

use aes::cipher::block_padding::NoPadding;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::block::{Block, BLOCK_SIZE};
use crate::{AesKey, Error, Result};

type Aes128CbcEnc = ::cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = ::cbc::Decryptor<aes::Aes128>;

/// The all-zero IV used for key-derivation-time operations.
pub const ZERO_IV: Block = [0u8; BLOCK_SIZE];

/// Encrypt block-aligned `data` under AES-128-CBC.
///
/// Fails with [`Error::UnalignedData`] if `data` is not a multiple of the
/// block size; pad first with [`pad_to_block_size`] where the protocol calls
/// for it.
pub fn encrypt_cbc(key: &AesKey, iv: &Block, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(Error::UnalignedData(data.len()));
    }
    let mut buf = data.to_vec();
    Aes128CbcEnc::new(key.as_bytes().into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, data.len())
        .map_err(|_| Error::UnalignedData(data.len()))?;
    Ok(buf)
}

/// Decrypt block-aligned `data` under AES-128-CBC.
pub fn decrypt_cbc(key: &AesKey, iv: &Block, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(Error::UnalignedData(data.len()));
    }
    let mut buf = data.to_vec();
    Aes128CbcDec::new(key.as_bytes().into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| Error::UnalignedData(data.len()))?;
    Ok(buf)
}

/// Pad to the next block boundary with a single `0x80` followed by zeros.
///
/// Data that is already block-aligned (including empty data) is returned
/// unchanged; the protocol never forces an extra padding block.
pub fn pad_to_block_size(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    if out.len() % BLOCK_SIZE != 0 {
        out.push(0x80);
        out.resize(out.len().next_multiple_of(BLOCK_SIZE), 0x00);
    }
    out
}

/// Strip `0x80` padding: skip trailing zeros from the end and remove one
/// terminating `0x80` if present.
///
/// Data with no `0x80` sentinel is returned unchanged. Payloads whose real
/// content ends in `0x80` plus zeros cannot be told apart from padding; the
/// card strips them the same way, and interop requires keeping that behavior
/// bit-for-bit rather than rejecting the ambiguity.
pub fn remove_padding(data: &[u8]) -> &[u8] {
    let mut end = data.len();
    while end > 0 && data[end - 1] == 0x00 {
        end -= 1;
    }
    if end > 0 && data[end - 1] == 0x80 {
        &data[..end - 1]
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn sp800_38a_cbc_vectors() {
        // NIST SP 800-38A F.2.1/F.2.2 (AES-128 CBC).
        let key = AesKey::new(hex!("2b7e151628aed2a6abf7158809cf4f3c"));
        let iv = hex!("000102030405060708090a0b0c0d0e0f");
        let plaintext = hex!(
            "6bc1bee22e409f96e93d7e117393172a"
            "ae2d8a571e03ac9c9eb76fac45af8e51"
            "30c81c46a35ce411e5fbc1191a0a52ef"
            "f69f2445df4f9b17ad2b417be66c3710"
        );
        let expected = hex!(
            "7649abac8119b246cee98e9b12e9197d"
            "5086cb9b507219ee95db113a917678b2"
            "73bed6b8e3c1743b7116e69e22229516"
            "3ff1caa1681fac09120eca307586e1a7"
        );

        let ciphertext = encrypt_cbc(&key, &iv, &plaintext).unwrap();
        assert_eq!(ciphertext, expected);
        assert_eq!(decrypt_cbc(&key, &iv, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn round_trip_with_zero_iv() {
        let key = AesKey::random();
        let data: Vec<u8> = (0..48u8).collect();
        let ct = encrypt_cbc(&key, &ZERO_IV, &data).unwrap();
        assert_ne!(ct, data);
        assert_eq!(decrypt_cbc(&key, &ZERO_IV, &ct).unwrap(), data);
    }

    #[test]
    fn rejects_unaligned_input() {
        let key = AesKey::random();
        assert_eq!(
            encrypt_cbc(&key, &ZERO_IV, &[0u8; 15]),
            Err(Error::UnalignedData(15))
        );
        assert_eq!(
            decrypt_cbc(&key, &ZERO_IV, &[0u8; 17]),
            Err(Error::UnalignedData(17))
        );
    }

    #[test]
    fn pad_appends_sentinel_then_zeros() {
        let padded = pad_to_block_size(&[0xAA, 0xBB]);
        assert_eq!(padded.len(), 16);
        assert_eq!(&padded[..3], &[0xAA, 0xBB, 0x80]);
        assert!(padded[3..].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn pad_leaves_aligned_data_untouched() {
        let aligned = [0x42u8; 32];
        assert_eq!(pad_to_block_size(&aligned), aligned);
        assert_eq!(pad_to_block_size(&[]), Vec::<u8>::new());
    }

    #[test]
    fn pad_unpad_round_trip() {
        for len in 0..=64usize {
            // Byte values that never collide with the padding sentinel.
            let data: Vec<u8> = (0..len).map(|i| (i % 7 + 1) as u8).collect();
            assert_eq!(remove_padding(&pad_to_block_size(&data)), &data[..]);
        }
    }

    #[test]
    fn unpad_without_sentinel_is_identity() {
        // Documented ambiguous case: no 0x80 found while skipping zeros.
        assert_eq!(remove_padding(&[0x01, 0x00, 0x00]), &[0x01, 0x00, 0x00]);
        assert_eq!(remove_padding(&[0x00; 16]), &[0x00; 16]);
        assert_eq!(remove_padding(&[]), &[] as &[u8]);
    }

    #[test]
    fn unpad_strips_single_sentinel() {
        assert_eq!(remove_padding(&[0x01, 0x80]), &[0x01]);
        assert_eq!(remove_padding(&[0x01, 0x80, 0x00, 0x00]), &[0x01]);
        // Only one sentinel is removed.
        assert_eq!(remove_padding(&[0x80, 0x80]), &[0x80]);
    }
}
