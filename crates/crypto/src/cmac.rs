//! AES-CMAC per RFC 4493 / NIST SP 800-38B, with the NTAG 424 DNA
//! truncation rule.
//!
//! This is a hand-rolled implementation rather than a wrapper around a CMAC
//! crate because the card protocol consumes pieces a generic implementation
//! keeps private: the K1/K2 subkeys feed test vectors and diagnostics, and
//! the 8-byte truncated form is the odd-indexed bytes of the full MAC — not
//! a prefix. The test suite checks every full MAC against the RustCrypto
//! `cmac` crate, so the two implementations cannot drift apart unnoticed.

use aes::Aes128;
use cipher::{BlockEncrypt, KeyInit};

use crate::block::{xor16, Block, BLOCK_SIZE};
use crate::AesKey;

/// The RFC 4493 constant XORed into the last byte during subkey doubling
/// when the shifted-out bit was set.
const RB: u8 = 0x87;

/// AES-CMAC engine with precomputed subkeys.
pub struct CmacAes {
    cipher: Aes128,
    k1: Block,
    k2: Block,
}

impl std::fmt::Debug for CmacAes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Subkeys are key material; keep them out of logs.
        f.write_str("CmacAes(<redacted>)")
    }
}

impl CmacAes {
    /// Create an engine for `key`, deriving the K1/K2 subkeys.
    pub fn new(key: &AesKey) -> Self {
        let cipher = Aes128::new(key.as_bytes().into());
        let mut l = [0u8; BLOCK_SIZE];
        cipher.encrypt_block((&mut l).into());
        let k1 = dbl(&l);
        let k2 = dbl(&k1);
        Self { cipher, k1, k2 }
    }

    /// The derived subkeys `(K1, K2)`.
    pub const fn subkeys(&self) -> (&Block, &Block) {
        (&self.k1, &self.k2)
    }

    /// Compute the full 16-byte CMAC of `message`.
    pub fn mac(&self, message: &[u8]) -> Block {
        // An empty message still forms one (padded) block.
        let block_count = message.len().div_ceil(BLOCK_SIZE).max(1);
        let aligned = !message.is_empty() && message.len() % BLOCK_SIZE == 0;

        let mut last = [0u8; BLOCK_SIZE];
        if aligned {
            last.copy_from_slice(&message[(block_count - 1) * BLOCK_SIZE..]);
            last = xor16(&last, &self.k1);
        } else {
            let rem = message.len() % BLOCK_SIZE;
            last[..rem].copy_from_slice(&message[(block_count - 1) * BLOCK_SIZE..]);
            last[rem] = 0x80;
            last = xor16(&last, &self.k2);
        }

        let mut x = [0u8; BLOCK_SIZE];
        for chunk in message.chunks_exact(BLOCK_SIZE).take(block_count - 1) {
            for (a, b) in x.iter_mut().zip(chunk) {
                *a ^= b;
            }
            self.cipher.encrypt_block((&mut x).into());
        }
        x = xor16(&x, &last);
        self.cipher.encrypt_block((&mut x).into());
        x
    }

    /// Compute the truncated 8-byte CMAC of `message`.
    pub fn mac_truncated(&self, message: &[u8]) -> [u8; 8] {
        truncate_mac(&self.mac(message))
    }
}

/// Truncate a full CMAC to the 8 odd-indexed bytes (1, 3, …, 15).
///
/// This is the NTAG 424 DNA convention; a plain 8-byte prefix will not
/// verify against the card.
pub fn truncate_mac(full: &Block) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (i, b) in out.iter_mut().enumerate() {
        *b = full[2 * i + 1];
    }
    out
}

/// GF(2^128) doubling: shift the block left one bit, carry propagating from
/// byte 15 toward byte 0, XOR `RB` into the last byte if the top bit was set.
fn dbl(input: &Block) -> Block {
    let mut out = [0u8; BLOCK_SIZE];
    let mut carry = 0u8;
    for i in (0..BLOCK_SIZE).rev() {
        let shifted = (u16::from(input[i]) << 1) | u16::from(carry);
        out[i] = (shifted & 0xff) as u8;
        carry = ((shifted >> 8) & 1) as u8;
    }
    if input[0] & 0x80 != 0 {
        out[BLOCK_SIZE - 1] ^= RB;
    }
    out
}

#[cfg(test)]
mod tests {
    use cmac::{Cmac, Mac};
    use hex_literal::hex;

    use super::*;

    // RFC 4493 section 4 sample key and messages.
    const KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    const MSG64: [u8; 64] = hex!(
        "6bc1bee22e409f96e93d7e117393172a"
        "ae2d8a571e03ac9c9eb76fac45af8e51"
        "30c81c46a35ce411e5fbc1191a0a52ef"
        "f69f2445df4f9b17ad2b417be66c3710"
    );

    #[test]
    fn rfc4493_subkeys() {
        let engine = CmacAes::new(&AesKey::new(KEY));
        let (k1, k2) = engine.subkeys();
        assert_eq!(k1, &hex!("fbeed618357133667c85e08f7236a8de"));
        assert_eq!(k2, &hex!("f7ddac306ae266ccf90bc11ee46d513b"));
    }

    #[test]
    fn zero_key_subkeys() {
        // L = AES(0, 0) = 66e94bd4ef8a2c3b884cfa59ca342b2e; doubling by hand
        // gives the values below.
        let engine = CmacAes::new(&AesKey::new([0u8; 16]));
        let (k1, k2) = engine.subkeys();
        assert_eq!(k1, &hex!("cdd297a9df1458771099f4b39468565c"));
        assert_eq!(k2, &hex!("9ba52f53be28b0ee2133e96728d0ac3f"));
    }

    #[test]
    fn rfc4493_example_1_empty() {
        let engine = CmacAes::new(&AesKey::new(KEY));
        assert_eq!(
            engine.mac(&[]),
            hex!("bb1d6929e95937287fa37d129b756746")
        );
    }

    #[test]
    fn rfc4493_example_2_one_block() {
        let engine = CmacAes::new(&AesKey::new(KEY));
        assert_eq!(
            engine.mac(&MSG64[..16]),
            hex!("070a16b46b4d4144f79bdd9dd04a287c")
        );
    }

    #[test]
    fn rfc4493_example_3_partial_block() {
        let engine = CmacAes::new(&AesKey::new(KEY));
        assert_eq!(
            engine.mac(&MSG64[..40]),
            hex!("dfa66747de9ae63030ca32611497c827")
        );
    }

    #[test]
    fn rfc4493_example_4_four_blocks() {
        let engine = CmacAes::new(&AesKey::new(KEY));
        assert_eq!(
            engine.mac(&MSG64),
            hex!("51f0bebf7e3b9d92fc49741779363cfe")
        );
    }

    #[test]
    fn truncation_takes_odd_bytes() {
        let engine = CmacAes::new(&AesKey::new(KEY));
        for len in [0usize, 1, 15, 16, 17, 32, 40, 47] {
            let msg: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let full = engine.mac(&msg);
            let truncated = engine.mac_truncated(&msg);
            for i in 0..8 {
                assert_eq!(truncated[i], full[2 * i + 1]);
            }
        }
    }

    #[test]
    fn agrees_with_rustcrypto_cmac() {
        // Differential test against an independent implementation, for every
        // length class (empty, partial, aligned, multi-block).
        let key = AesKey::new(KEY);
        let engine = CmacAes::new(&key);
        for len in 0..=64usize {
            let msg: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
            let mut reference = <Cmac<aes::Aes128> as Mac>::new_from_slice(key.as_bytes()).unwrap();
            reference.update(&msg);
            let expected = reference.finalize().into_bytes();
            assert_eq!(engine.mac(&msg)[..], expected[..], "length {len}");
        }
    }

    #[test]
    fn mac_is_deterministic() {
        let engine = CmacAes::new(&AesKey::new(KEY));
        assert_eq!(engine.mac(&MSG64[..40]), engine.mac(&MSG64[..40]));
    }
}
