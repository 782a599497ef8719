//! Single-block AES-128 operations in ECB mode.
//!
//! Everything above this module (CMAC chaining, CBC, IV derivation) is built
//! from these two calls plus XOR.

use aes::Aes128;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::AesKey;

/// One AES block.
pub type Block = [u8; 16];

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Encrypt a single block in place under `key`.
pub fn encrypt_block(key: &AesKey, block: &mut Block) {
    let cipher = Aes128::new(key.as_bytes().into());
    cipher.encrypt_block(block.into());
}

/// Decrypt a single block in place under `key`.
pub fn decrypt_block(key: &AesKey, block: &mut Block) {
    let cipher = Aes128::new(key.as_bytes().into());
    cipher.decrypt_block(block.into());
}

/// XOR two blocks.
pub fn xor16(a: &Block, b: &Block) -> Block {
    let mut out = [0u8; BLOCK_SIZE];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x ^ y;
    }
    out
}
