//! Cryptographic primitives shared by the NTAG 424 DNA provisioning and
//! verification crates.
//!
//! Both protocol ends — the reader that programs a tag and the service that
//! verifies a scanned URL — must compute byte-identical results for every
//! primitive here. Keeping a single implementation in one crate is what makes
//! that guarantee hold; neither side is allowed its own copy.
//!
//! ## Overview
//!
//! - [`AesKey`] — the 16-byte AES-128 key type used everywhere key material
//!   appears. Redacted in `Debug` output and zeroized on drop.
//! - [`block`] — single-block AES-128 ECB, the primitive everything else is
//!   built on.
//! - [`cmac`] — RFC 4493 AES-CMAC with explicit subkey access and the NXP
//!   odd-byte truncation used by NTAG 424 DNA.
//! - [`cbc`] — AES-128-CBC without built-in padding, plus the NXP `0x80`
//!   padding convention.
//! - [`crc32`] — the JAMCRC variant (no final inversion) used by the
//!   ChangeKey command.
//! - [`ct_eq`] — constant-time byte comparison for MAC checks.

pub mod block;
pub mod cbc;
pub mod cmac;
pub mod crc32;
mod ct;
mod error;
mod key;

pub use self::block::{Block, BLOCK_SIZE};
pub use self::cmac::CmacAes;
pub use self::ct::ct_eq;
pub use self::error::Error;
pub use self::key::AesKey;

/// Result type for fallible primitive operations.
pub type Result<T> = std::result::Result<T, Error>;
