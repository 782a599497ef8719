use thiserror::Error;

/// Error type for primitive operations.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// A key was supplied with a length other than 16 bytes.
    #[error("AES-128 key must be 16 bytes, got {0}")]
    InvalidKeySize(usize),

    /// CBC input whose length is not a multiple of the block size.
    #[error("data length {0} is not a multiple of the AES block size")]
    UnalignedData(usize),

    /// Malformed hex input.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}
