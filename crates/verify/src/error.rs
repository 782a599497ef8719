use thiserror::Error;

/// Error type for scan verification.
///
/// The variants are for logs and metrics. Anything user-facing must go
/// through [`VerifyError::public_message`], which collapses replay and
/// signature failures into one string — distinguishing them would hand an
/// attacker an oracle for probing counter state.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Malformed query input: bad hex, wrong lengths, missing parameters.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The recomputed MAC does not match the scanned one.
    #[error("MAC verification failed")]
    InvalidSignature,

    /// The counter is not strictly greater than the stored one.
    #[error("replay detected: counter {received} is not greater than stored {stored}")]
    Replay {
        /// Counter from the scanned URL.
        received: u32,
        /// Last accepted counter.
        stored: u32,
    },

    /// The scanned UID does not belong to the record being verified.
    #[error("UID mismatch: expected {expected}, got {actual}")]
    UidMismatch {
        /// UID stored in the record.
        expected: String,
        /// UID recovered from the scan.
        actual: String,
    },

    /// The record's persisted key material could not be parsed.
    #[error("stored key material invalid: {0}")]
    KeyMaterial(#[from] dnatag_crypto::Error),
}

impl VerifyError {
    /// The message safe to expose to the scanning client.
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) | Self::KeyMaterial(_) => "invalid request",
            Self::InvalidSignature | Self::Replay { .. } | Self::UidMismatch { .. } => {
                "invalid tag"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_and_bad_mac_are_indistinguishable_publicly() {
        let replay = VerifyError::Replay {
            received: 5,
            stored: 9,
        };
        assert_eq!(replay.public_message(), VerifyError::InvalidSignature.public_message());
        assert_eq!(replay.public_message(), "invalid tag");
    }
}
