use std::fmt;

use crate::apdu::StatusWord;
use crate::transport::TransportError;

/// Result type for card operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Ways the EV2 handshake can be refused by the card.
///
/// All three are reported to callers as "authentication failed"; they are
/// safe to retry with a different key, unlike transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The card refused the opening frame of the handshake.
    FirstFrameRejected,
    /// The card rejected the encrypted challenge. The usual cause is a wrong
    /// key: the card could not recover its own RndB from our frame.
    KeyRejected,
    /// The card's echoed RndA' does not match the rotation of the RndA we
    /// sent. Hard failure, not transient.
    ChallengeMismatch,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FirstFrameRejected => "first-frame-rejected",
            Self::KeyRejected => "key-rejected",
            Self::ChallengeMismatch => "challenge-mismatch",
        })
    }
}

/// Error type for card operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Physical link failure; re-tap to retry.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed or unexpected response. Fatal to the current handshake.
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// The card refused authentication.
    #[error("authentication failed: {0}")]
    Auth(AuthFailure),

    /// An authenticated command was issued before a successful handshake.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The card answered an authenticated command with an error status. The
    /// raw status word is kept for diagnostics; user-facing layers should
    /// present a generic message.
    #[error("command {ins:#04X} failed with status {status}")]
    Command {
        /// Instruction code of the failed command.
        ins: u8,
        /// Status word returned by the card.
        status: StatusWord,
    },

    /// The tag did not identify as an NTAG 424 DNA.
    #[error("tag is not an NTAG 424 DNA")]
    UnsupportedTag,

    /// Primitive-layer failure (key size, alignment).
    #[error(transparent)]
    Crypto(#[from] dnatag_crypto::Error),
}
