//! The physical transport contract.
//!
//! The protocol layers never talk to hardware directly; they are written
//! against this one-method trait so the same stack runs over Android IsoDep,
//! PC/SC, or a scripted card in tests.

use thiserror::Error;

/// Failure of the physical link.
///
/// Fatal to the current session: the session keys are useless once the field
/// is lost, so recovery means re-tapping the tag and authenticating again.
/// Tag removal during a flow surfaces as this error from the next exchange.
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(String);

impl TransportError {
    /// Wrap a transport-layer failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A synchronous, half-duplex frame exchange with the card.
///
/// Exactly one exchange may be in flight at a time; issuing a new command
/// before the previous response arrives is undefined on the wire.
pub trait Transceiver {
    /// Send one APDU frame and return the raw response, including the
    /// trailing status word.
    fn transceive(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError>;
}
