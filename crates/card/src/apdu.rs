//! The fixed APDU envelope the NTAG 424 DNA speaks.
//!
//! Every native command travels as `CLA=0x90, INS, P1=0x00, P2=0x00, [Lc,
//! data,] Le=0x00`, and every response carries a two-byte `0x91 xx` status
//! word at the end.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Class byte for wrapped native commands.
pub const CLA_WRAPPED: u8 = 0x90;

/// Two-byte response status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWord {
    /// First status byte (0x91 for native responses).
    pub sw1: u8,
    /// Second status byte.
    pub sw2: u8,
}

impl StatusWord {
    /// Operation completed.
    pub const OK: Self = Self::new(0x91, 0x00);
    /// More frames follow; continue with INS 0xAF.
    pub const MORE_DATA: Self = Self::new(0x91, 0xAF);
    /// Authentication error.
    pub const AUTH_ERROR: Self = Self::new(0x91, 0xAE);
    /// Permission denied.
    pub const PERMISSION_DENIED: Self = Self::new(0x91, 0x9D);
    /// MAC or padding verification failed on the card.
    pub const INTEGRITY_ERROR: Self = Self::new(0x91, 0x1E);

    /// Create a status word from its two bytes.
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Whether the card reported success.
    pub const fn is_ok(self) -> bool {
        self.sw1 == Self::OK.sw1 && self.sw2 == Self::OK.sw2
    }

    /// Whether the card has more response frames pending.
    pub const fn is_more_data(self) -> bool {
        self.sw1 == Self::MORE_DATA.sw1 && self.sw2 == Self::MORE_DATA.sw2
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// A native command in the fixed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Instruction code.
    pub ins: u8,
    /// Command payload (may be empty).
    pub data: Bytes,
}

impl Command {
    /// Command with no payload.
    pub const fn new(ins: u8) -> Self {
        Self {
            ins,
            data: Bytes::new(),
        }
    }

    /// Command with a payload.
    pub fn with_data(ins: u8, data: impl Into<Bytes>) -> Self {
        Self {
            ins,
            data: data.into(),
        }
    }

    /// Serialize to the wire format.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(6 + self.data.len());
        buf.put_u8(CLA_WRAPPED);
        buf.put_u8(self.ins);
        buf.put_u8(0x00); // P1
        buf.put_u8(0x00); // P2
        if !self.data.is_empty() {
            buf.put_u8(self.data.len() as u8);
            buf.put_slice(&self.data);
        }
        buf.put_u8(0x00); // Le
        buf.freeze()
    }
}

/// A parsed card response: payload plus trailing status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload, status word excluded.
    pub data: Vec<u8>,
    /// Trailing status word.
    pub status: StatusWord,
}

impl Response {
    /// Split a raw response into payload and status word.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::Protocol("response shorter than a status word"));
        }
        let (data, status) = raw.split_at(raw.len() - 2);
        Ok(Self {
            data: data.to_vec(),
            status: StatusWord::new(status[0], status[1]),
        })
    }
}

/// ISO 7816-4 SELECT-by-DF-name frame, used as a fallback when the native
/// SelectApplication is refused (tags running in ISO mode).
pub fn iso_select_frame(aid: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(6 + aid.len());
    buf.put_u8(0x00); // CLA
    buf.put_u8(0xA4); // INS: SELECT
    buf.put_u8(0x04); // P1: by DF name
    buf.put_u8(0x0C); // P2: no FCI
    buf.put_u8(aid.len() as u8);
    buf.put_slice(aid);
    buf.put_u8(0x00); // Le
    buf.freeze()
}

/// 24-bit little-endian encoding used by file offsets and lengths.
pub(crate) fn le24(value: u32) -> [u8; 3] {
    [
        (value & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        ((value >> 16) & 0xFF) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_with_data_serializes_envelope() {
        let cmd = Command::with_data(0x71, vec![0x00, 0x00]);
        assert_eq!(
            cmd.to_bytes().as_ref(),
            &[0x90, 0x71, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn command_without_data_omits_lc() {
        let cmd = Command::new(0x60);
        assert_eq!(cmd.to_bytes().as_ref(), &[0x90, 0x60, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn response_splits_status() {
        let resp = Response::from_bytes(&[0xAA, 0xBB, 0x91, 0xAF]).unwrap();
        assert_eq!(resp.data, vec![0xAA, 0xBB]);
        assert_eq!(resp.status, StatusWord::MORE_DATA);
        assert!(resp.status.is_more_data());
        assert!(!resp.status.is_ok());
    }

    #[test]
    fn response_rejects_short_frames() {
        assert!(Response::from_bytes(&[0x91]).is_err());
    }

    #[test]
    fn status_word_displays_as_hex() {
        assert_eq!(StatusWord::new(0x91, 0x9D).to_string(), "919D");
    }

    #[test]
    fn iso_select_frame_layout() {
        let frame = iso_select_frame(&[0xD2, 0x76]);
        assert_eq!(
            frame.as_ref(),
            &[0x00, 0xA4, 0x04, 0x0C, 0x02, 0xD2, 0x76, 0x00]
        );
    }

    #[test]
    fn le24_encoding() {
        assert_eq!(le24(0x00012345), [0x45, 0x23, 0x01]);
        assert_eq!(le24(43), [0x2B, 0x00, 0x00]);
    }
}
