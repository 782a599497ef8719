//! The `Ntag424` handle: one value per card connection, owning the transport
//! and the authenticated session (when one is established).

use std::fmt;

use tracing::{debug, trace, warn};

use crate::apdu::{iso_select_frame, le24, Command, Response};
use crate::constants::{ins, AID_NTAG424_DNA};
use crate::session::Session;
use crate::transport::Transceiver;
use crate::{Error, Result};

/// Handle for one NTAG 424 DNA connection.
///
/// Commands are strictly sequential; the half-duplex transport admits no
/// pipelining. The session, when present, is replaced wholesale by
/// re-authentication and discarded on drop.
pub struct Ntag424<T: Transceiver> {
    transport: T,
    pub(crate) session: Option<Session>,
}

impl<T: Transceiver> fmt::Debug for Ntag424<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ntag424")
            .field("authenticated", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Transceiver> Ntag424<T> {
    /// Wrap a freshly connected transport.
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            session: None,
        }
    }

    /// Whether an authenticated session is established.
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// The current session, if authenticated.
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Consume the handle and return the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send one wrapped command and parse the response frame.
    pub(crate) fn transceive(&mut self, ins: u8, data: &[u8]) -> Result<Response> {
        let frame = Command::with_data(ins, data.to_vec()).to_bytes();
        trace!(">>> {}", hex::encode(&frame));
        let raw = self.transport.transceive(&frame)?;
        trace!("<<< {}", hex::encode(&raw));
        Response::from_bytes(&raw)
    }

    /// Read the full version information (three chained frames).
    pub fn get_version(&mut self) -> Result<VersionInfo> {
        let first = self.transceive(ins::GET_VERSION, &[])?;
        if !first.status.is_more_data() {
            return Err(Error::Command {
                ins: ins::GET_VERSION,
                status: first.status,
            });
        }
        let second = self.transceive(ins::ADDITIONAL_FRAME, &[])?;
        if !second.status.is_more_data() {
            return Err(Error::Protocol("GetVersion second frame rejected"));
        }
        let third = self.transceive(ins::ADDITIONAL_FRAME, &[])?;
        if !third.status.is_ok() {
            return Err(Error::Protocol("GetVersion third frame rejected"));
        }
        Ok(VersionInfo {
            hardware: first.data,
            software: second.data,
            production: third.data,
        })
    }

    /// Select the NTAG 424 DNA application.
    ///
    /// Tries the native SelectApplication first and falls back to ISO SELECT
    /// by DF name for tags in ISO mode. If both are refused the tag may
    /// already be in application context, so this is logged and tolerated.
    pub fn select_application(&mut self) -> Result<()> {
        let response = self.transceive(ins::SELECT_APPLICATION, &AID_NTAG424_DNA)?;
        if response.status.is_ok() {
            debug!("application selected (native)");
            return Ok(());
        }

        let raw = self.transport.transceive(&iso_select_frame(&AID_NTAG424_DNA))?;
        if raw.len() >= 2 && raw[raw.len() - 2] == 0x90 && raw[raw.len() - 1] == 0x00 {
            debug!("application selected (ISO)");
            return Ok(());
        }

        warn!("select application refused; assuming application context");
        Ok(())
    }

    /// Read the raw file settings of `file_no`.
    pub fn get_file_settings(&mut self, file_no: u8) -> Result<Vec<u8>> {
        let response = self.transceive(ins::GET_FILE_SETTINGS, &[file_no])?;
        if !response.status.is_ok() {
            return Err(Error::Command {
                ins: ins::GET_FILE_SETTINGS,
                status: response.status,
            });
        }
        Ok(response.data)
    }

    /// Read the version byte of a key slot. A factory-fresh tag reports 0.
    pub fn get_key_version(&mut self, key_no: u8) -> Result<u8> {
        let response = self.transceive(ins::GET_KEY_VERSION, &[key_no])?;
        if !response.status.is_ok() {
            return Err(Error::Command {
                ins: ins::GET_KEY_VERSION,
                status: response.status,
            });
        }
        Ok(response.data.first().copied().unwrap_or(0))
    }

    /// Read `length` bytes at `offset` from a file in plain communication
    /// mode, following additional frames as needed.
    pub fn read_data_plain(&mut self, file_no: u8, offset: u32, length: u32) -> Result<Vec<u8>> {
        let mut params = Vec::with_capacity(7);
        params.push(file_no);
        params.extend_from_slice(&le24(offset));
        params.extend_from_slice(&le24(length));

        let mut response = self.transceive(ins::READ_DATA, &params)?;
        if !response.status.is_ok() && !response.status.is_more_data() {
            return Err(Error::Command {
                ins: ins::READ_DATA,
                status: response.status,
            });
        }

        let mut data = response.data.clone();
        while response.status.is_more_data() {
            response = self.transceive(ins::ADDITIONAL_FRAME, &[])?;
            data.extend_from_slice(&response.data);
        }
        Ok(data)
    }
}

/// Version information reported by the GetVersion frame chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Hardware info frame.
    pub hardware: Vec<u8>,
    /// Software info frame.
    pub software: Vec<u8>,
    /// Production info frame; starts with the 7-byte UID.
    pub production: Vec<u8>,
}

impl VersionInfo {
    /// The 7-byte UID from the production frame.
    pub fn uid(&self) -> Option<[u8; 7]> {
        self.production.get(..7)?.try_into().ok()
    }

    /// UID as uppercase hex, the form used in SDM URLs and tag records.
    pub fn uid_hex(&self) -> Option<String> {
        self.uid().map(hex::encode_upper)
    }

    /// Hardware version as `major.minor`.
    pub fn hardware_version(&self) -> Option<String> {
        version_of(&self.hardware)
    }

    /// Software version as `major.minor`.
    pub fn software_version(&self) -> Option<String> {
        version_of(&self.software)
    }

    /// Storage size in bytes, decoded from the hardware frame.
    pub fn storage_size(&self) -> Option<u32> {
        let code = *self.hardware.get(5)?;
        Some(1u32 << (code >> 1))
    }

    /// Whether the hardware frame identifies an NTAG 424 DNA (NXP vendor,
    /// type 0x04, subtype 0x02).
    pub fn is_ntag424_dna(&self) -> bool {
        self.hardware.len() >= 3
            && self.hardware[0] == 0x04
            && self.hardware[1] == 0x04
            && self.hardware[2] == 0x02
    }
}

fn version_of(frame: &[u8]) -> Option<String> {
    Some(format!("{}.{}", frame.get(3)?, frame.get(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ntag424_version() -> VersionInfo {
        VersionInfo {
            hardware: vec![0x04, 0x04, 0x02, 0x30, 0x00, 0x11, 0x05],
            software: vec![0x04, 0x04, 0x02, 0x01, 0x02, 0x11, 0x05],
            production: vec![0x04, 0x8D, 0x58, 0xD2, 0x14, 0x22, 0x90, 0x00, 0x00],
        }
    }

    #[test]
    fn parses_version_frames() {
        let info = ntag424_version();
        assert!(info.is_ntag424_dna());
        assert_eq!(info.uid_hex().as_deref(), Some("048D58D2142290"));
        assert_eq!(info.hardware_version().as_deref(), Some("48.0"));
        assert_eq!(info.software_version().as_deref(), Some("1.2"));
        // Size code 0x11 -> 2^8 = 256 bytes of user memory.
        assert_eq!(info.storage_size(), Some(256));
    }

    #[test]
    fn rejects_non_ntag_hardware() {
        let mut info = ntag424_version();
        info.hardware[1] = 0x01;
        assert!(!info.is_ntag424_dna());
        info.hardware.clear();
        assert!(!info.is_ntag424_dna());
        assert_eq!(info.storage_size(), None);
    }

    #[test]
    fn short_production_frame_has_no_uid() {
        let info = VersionInfo {
            hardware: vec![],
            software: vec![],
            production: vec![0x04, 0x8D],
        };
        assert_eq!(info.uid(), None);
    }
}
