//! AuthenticateEV2First and the authenticated command channel built on its
//! session keys.
//!
//! The handshake is strictly sequential with no retry inside it: any failed
//! step voids the attempt and a new one starts from the first frame with a
//! fresh RndA.

use bytes::{BufMut, BytesMut};
use rand::RngCore;
use tracing::{debug, warn};

use dnatag_crypto::block::{xor16, Block};
use dnatag_crypto::cbc::{decrypt_cbc, encrypt_cbc, pad_to_block_size, remove_padding, ZERO_IV};
use dnatag_crypto::crc32::crc32_jamcrc;
use dnatag_crypto::{AesKey, CmacAes};

use crate::apdu::le24;
use crate::constants::ins;
use crate::error::AuthFailure;
use crate::session::Session;
use crate::tag::Ntag424;
use crate::transport::Transceiver;
use crate::{Error, Result};

/// IV direction prefix for command (encrypt) data.
const IV_PREFIX_COMMAND: [u8; 2] = [0xA5, 0x5A];
/// IV direction prefix for response (decrypt) data.
const IV_PREFIX_RESPONSE: [u8; 2] = [0x5A, 0xA5];

impl<T: Transceiver> Ntag424<T> {
    /// Run AuthenticateEV2First against key slot `key_no` with `key`.
    ///
    /// On success the handle holds a fresh session (keys, TI, counter 0) and
    /// authenticated commands become available. On any failure the previous
    /// session, if one existed, is gone as well: the card voids its own
    /// session state the moment a new handshake starts.
    pub fn authenticate_ev2_first(&mut self, key_no: u8, key: &AesKey) -> Result<()> {
        self.session = None;

        // Frame 1: select key slot, request AES-128 mode.
        let first = self.transceive(ins::AUTHENTICATE_EV2_FIRST, &[key_no, 0x00])?;
        if !first.status.is_more_data() {
            warn!(key_no, status = %first.status, "AuthenticateEV2First refused");
            return Err(Error::Auth(AuthFailure::FirstFrameRejected));
        }
        if first.data.len() != 16 {
            return Err(Error::Protocol("EncRndB must be exactly 16 bytes"));
        }

        let mut rnd_b: Block = [0u8; 16];
        rnd_b.copy_from_slice(&decrypt_cbc(key, &ZERO_IV, &first.data)?);

        let mut rnd_a: Block = [0u8; 16];
        rand::rng().fill_bytes(&mut rnd_a);

        // Frame 2: E(RndA ‖ RndB rotated left one byte), zero IV.
        let mut challenge = [0u8; 32];
        challenge[..16].copy_from_slice(&rnd_a);
        challenge[16..].copy_from_slice(&rotate_left(&rnd_b));
        let enc_challenge = encrypt_cbc(key, &ZERO_IV, &challenge)?;

        let second = self.transceive(ins::ADDITIONAL_FRAME, &enc_challenge)?;
        if !second.status.is_ok() {
            // The primary observable signal of a wrong key.
            warn!(key_no, status = %second.status, "card rejected challenge");
            return Err(Error::Auth(AuthFailure::KeyRejected));
        }
        if second.data.len() < 32 {
            return Err(Error::Protocol("authentication response shorter than 32 bytes"));
        }

        // Response: E(TI ‖ RndA' ‖ PDcap2 ‖ PCDcap2), zero IV.
        let plain = decrypt_cbc(key, &ZERO_IV, &second.data)?;
        let mut ti = [0u8; 4];
        ti.copy_from_slice(&plain[..4]);

        if plain[4..20] != rotate_left(&rnd_a)[..] {
            warn!(key_no, "rotated RndA mismatch");
            return Err(Error::Auth(AuthFailure::ChallengeMismatch));
        }

        self.session = Some(Session::new(key, key_no, ti, &rnd_a, &rnd_b));
        debug!(key_no, ti = %hex::encode(ti), "authenticated");
        Ok(())
    }

    /// Build the payload for a MAC-tagged command: `data ‖ truncated CMAC`
    /// over `cmd ‖ counter(LE) ‖ TI ‖ data` under the session MAC key.
    pub fn build_mac_command(&self, ins: u8, data: &[u8]) -> Result<Vec<u8>> {
        let session = self.require_session()?;

        let mut mac_input = BytesMut::with_capacity(7 + data.len());
        mac_input.put_u8(ins);
        mac_input.put_u16_le(session.cmd_counter());
        mac_input.put_slice(session.ti());
        mac_input.put_slice(data);

        let mac = CmacAes::new(session.key_mac()).mac_truncated(&mac_input);

        let mut payload = Vec::with_capacity(data.len() + mac.len());
        payload.extend_from_slice(data);
        payload.extend_from_slice(&mac);
        Ok(payload)
    }

    /// Send a MAC-tagged command and return the response payload.
    ///
    /// The command counter advances by exactly one for every frame the card
    /// saw, including frames it answered with an error status — the card's
    /// own counter has moved, and diverging from it would invalidate every
    /// later MAC until re-authentication.
    pub fn send_mac_command(&mut self, ins: u8, data: &[u8]) -> Result<Vec<u8>> {
        let payload = self.build_mac_command(ins, data)?;
        let response = self.transceive(ins, &payload)?;

        if let Some(session) = self.session.as_mut() {
            session.bump_counter();
        }

        if !response.status.is_ok() {
            return Err(Error::Command {
                ins,
                status: response.status,
            });
        }
        Ok(response.data)
    }

    /// Encrypt application data for the current command: 0x80-pad, then CBC
    /// under the session encryption key with the derived command IV.
    pub fn encrypt_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let session = self.require_session()?;
        let iv = session.derive_iv(IV_PREFIX_COMMAND);
        Ok(encrypt_cbc(session.key_enc(), &iv, &pad_to_block_size(data))?)
    }

    /// Decrypt response data with the derived response IV and strip the
    /// 0x80 padding.
    pub fn decrypt_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let session = self.require_session()?;
        let iv = session.derive_iv(IV_PREFIX_RESPONSE);
        let plain = decrypt_cbc(session.key_enc(), &iv, data)?;
        Ok(remove_padding(&plain).to_vec())
    }

    /// Change the key in slot `key_no`.
    ///
    /// Changing the slot this session authenticated with needs only the new
    /// key and version; any other slot proves knowledge of the old key by
    /// sending `(new XOR old) ‖ version ‖ JAMCRC(new)`.
    pub fn change_key(
        &mut self,
        key_no: u8,
        old_key: &AesKey,
        new_key: &AesKey,
        key_version: u8,
    ) -> Result<()> {
        let session = self.require_session()?;

        let mut plain = Vec::with_capacity(21);
        if key_no == session.key_no() {
            plain.extend_from_slice(new_key.as_bytes());
            plain.push(key_version);
        } else {
            plain.extend_from_slice(&xor16(new_key.as_bytes(), old_key.as_bytes()));
            plain.push(key_version);
            plain.extend_from_slice(&crc32_jamcrc(new_key.as_bytes()));
        }

        let encrypted = self.encrypt_data(&plain)?;

        let mut cmd_data = Vec::with_capacity(1 + encrypted.len());
        cmd_data.push(key_no);
        cmd_data.extend_from_slice(&encrypted);

        self.send_mac_command(ins::CHANGE_KEY, &cmd_data)?;
        debug!(key_no, "key changed");
        Ok(())
    }

    /// Write `data` into a file at `offset` (MAC communication mode).
    pub fn write_data(&mut self, file_no: u8, offset: u32, data: &[u8]) -> Result<()> {
        let mut cmd_data = Vec::with_capacity(7 + data.len());
        cmd_data.push(file_no);
        cmd_data.extend_from_slice(&le24(offset));
        cmd_data.extend_from_slice(&le24(data.len() as u32));
        cmd_data.extend_from_slice(data);
        self.send_mac_command(ins::WRITE_DATA, &cmd_data)?;
        Ok(())
    }

    /// Replace the settings of `file_no` with a prebuilt settings payload.
    pub fn change_file_settings(&mut self, file_no: u8, settings: &[u8]) -> Result<()> {
        let mut cmd_data = Vec::with_capacity(1 + settings.len());
        cmd_data.push(file_no);
        cmd_data.extend_from_slice(settings);
        self.send_mac_command(ins::CHANGE_FILE_SETTINGS, &cmd_data)?;
        Ok(())
    }

    fn require_session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::NotAuthenticated)
    }
}

/// Rotate a block left by one byte (byte 0 moves to the end).
pub(crate) fn rotate_left(block: &Block) -> Block {
    let mut out = [0u8; 16];
    out[..15].copy_from_slice(&block[1..]);
    out[15] = block[0];
    out
}
