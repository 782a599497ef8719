//! Session state established by a successful AuthenticateEV2First.
//!
//! The card and reader each derive two session keys from the authentication
//! key and the exchanged randoms. Both ends must assemble the session
//! vectors byte-for-byte identically or every subsequent MAC fails.

use dnatag_crypto::block::{encrypt_block, Block};
use dnatag_crypto::{AesKey, CmacAes};

/// Keys, transaction identifier and command counter for one authenticated
/// session. Dropped (and the keys zeroized) when the link closes or a new
/// handshake begins.
pub struct Session {
    key_enc: AesKey,
    key_mac: AesKey,
    ti: [u8; 4],
    cmd_counter: u16,
    key_no: u8,
}

impl Session {
    pub(crate) fn new(key: &AesKey, key_no: u8, ti: [u8; 4], rnd_a: &Block, rnd_b: &Block) -> Self {
        let (key_enc, key_mac) = derive_session_keys(key, rnd_a, rnd_b);
        Self {
            key_enc,
            key_mac,
            ti,
            cmd_counter: 0,
            key_no,
        }
    }

    pub(crate) const fn key_enc(&self) -> &AesKey {
        &self.key_enc
    }

    pub(crate) const fn key_mac(&self) -> &AesKey {
        &self.key_mac
    }

    /// Transaction identifier assigned by the card for this session.
    pub const fn ti(&self) -> &[u8; 4] {
        &self.ti
    }

    /// Number of authenticated commands sent so far.
    pub const fn cmd_counter(&self) -> u16 {
        self.cmd_counter
    }

    /// Key slot this session authenticated with.
    pub const fn key_no(&self) -> u8 {
        self.key_no
    }

    /// Advance the command counter by one. Never decremented; overflow would
    /// desynchronize from the card long before wrapping, so sessions are
    /// re-established instead.
    pub(crate) fn bump_counter(&mut self) {
        self.cmd_counter = self.cmd_counter.wrapping_add(1);
    }

    /// Derive the CBC IV for application-data encryption or decryption:
    /// `prefix ‖ TI ‖ counter(LE) ‖ zeros`, encrypted once in ECB under the
    /// session encryption key.
    pub(crate) fn derive_iv(&self, prefix: [u8; 2]) -> Block {
        let mut iv = [0u8; 16];
        iv[..2].copy_from_slice(&prefix);
        iv[2..6].copy_from_slice(&self.ti);
        iv[6..8].copy_from_slice(&self.cmd_counter.to_le_bytes());
        encrypt_block(&self.key_enc, &mut iv);
        iv
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("ti", &hex::encode(self.ti))
            .field("cmd_counter", &self.cmd_counter)
            .field("key_no", &self.key_no)
            .finish_non_exhaustive()
    }
}

/// Assemble one 32-byte session vector.
///
/// Layout: `prefix(2) ‖ 00 01 ‖ 00 80 ‖ RndA[0..2] ‖ (RndA[2..8] XOR
/// RndB[0..6]) ‖ RndB[6..16] ‖ RndA[8..16]`. SV1 uses prefix `A5 5A`, SV2
/// uses `5A A5`; nothing else differs.
fn session_vector(prefix: [u8; 2], rnd_a: &Block, rnd_b: &Block) -> [u8; 32] {
    let mut sv = [0u8; 32];
    sv[..2].copy_from_slice(&prefix);
    sv[2..6].copy_from_slice(&[0x00, 0x01, 0x00, 0x80]);
    sv[6] = rnd_a[0];
    sv[7] = rnd_a[1];
    for i in 0..6 {
        sv[8 + i] = rnd_a[2 + i] ^ rnd_b[i];
    }
    sv[14..24].copy_from_slice(&rnd_b[6..16]);
    sv[24..32].copy_from_slice(&rnd_a[8..16]);
    sv
}

/// Derive `(sessionKeyEnc, sessionKeyMac)` as the full-width CMACs of SV1
/// and SV2 under the authentication key.
pub(crate) fn derive_session_keys(key: &AesKey, rnd_a: &Block, rnd_b: &Block) -> (AesKey, AesKey) {
    let cmac = CmacAes::new(key);
    let sv1 = session_vector([0xA5, 0x5A], rnd_a, rnd_b);
    let sv2 = session_vector([0x5A, 0xA5], rnd_a, rnd_b);
    (AesKey::new(cmac.mac(&sv1)), AesKey::new(cmac.mac(&sv2)))
}

#[cfg(test)]
mod tests {
    use cmac::{Cmac, Mac};
    use hex_literal::hex;

    use super::*;

    fn sample_randoms() -> (Block, Block) {
        (
            core::array::from_fn(|i| i as u8),
            core::array::from_fn(|i| 0x10 + i as u8),
        )
    }

    #[test]
    fn sv1_layout_matches_reference_bytes() {
        let (rnd_a, rnd_b) = sample_randoms();
        let sv1 = session_vector([0xA5, 0x5A], &rnd_a, &rnd_b);
        assert_eq!(
            sv1,
            hex!("a55a000100800001121216161212161718191a1b1c1d1e1f08090a0b0c0d0e0f")
        );
    }

    #[test]
    fn sv2_differs_only_in_prefix() {
        let (rnd_a, rnd_b) = sample_randoms();
        let sv1 = session_vector([0xA5, 0x5A], &rnd_a, &rnd_b);
        let sv2 = session_vector([0x5A, 0xA5], &rnd_a, &rnd_b);
        assert_eq!(sv2[0], 0x5A);
        assert_eq!(sv2[1], 0xA5);
        assert_eq!(sv1[2..], sv2[2..]);
    }

    #[test]
    fn session_keys_match_independent_cmac() {
        // The cross-implementation check: the same vectors fed to the
        // RustCrypto `cmac` crate must give the same session keys.
        let key = AesKey::new([0u8; 16]);
        let (rnd_a, rnd_b) = sample_randoms();
        let (enc, mac) = derive_session_keys(&key, &rnd_a, &rnd_b);

        for (sv_prefix, derived) in [([0xA5, 0x5A], enc), ([0x5A, 0xA5], mac)] {
            let sv = session_vector(sv_prefix, &rnd_a, &rnd_b);
            let mut reference =
                <Cmac<aes::Aes128> as Mac>::new_from_slice(key.as_bytes()).unwrap();
            reference.update(&sv);
            assert_eq!(derived.as_bytes()[..], reference.finalize().into_bytes()[..]);
        }
    }

    #[test]
    fn derive_iv_is_counter_dependent() {
        let key = AesKey::new([7u8; 16]);
        let (rnd_a, rnd_b) = sample_randoms();
        let mut session = Session::new(&key, 0, [1, 2, 3, 4], &rnd_a, &rnd_b);
        let iv0 = session.derive_iv([0xA5, 0x5A]);
        session.bump_counter();
        let iv1 = session.derive_iv([0xA5, 0x5A]);
        assert_ne!(iv0, iv1);
        // Direction prefixes must also diverge.
        assert_ne!(session.derive_iv([0xA5, 0x5A]), session.derive_iv([0x5A, 0xA5]));
    }
}
