//! CRC-32 in the JAMCRC variant used by NXP DESFire/NTAG 424 DNA key-change
//! commands: reflected polynomial `0xEDB88320`, initial value `0xFFFFFFFF`,
//! and no final inversion.

/// Compute the JAMCRC of `data` as the 4 little-endian bytes the ChangeKey
/// command expects.
pub fn crc32_jamcrc(data: &[u8]) -> [u8; 4] {
    crc32_reflected(data).to_le_bytes()
}

/// Standard CRC-32 (with the final inversion), kept for diagnostics and for
/// cross-checking the JAMCRC variant.
pub fn crc32(data: &[u8]) -> u32 {
    crc32_reflected(data) ^ 0xFFFF_FFFF
}

fn crc32_reflected(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        // CRC-32/ISO-HDLC check value for "123456789"; JAMCRC is its inverse.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32_jamcrc(b"123456789"), 0x340B_C6D9u32.to_le_bytes());
    }

    #[test]
    fn jamcrc_is_inverted_crc32() {
        for data in [&b""[..], b"\x00", b"dnatag", &[0xFFu8; 16]] {
            let jam = u32::from_le_bytes(crc32_jamcrc(data));
            assert_eq!(jam, !crc32(data));
        }
    }
}
