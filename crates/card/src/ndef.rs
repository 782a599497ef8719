//! NDEF URI records and the SDM placeholder template.
//!
//! The template couples two things that must never drift apart: the
//! placeholder URL written into the NDEF file and the byte offsets baked
//! into the file settings. The hardware mirrors UID/counter/MAC at those
//! offsets, so an off-by-one here produces URLs that never verify.

/// NFC Forum URI prefix codes, longest match first.
const URI_PREFIXES: &[(u8, &str)] = &[
    (0x02, "https://www."),
    (0x01, "http://www."),
    (0x04, "https://"),
    (0x03, "http://"),
];

/// Zero placeholder for the 7-byte UID mirror (14 hex characters).
const UID_PLACEHOLDER: &str = "00000000000000";
/// Zero placeholder for the 3-byte read counter mirror (6 hex characters).
const CTR_PLACEHOLDER: &str = "000000";
/// Zero placeholder for the 8-byte truncated MAC (16 hex characters).
const MAC_PLACEHOLDER: &str = "0000000000000000";

/// Split a URL into its URI prefix code and the remainder stored in the
/// record body. Unrecognized schemes use code 0x00 (no abbreviation).
pub fn split_uri_prefix(url: &str) -> (u8, &str) {
    for (code, prefix) in URI_PREFIXES {
        if let Some(rest) = url.strip_prefix(prefix) {
            return (*code, rest);
        }
    }
    (0x00, url)
}

/// Build the NDEF file content for a URI record: 2-byte big-endian message
/// length, then a short record `D1 01 <len> 55 <prefix code> <body>`.
pub fn build_ndef_url_record(url: &str) -> Vec<u8> {
    let (code, body) = split_uri_prefix(url);
    let payload_len = 1 + body.len();
    let message_len = 3 + payload_len;

    let mut out = Vec::with_capacity(2 + message_len);
    out.push((message_len >> 8) as u8);
    out.push((message_len & 0xFF) as u8);
    out.push(0xD1); // MB|ME|SR, TNF well-known
    out.push(0x01); // type length
    out.push(payload_len as u8);
    out.push(0x55); // type 'U'
    out.push(code);
    out.extend_from_slice(body.as_bytes());
    out
}

/// Parse the URL back out of an NDEF file image, tolerantly.
pub fn parse_ndef_url(data: &[u8]) -> Option<String> {
    if data.len() < 7 || data[2] & 0xD0 != 0xD0 || data[5] != 0x55 {
        return None;
    }
    let payload_len = data[4] as usize;
    let prefix = URI_PREFIXES
        .iter()
        .find(|(code, _)| *code == data[6])
        .map_or("", |(_, prefix)| *prefix);
    let end = (6 + payload_len).min(data.len());
    let body = std::str::from_utf8(&data[7..end]).ok()?;
    Some(format!("{prefix}{body}"))
}

/// Byte offsets of the mirrored fields inside the NDEF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdmOffsets {
    /// Start of the 14-hex-character UID mirror.
    pub uid: u32,
    /// Start of the 6-hex-character read counter mirror.
    pub ctr: u32,
    /// Start of the 16-hex-character MAC mirror.
    pub mac: u32,
}

/// An SDM URL template for a given base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdmUrlTemplate {
    base_url: String,
}

impl SdmUrlTemplate {
    /// Create a template over `base_url` (no trailing query expected).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// The base URL this template was built from.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The full URL with zeroed placeholders, as written to the tag.
    pub fn placeholder_url(&self) -> String {
        format!(
            "{}?uid={UID_PLACEHOLDER}&ctr={CTR_PLACEHOLDER}&cmac={MAC_PLACEHOLDER}",
            self.base_url
        )
    }

    /// The NDEF file content holding the placeholder URL.
    pub fn ndef_record(&self) -> Vec<u8> {
        build_ndef_url_record(&self.placeholder_url())
    }

    /// Mirror offsets within the NDEF file.
    ///
    /// These must land exactly on the placeholder positions inside
    /// [`Self::ndef_record`]; the file header (2-byte length, record header,
    /// type, payload length, type byte, prefix code) occupies the first 7
    /// bytes, and the URI prefix is abbreviated out of the stored body.
    pub fn offsets(&self) -> SdmOffsets {
        let (_, stripped) = split_uri_prefix(&self.base_url);
        let header = 7u32;
        let uid = header + stripped.len() as u32 + 5; // "?uid="
        let ctr = uid + UID_PLACEHOLDER.len() as u32 + 5; // "&ctr="
        let mac = ctr + CTR_PLACEHOLDER.len() as u32 + 6; // "&cmac="
        SdmOffsets { uid, ctr, mac }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_known_prefixes() {
        assert_eq!(split_uri_prefix("https://www.example.com"), (0x02, "example.com"));
        assert_eq!(split_uri_prefix("http://www.example.com"), (0x01, "example.com"));
        assert_eq!(split_uri_prefix("https://tags.example.com/t"), (0x04, "tags.example.com/t"));
        assert_eq!(split_uri_prefix("http://example.com"), (0x03, "example.com"));
        assert_eq!(split_uri_prefix("ftp://example.com"), (0x00, "ftp://example.com"));
    }

    #[test]
    fn record_layout() {
        let record = build_ndef_url_record("https://example.com/x");
        // body "example.com/x" (13 bytes), payload 14, message 17
        assert_eq!(&record[..2], &[0x00, 17]);
        assert_eq!(record[2], 0xD1);
        assert_eq!(record[3], 0x01);
        assert_eq!(record[4], 14);
        assert_eq!(record[5], 0x55);
        assert_eq!(record[6], 0x04);
        assert_eq!(&record[7..], b"example.com/x");
    }

    #[test]
    fn record_round_trips_through_parse() {
        for url in [
            "https://example.com/t",
            "https://www.example.com",
            "http://example.com/a/b",
            "gopher://example.com",
        ] {
            let record = build_ndef_url_record(url);
            assert_eq!(parse_ndef_url(&record).as_deref(), Some(url));
        }
    }

    #[test]
    fn parse_rejects_non_uri_records() {
        assert_eq!(parse_ndef_url(&[]), None);
        // Type byte is not 'U'.
        let mut record = build_ndef_url_record("https://example.com");
        record[5] = 0x54;
        assert_eq!(parse_ndef_url(&record), None);
    }

    #[test]
    fn offsets_land_on_placeholders() {
        for base in [
            "https://tags.example.com/v",
            "https://www.example.com/verify",
            "http://e.co",
        ] {
            let template = SdmUrlTemplate::new(base);
            let record = template.ndef_record();
            let offsets = template.offsets();

            let uid = offsets.uid as usize;
            let ctr = offsets.ctr as usize;
            let mac = offsets.mac as usize;
            assert_eq!(&record[uid..uid + 14], UID_PLACEHOLDER.as_bytes(), "{base}");
            assert_eq!(&record[ctr..ctr + 6], CTR_PLACEHOLDER.as_bytes(), "{base}");
            assert_eq!(&record[mac..mac + 16], MAC_PLACEHOLDER.as_bytes(), "{base}");
            // MAC mirror runs to the end of the record.
            assert_eq!(record.len(), mac + 16);
        }
    }
}
