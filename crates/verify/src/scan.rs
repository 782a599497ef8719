//! Query parameters extracted from a scanned SDM URL.

use url::Url;

use crate::VerifyError;

/// The SDM parameters of one scan, still hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanQuery {
    /// Plain mirroring: `?uid=<14 hex>&ctr=<6 hex>&cmac=<16 hex>`.
    Plain {
        /// Mirrored UID.
        uid: String,
        /// Mirrored read counter, most significant digit first.
        ctr: String,
        /// Truncated MAC.
        cmac: String,
    },
    /// Encrypted PICC data: `?enc=<hex>&cmac=<16 hex>`.
    Encrypted {
        /// Encrypted UID + counter blob.
        enc: String,
        /// Truncated MAC.
        cmac: String,
    },
}

impl ScanQuery {
    /// Extract the SDM parameters from a full scanned URL.
    pub fn from_url(raw: &str) -> Result<Self, VerifyError> {
        let url = Url::parse(raw).map_err(|_| VerifyError::InvalidInput("malformed URL"))?;

        let mut uid = None;
        let mut ctr = None;
        let mut cmac = None;
        let mut enc = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "uid" => uid = Some(value.into_owned()),
                "ctr" => ctr = Some(value.into_owned()),
                "cmac" => cmac = Some(value.into_owned()),
                "enc" => enc = Some(value.into_owned()),
                _ => {}
            }
        }

        match (uid, ctr, cmac, enc) {
            (Some(uid), Some(ctr), Some(cmac), None) => Ok(Self::Plain { uid, ctr, cmac }),
            (None, None, Some(cmac), Some(enc)) => Ok(Self::Encrypted { enc, cmac }),
            _ => Err(VerifyError::InvalidInput("missing SDM query parameters")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_urls() {
        let query = ScanQuery::from_url(
            "https://tags.example.com/v?uid=048D58D2142290&ctr=00000A&cmac=82E278C1118CEE2F",
        )
        .unwrap();
        assert_eq!(
            query,
            ScanQuery::Plain {
                uid: "048D58D2142290".into(),
                ctr: "00000A".into(),
                cmac: "82E278C1118CEE2F".into(),
            }
        );
    }

    #[test]
    fn parses_encrypted_urls() {
        let query = ScanQuery::from_url(
            "https://tags.example.com/v?enc=7A4D60F5098CDC5EC25D19592DD90F61&cmac=82E278C1118CEE2F",
        )
        .unwrap();
        assert!(matches!(query, ScanQuery::Encrypted { .. }));
    }

    #[test]
    fn rejects_incomplete_queries() {
        for raw in [
            "https://tags.example.com/v",
            "https://tags.example.com/v?uid=048D58D2142290&ctr=00000A",
            "https://tags.example.com/v?enc=00",
            "not a url",
        ] {
            assert!(ScanQuery::from_url(raw).is_err(), "{raw}");
        }
    }
}
