//! The persisted record for one programmed tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted state for one programmed tag.
///
/// Keys are stored as 32-character hex strings, exactly as the programming
/// flow reported them; they cannot be re-derived if lost. `last_counter`
/// only ever increases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRecord {
    /// 7-byte UID, uppercase hex (14 characters).
    pub uid: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Application master key, hex.
    pub app_master_key: String,
    /// SDM meta read key, hex. Decrypts encrypted PICC data blobs.
    pub sdm_meta_read_key: String,
    /// SDM file read key, hex. Derives the per-scan MAC session key.
    pub sdm_file_read_key: String,
    /// Last accepted read counter; scans at or below it are replays.
    pub last_counter: u32,
    /// Number of accepted scans.
    pub scan_count: i64,
    /// Time of the last accepted scan.
    pub last_scan_at: Option<DateTime<Utc>>,
    /// Time the tag was registered.
    pub created_at: DateTime<Utc>,
}

impl TagRecord {
    /// Apply a successfully verified scan: advance the counter and the scan
    /// statistics. Returns `false` (and changes nothing) if `counter` is not
    /// strictly greater than the stored one.
    ///
    /// The backing store must apply the equivalent update atomically — a
    /// conditional `WHERE last_counter < :counter` or similar — so that two
    /// concurrent scans of the same captured URL cannot both pass.
    pub fn record_scan(&mut self, counter: u32, at: DateTime<Utc>) -> bool {
        if counter <= self.last_counter {
            return false;
        }
        self.last_counter = counter;
        self.scan_count += 1;
        self.last_scan_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TagRecord {
        TagRecord {
            uid: "048D58D2142290".into(),
            name: None,
            app_master_key: "0".repeat(32),
            sdm_meta_read_key: "0".repeat(32),
            sdm_file_read_key: "0".repeat(32),
            last_counter: 10,
            scan_count: 3,
            last_scan_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn record_scan_is_monotonic() {
        let mut rec = record();
        let now = Utc::now();

        assert!(!rec.record_scan(10, now), "equal counter is a replay");
        assert!(!rec.record_scan(9, now), "lower counter is a replay");
        assert_eq!((rec.last_counter, rec.scan_count), (10, 3));

        assert!(rec.record_scan(11, now));
        assert_eq!((rec.last_counter, rec.scan_count), (11, 4));
        assert_eq!(rec.last_scan_at, Some(now));
    }
}
