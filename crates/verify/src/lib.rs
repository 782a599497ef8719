//! Server-side verification of NTAG 424 DNA secure dynamic messaging scans.
//!
//! A programmed tag mirrors its UID, a monotonically increasing read counter
//! and a truncated CMAC into every URL it emits. This crate recomputes that
//! MAC from the keys persisted at programming time — with no session state
//! on the chip side — and enforces counter monotonicity against the stored
//! [`TagRecord`].
//!
//! The cryptography is [`dnatag_crypto`], the same crate the device-side
//! programmer uses, so the two ends cannot diverge.
//!
//! ```
//! use dnatag_verify::{ScanQuery, TagRecord, verify_scan};
//!
//! fn handle(record: &mut TagRecord, raw_url: &str) -> bool {
//!     let scan = match ScanQuery::from_url(raw_url) {
//!         Ok(scan) => scan,
//!         Err(_) => return false,
//!     };
//!     match verify_scan(record, &scan) {
//!         Ok(valid) => {
//!             // Persist atomically: the store must guard the counter with
//!             // e.g. `WHERE last_counter < :counter`.
//!             record.record_scan(valid.counter, chrono::Utc::now())
//!         }
//!         // Replay and bad MAC present the same public message.
//!         Err(err) => {
//!             tracing::warn!(%err, "scan rejected");
//!             false
//!         }
//!     }
//! }
//! ```

mod error;
mod record;
mod scan;
mod sdm;

pub use error::VerifyError;
pub use record::TagRecord;
pub use scan::ScanQuery;
pub use sdm::{
    decrypt_picc_data, derive_sdm_session_key, expected_sdm_mac, verify_scan, PiccData,
    SdmVerifier, ValidScan,
};
