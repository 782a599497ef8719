//! Device-side protocol stack for programming NTAG 424 DNA tags.
//!
//! The crate is written against a one-method [`Transceiver`] contract —
//! "send raw command bytes, get raw response bytes" — and provides
//! everything above it:
//!
//! - the fixed APDU envelope and status words ([`apdu`]),
//! - the AuthenticateEV2First handshake and session key derivation,
//! - MAC-tagged and encrypted authenticated commands (ChangeKey, WriteData,
//!   ChangeFileSettings),
//! - the NDEF/SDM placeholder template with its mirror offsets ([`ndef`]),
//! - high-level provisioning and factory-reset flows with progress events.
//!
//! All cryptography comes from [`dnatag_crypto`], the same crate the
//! server-side verifier uses, so both ends of the protocol share one
//! implementation of every primitive.
//!
//! ```no_run
//! use dnatag_card::{Ntag424, ProvisionConfig, Transceiver};
//!
//! fn program(transport: impl Transceiver) -> dnatag_card::Result<()> {
//!     let mut tag = Ntag424::new(transport);
//!     let provisioned = tag.provision(
//!         &ProvisionConfig::new("https://tags.example.com/v"),
//!         |p| tracing::info!(stage = %p.stage, percent = p.percent),
//!     )?;
//!     // Persist the UID and the three keys; they cannot be recovered later.
//!     let _ = provisioned.uid;
//!     Ok(())
//! }
//! ```

pub mod apdu;
pub mod constants;
mod error;
pub mod file_settings;
pub mod ndef;
mod provision;
mod secure_channel;
mod session;
mod tag;
mod transport;

pub use apdu::{Command, Response, StatusWord};
pub use error::{AuthFailure, Error, Result};
pub use provision::{
    Progress, ProvisionConfig, ProvisionedTag, Stage, TagInfo, TagKeys,
};
pub use session::Session;
pub use tag::{Ntag424, VersionInfo};
pub use transport::{Transceiver, TransportError};
