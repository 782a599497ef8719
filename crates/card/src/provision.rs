//! Long-running tag flows: inspection, provisioning and factory reset.
//!
//! Both multi-step flows report discrete checkpoints through an observer
//! callback. Callers run them on whatever worker thread suits their UI;
//! cancellation happens physically — removing the tag fails the next
//! exchange with a transport error.

use std::fmt;

use tracing::{debug, warn};

use dnatag_crypto::AesKey;

use crate::constants::{file, key_slot, FACTORY_KEY};
use crate::file_settings::{factory_default_settings, sdm_plain_mirror_settings};
use crate::ndef::{parse_ndef_url, SdmUrlTemplate};
use crate::tag::Ntag424;
use crate::transport::Transceiver;
use crate::{Error, Result};

/// Stages reported while a flow runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading version frames and selecting the application.
    Identifying,
    /// Running AuthenticateEV2First.
    Authenticating,
    /// Writing the SDM mirror configuration.
    ConfiguringSdm,
    /// Writing the placeholder NDEF record.
    WritingNdef,
    /// Rotating SDM and master keys to their new values.
    RotatingKeys,
    /// Restoring factory keys.
    RestoringKeys,
    /// Disabling SDM mirroring.
    DisablingSdm,
    /// Clearing the NDEF file.
    ClearingNdef,
    /// Flow finished.
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identifying => "identifying tag",
            Self::Authenticating => "authenticating",
            Self::ConfiguringSdm => "configuring SDM",
            Self::WritingNdef => "writing NDEF data",
            Self::RotatingKeys => "changing keys",
            Self::RestoringKeys => "restoring factory keys",
            Self::DisablingSdm => "disabling SDM",
            Self::ClearingNdef => "clearing NDEF data",
            Self::Complete => "complete",
        })
    }
}

/// One progress checkpoint: stage plus percentage complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Current stage.
    pub stage: Stage,
    /// Percentage complete, 0–100.
    pub percent: u8,
}

/// Configuration for provisioning one tag.
///
/// Keys left as `None` are generated randomly; all final keys are returned
/// in [`ProvisionedTag`] and must be persisted — they cannot be re-derived.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Base URL the SDM query parameters are appended to.
    pub base_url: String,
    /// Master key currently on the tag; factory key when `None`.
    pub current_key: Option<AesKey>,
    /// New application master key.
    pub app_master_key: Option<AesKey>,
    /// New SDM meta read key.
    pub sdm_meta_read_key: Option<AesKey>,
    /// New SDM file read key.
    pub sdm_file_read_key: Option<AesKey>,
}

impl ProvisionConfig {
    /// Configuration with a base URL, factory current key and random new
    /// keys.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            current_key: None,
            app_master_key: None,
            sdm_meta_read_key: None,
            sdm_file_read_key: None,
        }
    }
}

/// Everything to persist after a successful provisioning run.
///
/// Losing these keys leaves only the physical factory-reset path; there is
/// no way to re-derive them from the tag.
#[derive(Debug, Clone)]
pub struct ProvisionedTag {
    /// Tag UID, uppercase hex.
    pub uid: String,
    /// Final application master key.
    pub app_master_key: AesKey,
    /// Final SDM meta read key.
    pub sdm_meta_read_key: AesKey,
    /// Final SDM file read key.
    pub sdm_file_read_key: AesKey,
    /// Base URL programmed into the tag.
    pub base_url: String,
}

/// The keys currently on a provisioned tag, needed for a factory reset.
#[derive(Debug, Clone)]
pub struct TagKeys {
    /// Application master key.
    pub app_master_key: AesKey,
    /// SDM meta read key.
    pub sdm_meta_read_key: AesKey,
    /// SDM file read key.
    pub sdm_file_read_key: AesKey,
}

/// Summary of an unauthenticated tag inspection.
#[derive(Debug, Clone, Default)]
pub struct TagInfo {
    /// Tag UID, uppercase hex, from the version frames.
    pub uid: Option<String>,
    /// Hardware version.
    pub hardware_version: Option<String>,
    /// Software version.
    pub software_version: Option<String>,
    /// User memory size in bytes.
    pub storage_size: Option<u32>,
    /// Master key version byte, if readable.
    pub key_version: Option<u8>,
    /// Whether the master key version reads as factory (0).
    pub has_factory_keys: bool,
    /// URL currently in the NDEF file, if any.
    pub ndef_url: Option<String>,
}

impl<T: Transceiver> Ntag424<T> {
    /// Inspect a tag without authenticating.
    pub fn read_tag_info(&mut self) -> Result<TagInfo> {
        let version = self.get_version()?;
        if !version.is_ntag424_dna() {
            return Err(Error::UnsupportedTag);
        }
        self.select_application()?;

        let key_version = match self.get_key_version(key_slot::APP_MASTER) {
            Ok(v) => Some(v),
            Err(err) => {
                warn!(%err, "could not read master key version");
                None
            }
        };

        let ndef_url = self
            .read_data_plain(file::NDEF, 0, 256)
            .ok()
            .and_then(|data| parse_ndef_url(&data));

        Ok(TagInfo {
            uid: version.uid_hex(),
            hardware_version: version.hardware_version(),
            software_version: version.software_version(),
            storage_size: version.storage_size(),
            key_version,
            has_factory_keys: key_version == Some(0),
            ndef_url,
        })
    }

    /// Program a tag: configure SDM, write the placeholder NDEF record and
    /// rotate all three keys.
    ///
    /// SDM configuration and the NDEF write run first, under the current
    /// master key — they exercise the MAC path before anything irreversible
    /// happens. The master key itself changes last, so a failure partway
    /// through leaves the tag reachable with the old key.
    pub fn provision(
        &mut self,
        config: &ProvisionConfig,
        mut progress: impl FnMut(Progress),
    ) -> Result<ProvisionedTag> {
        progress(Progress { stage: Stage::Identifying, percent: 5 });
        let version = self.get_version()?;
        if !version.is_ntag424_dna() {
            return Err(Error::UnsupportedTag);
        }
        self.select_application()?;
        let uid = version
            .uid_hex()
            .ok_or(Error::Protocol("GetVersion production frame too short"))?;
        debug!(%uid, "provisioning tag");

        progress(Progress { stage: Stage::Authenticating, percent: 15 });
        let factory = AesKey::new(FACTORY_KEY);
        let current = config.current_key.clone().unwrap_or_else(|| factory.clone());
        self.authenticate_ev2_first(key_slot::APP_MASTER, &current)?;

        let master = config.app_master_key.clone().unwrap_or_else(AesKey::random);
        let meta_read = config.sdm_meta_read_key.clone().unwrap_or_else(AesKey::random);
        let file_read = config.sdm_file_read_key.clone().unwrap_or_else(AesKey::random);

        progress(Progress { stage: Stage::ConfiguringSdm, percent: 30 });
        let template = SdmUrlTemplate::new(config.base_url.clone());
        self.change_file_settings(file::NDEF, &sdm_plain_mirror_settings(template.offsets()))?;

        progress(Progress { stage: Stage::WritingNdef, percent: 45 });
        self.write_data(file::NDEF, 0, &template.ndef_record())?;

        // Fresh session before touching key material.
        progress(Progress { stage: Stage::Authenticating, percent: 55 });
        self.authenticate_ev2_first(key_slot::APP_MASTER, &current)?;

        progress(Progress { stage: Stage::RotatingKeys, percent: 65 });
        self.change_key(key_slot::SDM_META_READ, &factory, &meta_read, 0x01)?;

        progress(Progress { stage: Stage::RotatingKeys, percent: 75 });
        self.change_key(key_slot::SDM_FILE_READ, &factory, &file_read, 0x01)?;

        progress(Progress { stage: Stage::RotatingKeys, percent: 85 });
        self.authenticate_ev2_first(key_slot::APP_MASTER, &current)?;
        self.change_key(key_slot::APP_MASTER, &current, &master, 0x01)?;

        progress(Progress { stage: Stage::Complete, percent: 100 });
        Ok(ProvisionedTag {
            uid,
            app_master_key: master,
            sdm_meta_read_key: meta_read,
            sdm_file_read_key: file_read,
            base_url: config.base_url.clone(),
        })
    }

    /// Restore a provisioned tag to factory state: factory keys, SDM off,
    /// NDEF cleared. Needs every current key; the master key reverts last.
    pub fn factory_reset(
        &mut self,
        keys: &TagKeys,
        mut progress: impl FnMut(Progress),
    ) -> Result<()> {
        progress(Progress { stage: Stage::Identifying, percent: 5 });
        let version = self.get_version()?;
        if !version.is_ntag424_dna() {
            return Err(Error::UnsupportedTag);
        }
        self.select_application()?;

        progress(Progress { stage: Stage::Authenticating, percent: 15 });
        let factory = AesKey::new(FACTORY_KEY);
        self.authenticate_ev2_first(key_slot::APP_MASTER, &keys.app_master_key)?;

        progress(Progress { stage: Stage::RestoringKeys, percent: 30 });
        self.change_key(key_slot::SDM_META_READ, &keys.sdm_meta_read_key, &factory, 0x00)?;

        progress(Progress { stage: Stage::RestoringKeys, percent: 45 });
        self.change_key(key_slot::SDM_FILE_READ, &keys.sdm_file_read_key, &factory, 0x00)?;

        progress(Progress { stage: Stage::Authenticating, percent: 55 });
        self.authenticate_ev2_first(key_slot::APP_MASTER, &keys.app_master_key)?;

        progress(Progress { stage: Stage::DisablingSdm, percent: 65 });
        self.change_file_settings(file::NDEF, &factory_default_settings())?;

        progress(Progress { stage: Stage::ClearingNdef, percent: 75 });
        self.write_data(file::NDEF, 0, &[0x00, 0x00])?;

        progress(Progress { stage: Stage::RestoringKeys, percent: 90 });
        self.authenticate_ev2_first(key_slot::APP_MASTER, &keys.app_master_key)?;
        self.change_key(key_slot::APP_MASTER, &keys.app_master_key, &factory, 0x00)?;

        progress(Progress { stage: Stage::Complete, percent: 100 });
        debug!("factory reset complete");
        Ok(())
    }
}
