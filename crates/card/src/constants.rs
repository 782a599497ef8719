//! Protocol constants for the NTAG 424 DNA.

/// DESFire-style instruction codes, wrapped in the ISO 7816 envelope.
pub mod ins {
    /// GetVersion (three-frame chain).
    pub const GET_VERSION: u8 = 0x60;
    /// SelectApplication by AID.
    pub const SELECT_APPLICATION: u8 = 0x5A;
    /// AuthenticateEV2First.
    pub const AUTHENTICATE_EV2_FIRST: u8 = 0x71;
    /// Continuation frame for multi-frame exchanges.
    pub const ADDITIONAL_FRAME: u8 = 0xAF;
    /// ReadData.
    pub const READ_DATA: u8 = 0xAD;
    /// WriteData.
    pub const WRITE_DATA: u8 = 0x8D;
    /// GetFileSettings.
    pub const GET_FILE_SETTINGS: u8 = 0xF5;
    /// ChangeFileSettings.
    pub const CHANGE_FILE_SETTINGS: u8 = 0x5F;
    /// ChangeKey.
    pub const CHANGE_KEY: u8 = 0xC4;
    /// GetKeyVersion.
    pub const GET_KEY_VERSION: u8 = 0x64;
}

/// Standard file numbers inside the NTAG 424 DNA application.
pub mod file {
    /// Capability container.
    pub const CAPABILITY_CONTAINER: u8 = 0x01;
    /// NDEF data file (the SDM mirror target).
    pub const NDEF: u8 = 0x02;
    /// Proprietary data file.
    pub const PROPRIETARY: u8 = 0x03;
}

/// Application key slots.
pub mod key_slot {
    /// Application master key.
    pub const APP_MASTER: u8 = 0x00;
    /// SDM meta read key (PICC data encryption).
    pub const SDM_META_READ: u8 = 0x01;
    /// SDM file read key (MAC session key derivation).
    pub const SDM_FILE_READ: u8 = 0x02;
    /// Change key.
    pub const CHANGE_KEY: u8 = 0x03;
    /// Write key.
    pub const WRITE: u8 = 0x04;
}

/// DF name of the NTAG 424 DNA application.
pub const AID_NTAG424_DNA: [u8; 7] = [0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];

/// Factory default key value (all zeros).
pub const FACTORY_KEY: [u8; 16] = [0u8; 16];
