//! ChangeFileSettings payloads for the NDEF file.

use crate::apdu::le24;
use crate::ndef::SdmOffsets;

/// Settings payload enabling SDM with plain mirroring: UID and read counter
/// appear as ASCII hex in the URL, and the MAC is computed over the mirror
/// range under the SDM file read key (slot 2).
///
/// The MAC input range starts at the UID mirror, so the MAC covers both
/// mirrored values even though the CMAC input itself is empty in this
/// configuration.
pub fn sdm_plain_mirror_settings(offsets: SdmOffsets) -> Vec<u8> {
    let mut out = Vec::with_capacity(18);
    out.push(0x40); // FileOption: SDM enabled, CommMode plain
    out.push(0x00); // access rights: RW key 0, Change key 0
    out.push(0xE0); //                Read free, Write key 0
    out.push(0xC1); // SDMOptions: UID + read counter mirrors, ASCII encoding
    out.push(0xFF); // SDM access: CtrRet free, MetaRead plain
    out.push(0x2F); //             FileRead key 2, CtrInc free
    out.extend_from_slice(&le24(offsets.uid));
    out.extend_from_slice(&le24(offsets.ctr));
    out.extend_from_slice(&le24(offsets.uid)); // MAC input starts at the UID mirror
    out.extend_from_slice(&le24(offsets.mac));
    out
}

/// Factory-default NDEF file settings: SDM disabled, plain communication,
/// free read, free write.
pub fn factory_default_settings() -> Vec<u8> {
    vec![0x00, 0xE0, 0xEE]
}
