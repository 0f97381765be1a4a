//! NTFS boot sector construction.
//!
//! 512 bytes: jump stub, OEM id, BIOS parameter block, extended BPB with the
//! MFT addresses and serial number, an unused bootstrap area, and the end
//! signature. The serial number is passed in so a format operation stamps
//! one value everywhere and tests can pin it.

use byteorder::{ByteOrder, LittleEndian};

use crate::layout::{
    sectors_per_cluster, BOOT_SECTOR_SIGNATURE, BPB_HEADS, BPB_HIDDEN_SECTORS,
    CLUSTERS_PER_INDEX_RECORD, CLUSTERS_PER_MFT_RECORD, EBPB_HEADER, MFT_LCN, OEM_ID,
};
use crate::volume::{DiskGeometry, MediaType};

pub const BOOT_SECTOR_SIZE: usize = 512;

// Field offsets.
const OFF_JUMP: usize = 0x00;
const OFF_OEM_ID: usize = 0x03;
const OFF_BYTES_PER_SECTOR: usize = 0x0B;
const OFF_SECTORS_PER_CLUSTER: usize = 0x0D;
const OFF_MEDIA_ID: usize = 0x15;
const OFF_SECTORS_PER_TRACK: usize = 0x18;
const OFF_HEADS: usize = 0x1A;
const OFF_HIDDEN_SECTORS: usize = 0x1C;
const OFF_EBPB_HEADER: usize = 0x24;
const OFF_SECTOR_COUNT: usize = 0x28;
const OFF_MFT_LCN: usize = 0x30;
const OFF_MFT_MIRROR_LCN: usize = 0x38;
const OFF_CLUSTERS_PER_MFT_RECORD: usize = 0x40;
const OFF_CLUSTERS_PER_INDEX_RECORD: usize = 0x44;
const OFF_SERIAL_NUMBER: usize = 0x48;
const OFF_SIGNATURE: usize = 0x1FE;

/// Build the boot sector for a volume of `length` bytes with the given
/// geometry and serial number.
pub fn build_boot_sector(
    geometry: &DiskGeometry,
    length: u64,
    mft_mirror_lcn: u64,
    serial_number: u64,
) -> [u8; BOOT_SECTOR_SIZE] {
    let mut sector = [0u8; BOOT_SECTOR_SIZE];

    // jmp +0x52; nop
    sector[OFF_JUMP..OFF_JUMP + 3].copy_from_slice(&[0xEB, 0x52, 0x90]);
    sector[OFF_OEM_ID..OFF_OEM_ID + 8].copy_from_slice(OEM_ID);

    // BIOS parameter block.
    LittleEndian::write_u16(
        &mut sector[OFF_BYTES_PER_SECTOR..],
        crate::layout::BYTES_PER_SECTOR as u16,
    );
    sector[OFF_SECTORS_PER_CLUSTER] = sectors_per_cluster(length);
    sector[OFF_MEDIA_ID] = match geometry.media_type {
        MediaType::Fixed => 0xF8,
        MediaType::Removable => 0x00,
    };
    LittleEndian::write_u16(&mut sector[OFF_SECTORS_PER_TRACK..], geometry.sectors_per_track);
    LittleEndian::write_u16(&mut sector[OFF_HEADS..], BPB_HEADS);
    LittleEndian::write_u32(&mut sector[OFF_HIDDEN_SECTORS..], BPB_HIDDEN_SECTORS);

    // Extended BPB.
    sector[OFF_EBPB_HEADER..OFF_EBPB_HEADER + 4].copy_from_slice(&EBPB_HEADER);
    LittleEndian::write_u64(&mut sector[OFF_SECTOR_COUNT..], geometry.total_sectors());
    LittleEndian::write_u64(&mut sector[OFF_MFT_LCN..], MFT_LCN);
    LittleEndian::write_u64(&mut sector[OFF_MFT_MIRROR_LCN..], mft_mirror_lcn);
    sector[OFF_CLUSTERS_PER_MFT_RECORD] = CLUSTERS_PER_MFT_RECORD;
    sector[OFF_CLUSTERS_PER_INDEX_RECORD] = CLUSTERS_PER_INDEX_RECORD;
    LittleEndian::write_u64(&mut sector[OFF_SERIAL_NUMBER..], serial_number);

    LittleEndian::write_u16(&mut sector[OFF_SIGNATURE..], BOOT_SECTOR_SIGNATURE);

    sector
}
