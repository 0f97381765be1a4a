//! The metafile catalog: the 16 reserved MFT records and how each one is
//! assembled.
//!
//! Every record starts as a blank carrying $STANDARD_INFORMATION and
//! $FILE_NAME; the catalog then adds the kind-specific attributes. Slots
//! whose real content the reference formatter never produced ($LogFile,
//! the root index, $Bitmap, $BadClus, $Secure and the reserved tail) are
//! explicit stubs so a later version can fill them in.

use crate::attribute;
use crate::layout::{
    self, VolumeLayout, METAFILE_ATTRDEF, METAFILE_BOOT, METAFILE_FIRST_USER, METAFILE_MFT,
    METAFILE_MFTMIRR, METAFILE_ROOT, METAFILE_UPCASE, METAFILE_VOLUME, NTFS_MAJOR_VERSION,
    NTFS_MINOR_VERSION,
};
use crate::record::FileRecord;

/// Names of the reserved records; indices 11..16 have no name.
pub const METAFILE_NAMES: [&str; 11] = [
    "$MFT", "$MFTMirr", "$LogFile", "$Volume", "$AttrDef", ".", "$Bitmap", "$Boot", "$BadClus",
    "$Secure", "$UpCase",
];

/// How a reserved record gets its kind-specific attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetafileKind {
    /// Fully constructed by this formatter.
    Implemented,
    /// Placeholder record (name attributes plus an empty $DATA); the real
    /// content is a known gap inherited from the reference formatter.
    Stub,
}

/// One row of the catalog.
#[derive(Debug, Clone, Copy)]
pub struct MetafileEntry {
    pub index: u32,
    pub name: &'static str,
    pub kind: MetafileKind,
}

/// Catalog row for a reserved MFT record number.
pub fn catalog_entry(mft_index: u32) -> MetafileEntry {
    assert!(mft_index < METAFILE_FIRST_USER, "not a reserved record: {mft_index}");

    let name = METAFILE_NAMES
        .get(mft_index as usize)
        .copied()
        .unwrap_or("");
    let kind = match mft_index {
        METAFILE_MFT | METAFILE_MFTMIRR | METAFILE_VOLUME | METAFILE_ATTRDEF | METAFILE_BOOT
        | METAFILE_UPCASE => MetafileKind::Implemented,
        _ => MetafileKind::Stub,
    };

    MetafileEntry {
        index: mft_index,
        name,
        kind,
    }
}

/// Build the file record for reserved record number `mft_index`.
pub fn build_metafile(layout: &VolumeLayout, mft_index: u32, timestamp: u64) -> FileRecord {
    let entry = catalog_entry(mft_index);
    match entry.index {
        METAFILE_MFT => build_mft(layout, entry, timestamp),
        METAFILE_MFTMIRR => build_mft_mirror(layout, entry, timestamp),
        METAFILE_VOLUME => build_volume(entry, timestamp),
        METAFILE_ATTRDEF => build_attrdef(layout, entry, timestamp),
        METAFILE_BOOT => build_boot(layout, entry, timestamp),
        METAFILE_UPCASE => build_upcase(layout, entry, timestamp),
        _ => build_stub(entry, timestamp),
    }
}

/// $MFT: non-resident $DATA over the MFT extent plus the non-resident
/// $BITMAP over its allocation bitmap cluster.
fn build_mft(layout: &VolumeLayout, entry: MetafileEntry, timestamp: u64) -> FileRecord {
    let (mut record, cursor) = FileRecord::create_blank(entry.index, entry.name, false, timestamp);
    let bpc = layout.bytes_per_cluster();

    let cursor = attribute::add_non_resident_data(
        &mut record,
        cursor,
        layout.mft_lcn,
        layout.mft_clusters,
        bpc,
    );
    attribute::add_non_resident_bitmap(&mut record, cursor, layout.mft_bitmap_lcn, 1, bpc);

    record
}

/// $MFTMirr: non-resident $DATA over the mirror extent.
fn build_mft_mirror(layout: &VolumeLayout, entry: MetafileEntry, timestamp: u64) -> FileRecord {
    let (mut record, cursor) = FileRecord::create_blank(entry.index, entry.name, false, timestamp);

    // The mirror carries copies of the leading records; its extent is sized
    // to hold them.
    let mirror_bytes = layout::MIRRORED_RECORDS as u64 * layout::MFT_RECORD_SIZE as u64;
    let clusters = mirror_bytes.div_ceil(layout.bytes_per_cluster());
    attribute::add_non_resident_data(
        &mut record,
        cursor,
        layout.mft_mirror_lcn,
        clusters,
        layout.bytes_per_cluster(),
    );

    record
}

/// $Volume: empty $VOLUME_NAME, $VOLUME_INFORMATION with the NTFS version,
/// and an empty $DATA.
fn build_volume(entry: MetafileEntry, timestamp: u64) -> FileRecord {
    let (mut record, cursor) = FileRecord::create_blank(entry.index, entry.name, false, timestamp);

    let cursor = attribute::add_empty_volume_name(&mut record, cursor);
    let cursor = attribute::add_volume_information(
        &mut record,
        cursor,
        NTFS_MAJOR_VERSION,
        NTFS_MINOR_VERSION,
    );
    attribute::add_empty_data(&mut record, cursor);

    record
}

fn build_attrdef(layout: &VolumeLayout, entry: MetafileEntry, timestamp: u64) -> FileRecord {
    let (mut record, cursor) = FileRecord::create_blank(entry.index, entry.name, false, timestamp);
    attribute::add_non_resident_data(
        &mut record,
        cursor,
        layout.attrdef_lcn,
        layout.attrdef_clusters,
        layout.bytes_per_cluster(),
    );
    record
}

/// $Boot: non-resident $DATA over the boot area at the front of the volume.
fn build_boot(layout: &VolumeLayout, entry: MetafileEntry, timestamp: u64) -> FileRecord {
    let (mut record, cursor) = FileRecord::create_blank(entry.index, entry.name, false, timestamp);
    attribute::add_non_resident_data(
        &mut record,
        cursor,
        0,
        layout.boot_clusters,
        layout.bytes_per_cluster(),
    );
    record
}

/// $UpCase: extent for the uppercase table. Table content generation is a
/// separate concern; only the placement is recorded here.
fn build_upcase(layout: &VolumeLayout, entry: MetafileEntry, timestamp: u64) -> FileRecord {
    let (mut record, cursor) = FileRecord::create_blank(entry.index, entry.name, false, timestamp);
    attribute::add_non_resident_data(
        &mut record,
        cursor,
        layout.upcase_lcn,
        layout.upcase_clusters,
        layout.bytes_per_cluster(),
    );
    record
}

/// Stub record: name attributes plus an empty $DATA. The root directory
/// additionally gets the directory flag; its $INDEX_ROOT/$INDEX_ALLOCATION
/// are part of the same known gap.
fn build_stub(entry: MetafileEntry, timestamp: u64) -> FileRecord {
    let is_directory = entry.index == METAFILE_ROOT;
    let (mut record, cursor) =
        FileRecord::create_blank(entry.index, entry.name, is_directory, timestamp);
    attribute::add_empty_data(&mut record, cursor);
    record
}

/// The MFT's own allocation bitmap: one bit per cluster of the record
/// extent, with the 16 metafile records marked in use.
pub fn mft_allocation_bitmap(layout: &VolumeLayout) -> Vec<u8> {
    let mut bitmap = vec![0u8; layout.bytes_per_sector as usize];
    bitmap[0] = 0xFF;
    bitmap[1] = 0xFF;
    bitmap
}
