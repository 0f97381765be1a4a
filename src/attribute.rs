//! Attribute record construction.
//!
//! Every function here appends one attribute at `cursor` — which must point
//! at the record's current end-of-attributes marker — and returns the cursor
//! for the next append. After each append the end marker is re-placed past
//! the new attribute, the value previously held in its length slot is
//! restored, and the record's `bytes_in_use` is recomputed.

use chrono::{TimeZone, Utc};

use crate::layout::{ATTR_ALIGNMENT, METAFILE_ROOT, MFT_RECORD_SIZE};
use crate::record::{align_up, FileRecord, RECORD_IS_DIRECTORY};
use crate::runs::encode_single_run;

// Attribute type codes.
pub const ATTR_STANDARD_INFORMATION: u32 = 0x10;
pub const ATTR_FILE_NAME: u32 = 0x30;
pub const ATTR_VOLUME_NAME: u32 = 0x60;
pub const ATTR_VOLUME_INFORMATION: u32 = 0x70;
pub const ATTR_DATA: u32 = 0x80;
pub const ATTR_INDEX_ROOT: u32 = 0x90;
pub const ATTR_INDEX_ALLOCATION: u32 = 0xA0;
pub const ATTR_BITMAP: u32 = 0xB0;
pub const ATTRIBUTE_END: u32 = 0xFFFF_FFFF;

// File attribute bits carried in $STANDARD_INFORMATION and $FILE_NAME.
pub const FILE_ATTR_HIDDEN: u32 = 0x02;
pub const FILE_ATTR_SYSTEM: u32 = 0x04;
pub const FILE_ATTR_ARCHIVE: u32 = 0x20;
pub const FILE_ATTR_DIRECTORY: u32 = 0x1000_0000;

// $FILE_NAME namespace tags.
pub const NAME_TYPE_POSIX: u8 = 0;
pub const NAME_TYPE_WIN32_AND_DOS: u8 = 3;

/// Indexed flag of a resident attribute.
const RA_INDEXED: u8 = 0x01;

// Common attribute header field offsets.
const OFF_TYPE: usize = 0x00;
const OFF_LENGTH: usize = 0x04;
const OFF_NON_RESIDENT: usize = 0x08;
const OFF_NAME_OFFSET: usize = 0x0A;
const OFF_INSTANCE: usize = 0x0E;

// Resident form.
const OFF_VALUE_LENGTH: usize = 0x10;
const OFF_VALUE_OFFSET: usize = 0x14;
const OFF_RESIDENT_FLAGS: usize = 0x16;
pub const RESIDENT_HEADER_LEN: usize = 0x18;

// Non-resident form.
const OFF_LOWEST_VCN: usize = 0x10;
const OFF_HIGHEST_VCN: usize = 0x18;
const OFF_MAPPING_PAIRS: usize = 0x20;
const OFF_ALLOCATED_SIZE: usize = 0x28;
const OFF_DATA_SIZE: usize = 0x30;
const OFF_INITIALIZED_SIZE: usize = 0x38;
pub const NONRESIDENT_HEADER_LEN: usize = 0x40;

/// Fixed slot reserved for a single-run list after the non-resident header.
const RUN_SLOT_LEN: usize = 8;

// $STANDARD_INFORMATION payload: four timestamps, attribute bits, reserved.
const STANDARD_INFORMATION_SIZE: usize = 0x30;

// $FILE_NAME payload field offsets, relative to the value start.
const FN_PARENT_DIRECTORY: usize = 0x00;
const FN_CREATION_TIME: usize = 0x08;
const FN_CHANGE_TIME: usize = 0x10;
const FN_LAST_WRITE_TIME: usize = 0x18;
const FN_LAST_ACCESS_TIME: usize = 0x20;
const FN_FILE_ATTRIBUTES: usize = 0x38;
const FN_NAME_LENGTH: usize = 0x40;
const FN_NAME_TYPE: usize = 0x41;
pub const FN_NAME: usize = 0x42;

// $VOLUME_INFORMATION payload: 8 reserved bytes, versions, flags.
const VOLUME_INFORMATION_SIZE: usize = 0x0C;

/// Current time as an NTFS FILETIME (100ns ticks since 1601-01-01 UTC).
pub fn filetime_now() -> u64 {
    let epoch = Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0).unwrap();
    let elapsed = Utc::now() - epoch;
    elapsed.num_microseconds().unwrap_or(i64::MAX) as u64 * 10
}

/// File attribute bits for a freshly created name: metafiles are
/// hidden+system, anything else starts as archive.
pub(crate) fn metafile_attributes(name: &str) -> u32 {
    if name.starts_with('$') {
        FILE_ATTR_HIDDEN | FILE_ATTR_SYSTEM
    } else {
        FILE_ATTR_ARCHIVE
    }
}

/// Check the append precondition and pick up the preserved end-marker value
/// sitting in the length slot at `cursor`.
fn begin_attribute(record: &FileRecord, cursor: usize) -> u32 {
    assert!(
        cursor % ATTR_ALIGNMENT == 0,
        "attribute cursor {cursor:#x} is not 8-byte aligned"
    );
    assert!(
        record.read_u32(cursor) == ATTRIBUTE_END,
        "attribute cursor {cursor:#x} does not point at the end marker"
    );
    record.read_u32(cursor + 4)
}

/// Close out an append: write the total length, place the end marker after
/// the attribute, and return the advanced cursor.
fn finish_attribute(
    record: &mut FileRecord,
    cursor: usize,
    length: usize,
    end_marker: u32,
) -> usize {
    let length = align_up(length);
    assert!(
        cursor + length + 8 <= MFT_RECORD_SIZE,
        "attribute at {cursor:#x} ({length} bytes) overflows the file record"
    );
    record.write_u32(cursor + OFF_LENGTH, length as u32);
    record.set_record_end(cursor + length, end_marker);
    cursor + length
}

/// Append $STANDARD_INFORMATION: creation/change/write/access timestamps
/// (all equal at creation) and the file attribute bits.
pub fn add_standard_information(
    record: &mut FileRecord,
    cursor: usize,
    timestamp: u64,
    file_attributes: u32,
) -> usize {
    let end_marker = begin_attribute(record, cursor);

    record.write_u32(cursor + OFF_TYPE, ATTR_STANDARD_INFORMATION);
    let instance = record.take_attribute_instance();
    record.write_u16(cursor + OFF_INSTANCE, instance);
    record.write_u32(cursor + OFF_VALUE_LENGTH, STANDARD_INFORMATION_SIZE as u32);
    record.write_u16(cursor + OFF_VALUE_OFFSET, RESIDENT_HEADER_LEN as u16);

    let value = cursor + RESIDENT_HEADER_LEN;
    record.write_u64(value, timestamp);
    record.write_u64(value + 0x08, timestamp);
    record.write_u64(value + 0x10, timestamp);
    record.write_u64(value + 0x18, timestamp);
    record.write_u32(value + 0x20, file_attributes);

    finish_attribute(
        record,
        cursor,
        RESIDENT_HEADER_LEN + STANDARD_INFORMATION_SIZE,
        end_marker,
    )
}

/// Append $FILE_NAME for `name`, parented at the root directory. Bumps the
/// record's hard-link count.
pub fn add_file_name(
    record: &mut FileRecord,
    cursor: usize,
    name: &str,
    timestamp: u64,
    file_attributes: u32,
) -> usize {
    let end_marker = begin_attribute(record, cursor);

    record.write_u32(cursor + OFF_TYPE, ATTR_FILE_NAME);
    let instance = record.take_attribute_instance();
    record.write_u16(cursor + OFF_INSTANCE, instance);

    let value = cursor + RESIDENT_HEADER_LEN;

    // Parent is always the root directory; its record number is tagged with
    // the root sequence number in the high 16 bits of the reference.
    let parent = METAFILE_ROOT as u64 | ((METAFILE_ROOT as u64) << 48);
    record.write_u64(value + FN_PARENT_DIRECTORY, parent);

    record.write_u64(value + FN_CREATION_TIME, timestamp);
    record.write_u64(value + FN_CHANGE_TIME, timestamp);
    record.write_u64(value + FN_LAST_WRITE_TIME, timestamp);
    record.write_u64(value + FN_LAST_ACCESS_TIME, timestamp);

    let attributes = if record.flags() & RECORD_IS_DIRECTORY != 0 {
        FILE_ATTR_DIRECTORY
    } else {
        file_attributes
    };
    record.write_u32(value + FN_FILE_ATTRIBUTES, attributes);

    let utf16: Vec<u16> = name.encode_utf16().collect();
    record.write_u8(value + FN_NAME_LENGTH, utf16.len() as u8);
    // Emulates Windows with 8.3 generation disabled: a name that is already
    // a legal DOS name doubles as its own short name, anything else is
    // POSIX-namespace only.
    let name_type = if is_legal_dos_name(name) {
        NAME_TYPE_WIN32_AND_DOS
    } else {
        NAME_TYPE_POSIX
    };
    record.write_u8(value + FN_NAME_TYPE, name_type);
    for (i, unit) in utf16.iter().enumerate() {
        record.write_u16(value + FN_NAME + i * 2, *unit);
    }

    record.bump_link_count();

    let value_length = FN_NAME + utf16.len() * 2;
    record.write_u32(cursor + OFF_VALUE_LENGTH, value_length as u32);
    record.write_u16(cursor + OFF_VALUE_OFFSET, RESIDENT_HEADER_LEN as u16);
    record.write_u8(cursor + OFF_RESIDENT_FLAGS, RA_INDEXED);

    finish_attribute(record, cursor, RESIDENT_HEADER_LEN + value_length, end_marker)
}

/// Append an empty resident $DATA attribute (zero-length value).
pub fn add_empty_data(record: &mut FileRecord, cursor: usize) -> usize {
    let end_marker = begin_attribute(record, cursor);

    record.write_u32(cursor + OFF_TYPE, ATTR_DATA);
    let instance = record.take_attribute_instance();
    record.write_u16(cursor + OFF_INSTANCE, instance);
    record.write_u32(cursor + OFF_VALUE_LENGTH, 0);
    record.write_u16(cursor + OFF_VALUE_OFFSET, RESIDENT_HEADER_LEN as u16);
    // Unnamed $DATA convention: the name offset equals the header length.
    record.write_u16(cursor + OFF_NAME_OFFSET, RESIDENT_HEADER_LEN as u16);

    finish_attribute(record, cursor, RESIDENT_HEADER_LEN, end_marker)
}

/// Append an empty $VOLUME_NAME attribute.
pub fn add_empty_volume_name(record: &mut FileRecord, cursor: usize) -> usize {
    let end_marker = begin_attribute(record, cursor);

    record.write_u32(cursor + OFF_TYPE, ATTR_VOLUME_NAME);
    let instance = record.take_attribute_instance();
    record.write_u16(cursor + OFF_INSTANCE, instance);
    record.write_u32(cursor + OFF_VALUE_LENGTH, 0);
    record.write_u16(cursor + OFF_VALUE_OFFSET, RESIDENT_HEADER_LEN as u16);
    record.write_u16(cursor + OFF_NAME_OFFSET, RESIDENT_HEADER_LEN as u16);

    finish_attribute(record, cursor, RESIDENT_HEADER_LEN, end_marker)
}

/// Append $VOLUME_INFORMATION carrying the NTFS version.
///
/// The reference formatter bumps the hard-link count here as well; kept for
/// bit-for-bit output parity even though nothing requires it.
pub fn add_volume_information(
    record: &mut FileRecord,
    cursor: usize,
    major_version: u8,
    minor_version: u8,
) -> usize {
    let end_marker = begin_attribute(record, cursor);

    record.write_u32(cursor + OFF_TYPE, ATTR_VOLUME_INFORMATION);
    let instance = record.take_attribute_instance();
    record.write_u16(cursor + OFF_INSTANCE, instance);
    record.write_u32(cursor + OFF_VALUE_LENGTH, VOLUME_INFORMATION_SIZE as u32);
    record.write_u16(cursor + OFF_VALUE_OFFSET, RESIDENT_HEADER_LEN as u16);

    let value = cursor + RESIDENT_HEADER_LEN;
    record.write_u8(value + 0x08, major_version);
    record.write_u8(value + 0x09, minor_version);

    record.bump_link_count();

    finish_attribute(
        record,
        cursor,
        RESIDENT_HEADER_LEN + VOLUME_INFORMATION_SIZE,
        end_marker,
    )
}

/// Append a non-resident attribute whose content is one pre-placed
/// contiguous extent of `cluster_count` clusters at `start_lcn`.
fn add_non_resident_single_run(
    record: &mut FileRecord,
    cursor: usize,
    type_code: u32,
    start_lcn: u64,
    cluster_count: u64,
    bytes_per_cluster: u64,
) -> usize {
    assert!(cluster_count > 0, "non-resident attribute with empty extent");
    let end_marker = begin_attribute(record, cursor);

    record.write_u32(cursor + OFF_TYPE, type_code);
    let instance = record.take_attribute_instance();
    record.write_u16(cursor + OFF_INSTANCE, instance);
    record.write_u8(cursor + OFF_NON_RESIDENT, 1);
    record.write_u16(cursor + OFF_NAME_OFFSET, NONRESIDENT_HEADER_LEN as u16);

    record.write_u64(cursor + OFF_LOWEST_VCN, 0);
    record.write_u64(cursor + OFF_HIGHEST_VCN, cluster_count - 1);
    record.write_u16(cursor + OFF_MAPPING_PAIRS, NONRESIDENT_HEADER_LEN as u16);

    let size = cluster_count * bytes_per_cluster;
    record.write_u64(cursor + OFF_ALLOCATED_SIZE, size);
    record.write_u64(cursor + OFF_DATA_SIZE, size);
    record.write_u64(cursor + OFF_INITIALIZED_SIZE, size);

    let run = encode_single_run(start_lcn, cluster_count);
    assert!(
        run.len() <= RUN_SLOT_LEN,
        "run list ({} bytes) does not fit its {RUN_SLOT_LEN}-byte slot",
        run.len()
    );
    record.write_bytes(cursor + NONRESIDENT_HEADER_LEN, &run);

    finish_attribute(
        record,
        cursor,
        NONRESIDENT_HEADER_LEN + RUN_SLOT_LEN,
        end_marker,
    )
}

/// Append a non-resident $DATA attribute over a pre-placed extent.
pub fn add_non_resident_data(
    record: &mut FileRecord,
    cursor: usize,
    start_lcn: u64,
    cluster_count: u64,
    bytes_per_cluster: u64,
) -> usize {
    add_non_resident_single_run(
        record,
        cursor,
        ATTR_DATA,
        start_lcn,
        cluster_count,
        bytes_per_cluster,
    )
}

/// Append a non-resident $BITMAP attribute over a pre-placed extent.
pub fn add_non_resident_bitmap(
    record: &mut FileRecord,
    cursor: usize,
    start_lcn: u64,
    cluster_count: u64,
    bytes_per_cluster: u64,
) -> usize {
    add_non_resident_single_run(
        record,
        cursor,
        ATTR_BITMAP,
        start_lcn,
        cluster_count,
        bytes_per_cluster,
    )
}

/// Whether `name` is already a legal DOS 8.3 name (uppercase, one optional
/// dot, 8+3 lengths, DOS-permitted characters only).
fn is_legal_dos_name(name: &str) -> bool {
    fn legal_char(c: char) -> bool {
        c.is_ascii_uppercase() || c.is_ascii_digit() || "!#$%&'()-@^_`{}~".contains(c)
    }

    if name.is_empty() || name == "." || name == ".." {
        return false;
    }

    let (base, ext) = match name.rsplit_once('.') {
        Some((base, ext)) => (base, Some(ext)),
        None => (name, None),
    };

    if base.is_empty() || base.len() > 8 || !base.chars().all(legal_char) {
        return false;
    }
    match ext {
        Some(ext) => !ext.is_empty() && ext.len() <= 3 && ext.chars().all(legal_char),
        None => true,
    }
}
