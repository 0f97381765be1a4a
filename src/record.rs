//! MFT file record construction.
//!
//! A file record is a fixed 1024-byte buffer: a header, then a sequence of
//! 8-byte-aligned attribute records closed by an end marker. All multi-byte
//! fields are little-endian. Instead of the reference formatter's pointer
//! casts, every field goes through bounds-checked offset writes on the
//! owned buffer.

use byteorder::{ByteOrder, LittleEndian};

use crate::attribute;
use crate::layout::{
    ATTR_ALIGNMENT, BYTES_PER_SECTOR, FILE_RECORD_END, FILE_RECORD_MAGIC, MFT_RECORD_SIZE,
};

// File record header field offsets.
const OFF_MAGIC: usize = 0x00;
const OFF_USA_OFFSET: usize = 0x04;
const OFF_USA_COUNT: usize = 0x06;
const OFF_SEQUENCE_NUMBER: usize = 0x10;
const OFF_LINK_COUNT: usize = 0x12;
const OFF_FIRST_ATTRIBUTE: usize = 0x14;
const OFF_FLAGS: usize = 0x16;
const OFF_BYTES_IN_USE: usize = 0x18;
const OFF_BYTES_ALLOCATED: usize = 0x1C;
const OFF_NEXT_ATTRIBUTE_NUMBER: usize = 0x28;
const OFF_MFT_RECORD_NUMBER: usize = 0x2C;

/// The update sequence array starts right after the header proper.
const USA_OFFSET: u16 = 0x30;

pub const RECORD_IN_USE: u16 = 0x0001;
pub const RECORD_IS_DIRECTORY: u16 = 0x0002;

/// Round `value` up to the attribute alignment boundary.
pub(crate) fn align_up(value: usize) -> usize {
    (value + ATTR_ALIGNMENT - 1) & !(ATTR_ALIGNMENT - 1)
}

/// One MFT file record under construction.
pub struct FileRecord {
    buf: Vec<u8>,
}

impl FileRecord {
    /// Create a zero-filled record with an initialized header and a
    /// provisional end-of-attributes marker, but no attributes yet.
    pub fn create_empty(mft_index: u32, is_directory: bool) -> Self {
        let mut record = Self {
            buf: vec![0u8; MFT_RECORD_SIZE],
        };

        record.write_u32(OFF_MAGIC, FILE_RECORD_MAGIC);
        record.write_u32(OFF_MFT_RECORD_NUMBER, mft_index);

        // One USA slot for the check value plus one per sector of the record.
        let usa_count = (MFT_RECORD_SIZE as u64 / BYTES_PER_SECTOR + 1) as u16;
        record.write_u16(OFF_USA_OFFSET, USA_OFFSET);
        record.write_u16(OFF_USA_COUNT, usa_count);

        record.write_u16(OFF_SEQUENCE_NUMBER, 1);
        record.write_u32(OFF_BYTES_ALLOCATED, MFT_RECORD_SIZE as u32);

        let first_attribute = align_up(USA_OFFSET as usize + 2 * usa_count as usize);
        record.write_u16(OFF_FIRST_ATTRIBUTE, first_attribute as u16);

        let mut flags = RECORD_IN_USE;
        if is_directory {
            flags |= RECORD_IS_DIRECTORY;
        }
        record.write_u16(OFF_FLAGS, flags);

        // Provisional end marker until the first attribute lands.
        record.set_record_end(first_attribute, FILE_RECORD_END);

        record
    }

    /// Create a record already carrying $STANDARD_INFORMATION and
    /// $FILE_NAME, returning it together with the cursor where the next
    /// attribute goes.
    pub fn create_blank(
        mft_index: u32,
        name: &str,
        is_directory: bool,
        timestamp: u64,
    ) -> (Self, usize) {
        let mut record = Self::create_empty(mft_index, is_directory);

        let file_attributes = attribute::metafile_attributes(name);
        let cursor = record.first_attribute_offset();
        let cursor =
            attribute::add_standard_information(&mut record, cursor, timestamp, file_attributes);
        let cursor = attribute::add_file_name(&mut record, cursor, name, timestamp, file_attributes);

        (record, cursor)
    }

    /// Serialized record bytes, ready to be written to disk.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn mft_record_number(&self) -> u32 {
        self.read_u32(OFF_MFT_RECORD_NUMBER)
    }

    pub fn first_attribute_offset(&self) -> usize {
        self.read_u16(OFF_FIRST_ATTRIBUTE) as usize
    }

    pub fn flags(&self) -> u16 {
        self.read_u16(OFF_FLAGS)
    }

    pub fn bytes_in_use(&self) -> u32 {
        self.read_u32(OFF_BYTES_IN_USE)
    }

    pub fn bytes_allocated(&self) -> u32 {
        self.read_u32(OFF_BYTES_ALLOCATED)
    }

    pub fn link_count(&self) -> u16 {
        self.read_u16(OFF_LINK_COUNT)
    }

    pub(crate) fn bump_link_count(&mut self) {
        let count = self.link_count();
        self.write_u16(OFF_LINK_COUNT, count + 1);
    }

    /// Hand out the next attribute instance id (post-increment).
    pub(crate) fn take_attribute_instance(&mut self) -> u16 {
        let instance = self.read_u16(OFF_NEXT_ATTRIBUTE_NUMBER);
        self.write_u16(OFF_NEXT_ATTRIBUTE_NUMBER, instance + 1);
        instance
    }

    /// Place the end-of-attributes marker at `end_offset`, restore the
    /// historical end value, and recompute `bytes_in_use`.
    ///
    /// The marker is two u32 slots: the END type and the preserved value.
    pub(crate) fn set_record_end(&mut self, end_offset: usize, end_marker: u32) {
        assert!(
            end_offset % ATTR_ALIGNMENT == 0,
            "end marker at {end_offset:#x} is not 8-byte aligned"
        );
        self.write_u32(end_offset, attribute::ATTRIBUTE_END);
        self.write_u32(end_offset + 4, end_marker);
        self.write_u32(OFF_BYTES_IN_USE, (end_offset + 8) as u32);
    }

    // Bounds-checked little-endian accessors over the record buffer. An
    // out-of-range offset is a programming error and panics. The read side
    // is public so callers can inspect a built record.

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.buf[offset]
    }

    pub fn read_u16(&self, offset: usize) -> u16 {
        LittleEndian::read_u16(&self.buf[offset..offset + 2])
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        LittleEndian::read_u32(&self.buf[offset..offset + 4])
    }

    pub fn read_u64(&self, offset: usize) -> u64 {
        LittleEndian::read_u64(&self.buf[offset..offset + 8])
    }

    pub(crate) fn write_u8(&mut self, offset: usize, value: u8) {
        self.buf[offset] = value;
    }

    pub(crate) fn write_u16(&mut self, offset: usize, value: u16) {
        LittleEndian::write_u16(&mut self.buf[offset..offset + 2], value);
    }

    pub(crate) fn write_u32(&mut self, offset: usize, value: u32) {
        LittleEndian::write_u32(&mut self.buf[offset..offset + 4], value);
    }

    pub(crate) fn write_u64(&mut self, offset: usize, value: u64) {
        LittleEndian::write_u64(&mut self.buf[offset..offset + 8], value);
    }

    pub(crate) fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        self.buf[offset..offset + data.len()].copy_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::ATTRIBUTE_END;

    #[test]
    fn test_empty_record_header() {
        let record = FileRecord::create_empty(6, false);

        assert_eq!(&record.bytes()[0..4], b"FILE");
        assert_eq!(record.mft_record_number(), 6);
        assert_eq!(record.read_u16(OFF_USA_OFFSET), 0x30);
        assert_eq!(record.read_u16(OFF_USA_COUNT), 3);
        assert_eq!(record.read_u16(OFF_SEQUENCE_NUMBER), 1);
        assert_eq!(record.bytes_allocated(), MFT_RECORD_SIZE as u32);
        // align8(0x30 + 2*3) = 0x38
        assert_eq!(record.first_attribute_offset(), 0x38);
        assert_eq!(record.flags(), RECORD_IN_USE);
        assert_eq!(record.link_count(), 0);
    }

    #[test]
    fn test_empty_record_end_marker() {
        let record = FileRecord::create_empty(0, false);
        let end = record.first_attribute_offset();

        assert_eq!(record.read_u32(end), ATTRIBUTE_END);
        assert_eq!(record.read_u32(end + 4), FILE_RECORD_END);
        assert_eq!(record.bytes_in_use(), (end + 8) as u32);
    }

    #[test]
    fn test_directory_flag() {
        let record = FileRecord::create_empty(5, true);
        assert_eq!(record.flags(), RECORD_IN_USE | RECORD_IS_DIRECTORY);
    }

    #[test]
    fn test_blank_record_invariants() {
        let (record, cursor) = FileRecord::create_blank(4, "$AttrDef", false, 0x01d9_0000_0000_0000);

        // Two attributes appended, instance ids 0 and 1 handed out.
        assert_eq!(record.read_u16(OFF_NEXT_ATTRIBUTE_NUMBER), 2);
        assert_eq!(record.link_count(), 1);

        // The cursor sits on the end marker and bytes_in_use covers it.
        assert_eq!(cursor % 8, 0);
        assert_eq!(record.read_u32(cursor), ATTRIBUTE_END);
        assert_eq!(record.read_u32(cursor + 4), FILE_RECORD_END);
        assert_eq!(record.bytes_in_use(), (cursor + 8) as u32);
        assert!(record.bytes_in_use() <= record.bytes_allocated());
        assert_eq!((record.bytes_in_use() - 8) % 8, 0);
    }

    #[test]
    #[should_panic(expected = "not 8-byte aligned")]
    fn test_misaligned_end_marker_panics() {
        let mut record = FileRecord::create_empty(0, false);
        record.set_record_end(0x3C, FILE_RECORD_END);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 8);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(0x36), 0x38);
        assert_eq!(align_up(98), 104);
    }
}
