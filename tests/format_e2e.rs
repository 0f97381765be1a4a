//! End-to-end formatting tests.
//!
//! The volume is a write-recording mock rather than a flat buffer: the MFT
//! sits at a fixed cluster address far into the volume, and recording
//! (offset, bytes) pairs keeps the tests cheap while still letting them
//! re-read any region by replaying the write log.
//!
//! Run with: cargo test --test format_e2e

use std::io;

use anyhow::Result;

use mkntfs::format::write_volume_metadata;
use mkntfs::layout::VolumeLayout;
use mkntfs::{format_volume, DiskGeometry, FormatError, MediaType, Volume};

/// Volume that records every write and can replay them for verification.
struct RecordingVolume {
    length: u64,
    geometry: DiskGeometry,
    writes: Vec<(u64, Vec<u8>)>,
    /// When set, any write starting at this offset fails.
    fail_at_offset: Option<u64>,
}

impl RecordingVolume {
    fn new(length: u64) -> Self {
        Self {
            length,
            geometry: DiskGeometry {
                sectors_per_track: 63,
                tracks_per_cylinder: 16,
                cylinders: 204,
                media_type: MediaType::Fixed,
            },
            writes: Vec::new(),
            fail_at_offset: None,
        }
    }

    /// Re-read `len` bytes at `offset` by replaying the write log in order.
    /// Unwritten bytes read as zero.
    fn read_back(&self, offset: u64, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        for (write_offset, data) in &self.writes {
            let start = offset.max(*write_offset);
            let end = (offset + len as u64).min(write_offset + data.len() as u64);
            if start < end {
                let src = (start - write_offset) as usize..(end - write_offset) as usize;
                let dst = (start - offset) as usize..(end - offset) as usize;
                out[dst].copy_from_slice(&data[src]);
            }
        }
        out
    }
}

impl Volume for RecordingVolume {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        if self.fail_at_offset == Some(offset) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        self.writes.push((offset, data.to_vec()));
        Ok(())
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn geometry(&self) -> DiskGeometry {
        self.geometry
    }
}

const VOLUME_LEN: u64 = 100 * 1024 * 1024;
const TS: u64 = 0x01DA_8000_0000_0000;
const SERIAL: u64 = 0x1122_3344_5566_7788;

fn format_recording_volume() -> (RecordingVolume, VolumeLayout) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut volume = RecordingVolume::new(VOLUME_LEN);
    let layout = VolumeLayout::from_volume(&volume.geometry(), VOLUME_LEN).unwrap();
    write_volume_metadata(&mut volume, &layout, TS, SERIAL).unwrap();
    (volume, layout)
}

// ============================================================================
// Full-format verification
// ============================================================================

#[test]
fn test_boot_sector_on_disk() {
    let (volume, layout) = format_recording_volume();
    let vbr = volume.read_back(0, 512);

    // Parse it back the way a reader would.
    assert_eq!(&vbr[3..11], b"NTFS    ");
    assert_eq!(u16::from_le_bytes([vbr[0x0B], vbr[0x0C]]), 512);
    assert_eq!(vbr[0x0D], 1, "100 MiB volume formats at 1 sector/cluster");
    assert_eq!(vbr[0x15], 0xF8, "fixed media id");

    let mft_lcn = u64::from_le_bytes(vbr[0x30..0x38].try_into().unwrap());
    assert_eq!(mft_lcn, layout.mft_lcn);
    let mirror_lcn = u64::from_le_bytes(vbr[0x38..0x40].try_into().unwrap());
    assert_eq!(mirror_lcn, layout.mft_mirror_lcn);
    let serial = u64::from_le_bytes(vbr[0x48..0x50].try_into().unwrap());
    assert_eq!(serial, SERIAL);
    assert_eq!(&vbr[0x1FE..0x200], &[0x55, 0xAA]);
}

#[test]
fn test_all_sixteen_records_on_disk() {
    let (volume, layout) = format_recording_volume();

    for index in 0..16 {
        let record = volume.read_back(layout.record_offset(index), 1024);
        assert_eq!(&record[0..4], b"FILE", "record {index} magic");

        let bytes_in_use =
            u32::from_le_bytes([record[0x18], record[0x19], record[0x1A], record[0x1B]]);
        let bytes_allocated =
            u32::from_le_bytes([record[0x1C], record[0x1D], record[0x1E], record[0x1F]]);
        assert!(bytes_in_use <= bytes_allocated, "record {index}");
        assert_eq!(bytes_allocated, 1024);

        // The end marker sits 8 bytes before bytes_in_use ends.
        let end = bytes_in_use as usize - 8;
        assert_eq!(
            u32::from_le_bytes(record[end..end + 4].try_into().unwrap()),
            0xFFFF_FFFF,
            "record {index} end marker"
        );

        let record_number =
            u32::from_le_bytes([record[0x2C], record[0x2D], record[0x2E], record[0x2F]]);
        assert_eq!(record_number, index);
    }
}

#[test]
fn test_stub_record_12_placement_and_shape() {
    let (volume, layout) = format_recording_volume();

    assert_eq!(
        layout.record_offset(12),
        layout.cluster_offset(layout.mft_lcn) + 12 * 1024
    );
    let record = volume.read_back(layout.record_offset(12), 1024);

    // STANDARD_INFORMATION, FILE_NAME, empty DATA, END.
    let mut cursor = u16::from_le_bytes([record[0x14], record[0x15]]) as usize;
    let mut types = Vec::new();
    loop {
        let t = u32::from_le_bytes(record[cursor..cursor + 4].try_into().unwrap());
        if t == 0xFFFF_FFFF {
            break;
        }
        types.push(t);
        cursor += u32::from_le_bytes(record[cursor + 4..cursor + 8].try_into().unwrap()) as usize;
    }
    assert_eq!(types, vec![0x10, 0x30, 0x80]);
}

#[test]
fn test_mirror_copies_match_leading_records() {
    let (volume, layout) = format_recording_volume();

    for index in 0..4 {
        let primary = volume.read_back(layout.record_offset(index), 1024);
        let mirror = volume.read_back(layout.mirror_record_offset(index), 1024);
        assert_eq!(primary, mirror, "mirror copy of record {index} differs");
    }

    // Record 4 is not mirrored; its mirror slot stays zero.
    let unmirrored = volume.read_back(layout.mirror_record_offset(4), 1024);
    assert!(unmirrored.iter().all(|&b| b == 0));
}

#[test]
fn test_mft_allocation_bitmap_on_disk() {
    let (volume, layout) = format_recording_volume();
    let bitmap = volume.read_back(layout.cluster_offset(layout.mft_bitmap_lcn), 512);
    assert_eq!(&bitmap[..2], &[0xFF, 0xFF]);
    assert!(bitmap[2..].iter().all(|&b| b == 0));
}

#[test]
fn test_identical_inputs_give_identical_volumes() {
    let (a, _) = format_recording_volume();
    let (b, _) = format_recording_volume();
    assert_eq!(a.writes, b.writes);
}

// ============================================================================
// Failure semantics
// ============================================================================

#[test]
fn test_write_failure_aborts_and_names_the_step() {
    let mut volume = RecordingVolume::new(VOLUME_LEN);
    let layout = VolumeLayout::from_volume(&volume.geometry(), VOLUME_LEN).unwrap();

    // Fail the $Volume record write (reserved record 3).
    volume.fail_at_offset = Some(layout.record_offset(3));

    let err = write_volume_metadata(&mut volume, &layout, TS, SERIAL).unwrap_err();
    match err {
        FormatError::StepFailed { step, .. } => assert_eq!(step, "$Volume"),
        other => panic!("expected StepFailed, got {other:?}"),
    }

    // No rollback: the records written before the failure stay on disk,
    // nothing at or after the failed slot was written.
    for index in 0..3 {
        let record = volume.read_back(layout.record_offset(index), 4);
        assert_eq!(&record, b"FILE", "record {index} should remain");
    }
    let failed = volume.read_back(layout.record_offset(3), 1024);
    assert!(failed.iter().all(|&b| b == 0));
    let after = volume.read_back(layout.record_offset(4), 1024);
    assert!(after.iter().all(|&b| b == 0));
}

// ============================================================================
// Public entry point
// ============================================================================

#[test]
fn test_format_volume_end_to_end() -> Result<()> {
    let mut volume = RecordingVolume::new(VOLUME_LEN);
    let report = format_volume(&mut volume)?;

    assert_eq!(report.records_written, 16);
    assert_eq!(report.mirrored_records, 4);
    assert_eq!(report.sectors_per_cluster, 1);
    assert_eq!(report.total_sectors, volume.geometry().total_sectors());

    // The serial in the report matches the boot sector.
    let vbr = volume.read_back(0, 512);
    let serial = u64::from_le_bytes(vbr[0x48..0x50].try_into().unwrap());
    assert_eq!(serial, report.serial_number);
    Ok(())
}

#[test]
fn test_format_volume_rejects_tiny_volume() {
    let mut volume = RecordingVolume::new(4096);
    let err = format_volume(&mut volume).unwrap_err();
    assert!(matches!(err, FormatError::VolumeTooSmall(4096)));
    assert!(volume.writes.is_empty(), "nothing may be written");
}
