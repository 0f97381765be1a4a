//! The format orchestrator: sequences the boot sector, the metafile
//! records, the mirror pass, and the MFT allocation bitmap onto a volume.
//!
//! Strictly sequential; the first failed write aborts the remaining steps
//! and the volume is left partially written. There is no rollback — callers
//! that want a clean state on failure must re-run the whole format.

use log::{debug, info, warn};
use serde::Serialize;

use crate::attribute::filetime_now;
use crate::boot_sector::build_boot_sector;
use crate::error::FormatError;
use crate::layout::{VolumeLayout, METAFILE_FIRST_USER, METAFILE_MFT, MIRRORED_RECORDS};
use crate::metafile::{build_metafile, catalog_entry, mft_allocation_bitmap};
use crate::volume::Volume;

/// Summary of a completed format operation.
#[derive(Debug, Clone, Serialize)]
pub struct FormatReport {
    pub serial_number: u64,
    pub sectors_per_cluster: u8,
    pub total_sectors: u64,
    pub records_written: u32,
    pub mirrored_records: u32,
}

/// Format `volume` as NTFS: lock it, write the full metadata set, then
/// dismount and unlock.
///
/// The caller is expected to hold exclusive access to the device for the
/// whole operation.
pub fn format_volume<V: Volume>(volume: &mut V) -> Result<FormatReport, FormatError> {
    let geometry = volume.geometry();
    let length = volume.length();
    let layout = VolumeLayout::from_volume(&geometry, length)?;

    let serial_number = rand::random::<u64>();
    let timestamp = filetime_now();

    info!(
        "formatting volume: {} bytes, {} sectors/cluster, serial {serial_number:#018x}",
        length, layout.sectors_per_cluster
    );

    volume.lock()?;
    let result = write_volume_metadata(volume, &layout, timestamp, serial_number);

    // The reference formatter dismounts and unlocks regardless of outcome;
    // a hook failure here must not mask the primary result.
    if let Err(e) = volume.dismount() {
        warn!("dismount failed: {e}");
    }
    if let Err(e) = volume.unlock() {
        warn!("unlock failed: {e}");
    }

    result
}

/// Write the boot sector and all on-disk metadata for `layout`.
///
/// Split out from [`format_volume`] so the timestamp and serial number are
/// explicit inputs: identical inputs produce byte-identical volumes.
pub fn write_volume_metadata<V: Volume>(
    volume: &mut V,
    layout: &VolumeLayout,
    timestamp: u64,
    serial_number: u64,
) -> Result<FormatReport, FormatError> {
    let geometry = volume.geometry();

    let boot = build_boot_sector(&geometry, volume.length(), layout.mft_mirror_lcn, serial_number);
    volume
        .write_at(0, &boot)
        .map_err(FormatError::step("boot sector"))?;

    // The record extent must be clean before records land in it.
    write_zeros_to_clusters(volume, layout, layout.mft_lcn, layout.mft_clusters, "MFT clear")?;

    let mut mirrored = 0;
    for index in 0..METAFILE_FIRST_USER {
        let entry = catalog_entry(index);
        let step = if entry.name.is_empty() {
            "reserved record"
        } else {
            entry.name
        };

        let record = build_metafile(layout, index, timestamp);
        debug!(
            "writing record {index} ({step}) at {:#x}, {} bytes in use",
            layout.record_offset(index),
            record.bytes_in_use()
        );
        volume
            .write_at(layout.record_offset(index), record.bytes())
            .map_err(FormatError::step(step))?;

        if index < MIRRORED_RECORDS {
            volume
                .write_at(layout.mirror_record_offset(index), record.bytes())
                .map_err(FormatError::step("MFT mirror"))?;
            mirrored += 1;
        }

        if index == METAFILE_MFT {
            write_mft_bitmap(volume, layout)?;
        }
    }

    info!("format complete: {METAFILE_FIRST_USER} records, {mirrored} mirrored");

    Ok(FormatReport {
        serial_number,
        sectors_per_cluster: layout.sectors_per_cluster,
        total_sectors: layout.total_sectors,
        records_written: METAFILE_FIRST_USER,
        mirrored_records: mirrored,
    })
}

/// Zero and write the MFT's own allocation bitmap cluster.
fn write_mft_bitmap<V: Volume>(volume: &mut V, layout: &VolumeLayout) -> Result<(), FormatError> {
    write_zeros_to_clusters(volume, layout, layout.mft_bitmap_lcn, 1, "MFT bitmap clear")?;
    volume
        .write_at(
            layout.cluster_offset(layout.mft_bitmap_lcn),
            &mft_allocation_bitmap(layout),
        )
        .map_err(FormatError::step("MFT bitmap"))
}

fn write_zeros_to_clusters<V: Volume>(
    volume: &mut V,
    layout: &VolumeLayout,
    lcn: u64,
    cluster_count: u64,
    step: &'static str,
) -> Result<(), FormatError> {
    let zeros = vec![0u8; (cluster_count * layout.bytes_per_cluster()) as usize];
    volume
        .write_at(layout.cluster_offset(lcn), &zeros)
        .map_err(FormatError::step(step))
}

/// Volume checking entry point. Not implemented; present so callers can
/// already wire up the interface.
pub fn check_volume<V: Volume>(_volume: &mut V) -> Result<(), FormatError> {
    Err(FormatError::Unsupported(
        "volume checking is not implemented".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{DiskGeometry, ImageVolume, MediaType};
    use std::io::Cursor;

    #[test]
    fn test_check_volume_is_a_stub() {
        let geometry = DiskGeometry {
            sectors_per_track: 63,
            tracks_per_cylinder: 16,
            cylinders: 204,
            media_type: MediaType::Fixed,
        };
        let mut volume = ImageVolume::new(Cursor::new(Vec::new()), 100 * 1024 * 1024, geometry);
        let err = check_volume(&mut volume).unwrap_err();
        assert!(matches!(err, FormatError::Unsupported(_)));
    }
}
