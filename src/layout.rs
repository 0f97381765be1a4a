//! On-disk constants and the per-volume layout plan.
//!
//! The reference formatter pins the MFT and the metafile extents at fixed
//! cluster addresses rather than deriving them from the volume size; those
//! constants are kept here verbatim so the output stays byte-compatible.

use crate::error::FormatError;
use crate::volume::DiskGeometry;

/// Sector size assumed throughout; NTFS metadata offsets in this formatter
/// are all computed against 512-byte sectors.
pub const BYTES_PER_SECTOR: u64 = 512;

/// Size of one MFT file record.
pub const MFT_RECORD_SIZE: usize = 0x400;

/// Cluster address of the MFT itself.
pub const MFT_LCN: u64 = 0x0C0000;

/// Number of clusters initially reserved for the MFT.
pub const MFT_CLUSTER_COUNT: u64 = 64;

/// Cluster holding the MFT's own allocation bitmap, immediately after the
/// MFT extent.
pub const MFT_BITMAP_LCN: u64 = MFT_LCN + MFT_CLUSTER_COUNT;

/// `FILE` magic at the head of every file record.
pub const FILE_RECORD_MAGIC: u32 = 0x454C_4946;

/// Attribute records are aligned to 8 bytes relative to the record start.
pub const ATTR_ALIGNMENT: usize = 8;

/// Value kept in the `length` slot of the end-of-attributes marker. Seen in
/// Win2k3-formatted volumes starting with $Quota; never interpreted by any
/// consumer, restored after every append purely for byte compatibility.
pub const FILE_RECORD_END: u32 = 0x1147_7982;

/// Boot sector constants.
pub const OEM_ID: &[u8; 8] = b"NTFS    ";
pub const EBPB_HEADER: [u8; 4] = [0x80, 0x00, 0x80, 0x00];
pub const BPB_HIDDEN_SECTORS: u32 = 0x3F;
pub const BPB_HEADS: u16 = 0xFF;
/// Signed byte: negative means the record size is 2^|v| bytes (0xF6 = -10,
/// 1024 bytes).
pub const CLUSTERS_PER_MFT_RECORD: u8 = 0xF6;
pub const CLUSTERS_PER_INDEX_RECORD: u8 = 0x01;
pub const BOOT_SECTOR_SIGNATURE: u16 = 0xAA55;

/// NTFS version stamped into $Volume.
pub const NTFS_MAJOR_VERSION: u8 = 3;
pub const NTFS_MINOR_VERSION: u8 = 1;

/// Sectors covered by the $Boot metafile's data stream.
pub const BOOT_AREA_SECTORS: u64 = 16;

/// Byte size of the $AttrDef attribute-definition table.
pub const ATTRDEF_DATA_SIZE: u64 = 2560;

/// Byte size of the $UpCase uppercase-translation table (64K UTF-16 values).
pub const UPCASE_DATA_SIZE: u64 = 0x20000;

/// How many leading metafile records are duplicated at the mirror address.
pub const MIRRORED_RECORDS: u32 = 4;

// Reserved MFT record numbers.
pub const METAFILE_MFT: u32 = 0;
pub const METAFILE_MFTMIRR: u32 = 1;
pub const METAFILE_LOGFILE: u32 = 2;
pub const METAFILE_VOLUME: u32 = 3;
pub const METAFILE_ATTRDEF: u32 = 4;
pub const METAFILE_ROOT: u32 = 5;
pub const METAFILE_BITMAP: u32 = 6;
pub const METAFILE_BOOT: u32 = 7;
pub const METAFILE_BADCLUS: u32 = 8;
pub const METAFILE_SECURE: u32 = 9;
pub const METAFILE_UPCASE: u32 = 10;
/// Record numbers below this are reserved for metafiles.
pub const METAFILE_FIRST_USER: u32 = 16;

/// Sectors-per-cluster tier for a given volume size.
pub fn sectors_per_cluster(volume_bytes: u64) -> u8 {
    const MIB: u64 = 1024 * 1024;
    if volume_bytes < 512 * MIB {
        1
    } else if volume_bytes < 1024 * MIB {
        2
    } else if volume_bytes < 2048 * MIB {
        4
    } else {
        8
    }
}

/// Cluster-level plan for one volume: where the MFT, its mirror, and the
/// fixed metafile extents live. Computed once per format operation.
#[derive(Debug, Clone, Copy)]
pub struct VolumeLayout {
    pub bytes_per_sector: u64,
    pub sectors_per_cluster: u8,
    pub total_sectors: u64,
    /// First cluster of the MFT extent.
    pub mft_lcn: u64,
    pub mft_clusters: u64,
    /// Single cluster holding the MFT allocation bitmap.
    pub mft_bitmap_lcn: u64,
    /// First cluster of the MFT mirror.
    pub mft_mirror_lcn: u64,
    pub boot_clusters: u64,
    pub attrdef_lcn: u64,
    pub attrdef_clusters: u64,
    pub upcase_lcn: u64,
    pub upcase_clusters: u64,
}

impl VolumeLayout {
    /// Build the layout from the device's reported geometry and length.
    pub fn from_volume(geometry: &DiskGeometry, length: u64) -> Result<Self, FormatError> {
        const MIN_VOLUME_BYTES: u64 = 1024 * 1024;
        if length < MIN_VOLUME_BYTES {
            return Err(FormatError::VolumeTooSmall(length));
        }

        let sectors_per_cluster = sectors_per_cluster(length);
        let bytes_per_cluster = BYTES_PER_SECTOR * sectors_per_cluster as u64;
        let total_sectors = geometry.total_sectors();

        // Mirror sits at the middle cluster of the volume.
        let mft_mirror_lcn = total_sectors / sectors_per_cluster as u64 / 2;

        let boot_clusters = BOOT_AREA_SECTORS.div_ceil(sectors_per_cluster as u64);
        let attrdef_lcn = MFT_BITMAP_LCN + 1;
        let attrdef_clusters = ATTRDEF_DATA_SIZE.div_ceil(bytes_per_cluster);
        let upcase_lcn = attrdef_lcn + attrdef_clusters;
        let upcase_clusters = UPCASE_DATA_SIZE.div_ceil(bytes_per_cluster);

        Ok(Self {
            bytes_per_sector: BYTES_PER_SECTOR,
            sectors_per_cluster,
            total_sectors,
            mft_lcn: MFT_LCN,
            mft_clusters: MFT_CLUSTER_COUNT,
            mft_bitmap_lcn: MFT_BITMAP_LCN,
            mft_mirror_lcn,
            boot_clusters,
            attrdef_lcn,
            attrdef_clusters,
            upcase_lcn,
            upcase_clusters,
        })
    }

    pub fn bytes_per_cluster(&self) -> u64 {
        self.bytes_per_sector * self.sectors_per_cluster as u64
    }

    /// Absolute byte offset of a cluster.
    pub fn cluster_offset(&self, lcn: u64) -> u64 {
        lcn * self.bytes_per_cluster()
    }

    /// Absolute byte offset of a file record within the MFT.
    pub fn record_offset(&self, mft_index: u32) -> u64 {
        self.cluster_offset(self.mft_lcn) + mft_index as u64 * MFT_RECORD_SIZE as u64
    }

    /// Absolute byte offset of a file record's copy in the MFT mirror.
    pub fn mirror_record_offset(&self, mft_index: u32) -> u64 {
        self.cluster_offset(self.mft_mirror_lcn) + mft_index as u64 * MFT_RECORD_SIZE as u64
    }
}
