use std::io::{self, Seek, SeekFrom, Write};

use serde::Serialize;

/// Media type reported by the device, as it affects the boot sector's
/// media-id byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaType {
    Fixed,
    Removable,
}

/// Disk geometry as reported by the device driver.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DiskGeometry {
    pub sectors_per_track: u16,
    pub tracks_per_cylinder: u16,
    pub cylinders: u64,
    pub media_type: MediaType,
}

impl DiskGeometry {
    /// Total sector count derived from the geometry
    /// (sectors/track x tracks/cylinder x cylinders).
    pub fn total_sectors(&self) -> u64 {
        self.sectors_per_track as u64 * self.tracks_per_cylinder as u64 * self.cylinders
    }
}

/// Trait for the block device being formatted.
///
/// The formatter only needs positioned writes plus the length and geometry
/// queries; opening the device and holding exclusive access is the caller's
/// job. The lock/dismount hooks default to no-ops for backends (plain image
/// files, in-memory buffers) that have no such notion.
pub trait Volume {
    /// Write `data` at the absolute byte `offset`.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Volume length in bytes.
    fn length(&self) -> u64;

    /// Geometry as reported by the device.
    fn geometry(&self) -> DiskGeometry;

    /// Take exclusive control of the volume before writing.
    fn lock(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Force-dismount any mounted filesystem instance.
    fn dismount(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Release the volume after the format completes or fails.
    fn unlock(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A volume backed by anything seekable — a raw image file, or an in-memory
/// `Cursor` in tests. Geometry is supplied by the caller since plain files
/// carry none.
pub struct ImageVolume<W> {
    inner: W,
    length: u64,
    geometry: DiskGeometry,
}

impl<W: Write + Seek> ImageVolume<W> {
    pub fn new(inner: W, length: u64, geometry: DiskGeometry) -> Self {
        Self {
            inner,
            length,
            geometry,
        }
    }

    /// Consume the volume, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> Volume for ImageVolume<W> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(data)
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn geometry(&self) -> DiskGeometry {
        self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn geometry() -> DiskGeometry {
        DiskGeometry {
            sectors_per_track: 63,
            tracks_per_cylinder: 255,
            cylinders: 12,
            media_type: MediaType::Fixed,
        }
    }

    #[test]
    fn test_total_sectors() {
        assert_eq!(geometry().total_sectors(), 63 * 255 * 12);
    }

    #[test]
    fn test_image_volume_write_at() {
        let mut vol = ImageVolume::new(Cursor::new(vec![0u8; 32]), 32, geometry());
        vol.write_at(4, &[0xAA, 0xBB]).unwrap();
        let buf = vol.into_inner().into_inner();
        assert_eq!(&buf[4..6], &[0xAA, 0xBB]);
        assert_eq!(buf[3], 0);
        assert_eq!(buf[6], 0);
    }
}
