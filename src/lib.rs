//! On-disk metadata builder for fresh NTFS volumes.
//!
//! Produces everything a volume needs before it can be mounted: the boot
//! sector, the Master File Table and its mirror, and the sixteen reserved
//! metafile records ($MFT, $MFTMirr, $LogFile, $Volume, $AttrDef, the root
//! directory, $Bitmap, $Boot, $BadClus, $Secure, $UpCase and the reserved
//! tail). The heart of the crate is the binary file-record and
//! attribute-record builder: variable-length, self-describing, 8-byte-
//! aligned attribute records inside fixed 1024-byte file records, with
//! compressed data-run lists for the non-resident streams.
//!
//! Device access goes through the [`volume::Volume`] trait; the crate never
//! opens devices itself. Journaling, directory indexes, security
//! descriptors and the $UpCase table content are out of scope.

pub mod attribute;
pub mod boot_sector;
pub mod error;
pub mod format;
pub mod layout;
pub mod metafile;
pub mod record;
pub mod runs;
pub mod volume;

pub use error::FormatError;
pub use format::{check_volume, format_volume, write_volume_metadata, FormatReport};
pub use volume::{DiskGeometry, ImageVolume, MediaType, Volume};
