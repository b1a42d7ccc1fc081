/// Boot block and master directory block of an HFS volume
///
/// Read-only views of the fixed structures at the start of a volume. Nothing
/// beyond the master directory block is interpreted.

use crate::error::{ApmError, Result};
use crate::format::constants::*;
use crate::format::{decode_pascal, read_u16_be, read_u32_be, Signature};
use crate::io::{open_image, read_at};
use std::path::Path;

/// Seconds between the Macintosh epoch (1904) and the Unix epoch (1970)
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Boot block at the start of a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootBlock {
    /// Boot block ID, "LK" on a bootable volume
    pub id: [u8; 2],
    /// Entry point to the boot code
    pub entry: u32,
    /// Flag byte and boot block version number
    pub version: u16,
    /// Used internally
    pub page_flags: u16,
    /// Default shell, usually "Finder"
    pub shell_name: String,
    /// Application launched at boot, usually "Finder"
    pub hello_name: String,
}

impl BootBlock {
    /// Parse a boot block from the first bytes of a volume
    pub fn parse(data: &[u8]) -> Result<Self> {
        let needed = BB_HELLO_NAME_OFFSET + BB_NAME_LEN + 1;
        if data.len() < needed {
            return Err(ApmError::parse(data.len() as u64, "Boot block too short"));
        }

        Ok(Self {
            id: [data[BB_ID_OFFSET], data[BB_ID_OFFSET + 1]],
            entry: read_u32_be(data, BB_ENTRY_OFFSET),
            version: read_u16_be(data, BB_VERSION_OFFSET),
            page_flags: read_u16_be(data, BB_PAGE_FLAGS_OFFSET),
            shell_name: decode_pascal(&data[BB_SHELL_NAME_OFFSET..], BB_NAME_LEN),
            hello_name: decode_pascal(&data[BB_HELLO_NAME_OFFSET..], BB_NAME_LEN),
        })
    }

    /// Check whether the boot block carries the "LK" signature
    pub fn is_bootable(&self) -> bool {
        Signature::BootBlock.matches(&self.id)
    }
}

/// Master directory block of an HFS volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterDirectoryBlock {
    /// Volume signature, "BD" for HFS
    pub signature: [u8; 2],
    /// Creation date, seconds since 1904
    pub created: u32,
    /// Last modification date, seconds since 1904
    pub modified: u32,
    /// Number of allocation blocks
    pub allocation_blocks: u16,
    /// Number of free allocation blocks
    pub free_blocks: u16,
    /// Volume name as it mounts on the desktop
    pub volume_name: String,
    /// Number of files on the volume
    pub file_count: u32,
}

impl MasterDirectoryBlock {
    /// Parse a master directory block
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MDB_FILE_COUNT_OFFSET + 4 {
            return Err(ApmError::parse(
                MDB_OFFSET + data.len() as u64,
                "Master directory block too short",
            ));
        }

        Ok(Self {
            signature: [data[MDB_SIGNATURE_OFFSET], data[MDB_SIGNATURE_OFFSET + 1]],
            created: read_u32_be(data, MDB_CREATED_OFFSET),
            modified: read_u32_be(data, MDB_MODIFIED_OFFSET),
            allocation_blocks: read_u16_be(data, MDB_ALLOC_BLOCKS_OFFSET),
            free_blocks: read_u16_be(data, MDB_FREE_BLOCKS_OFFSET),
            volume_name: decode_pascal(&data[MDB_VOLUME_NAME_OFFSET..], MDB_VOLUME_NAME_LEN),
            file_count: read_u32_be(data, MDB_FILE_COUNT_OFFSET),
        })
    }

    /// Check whether this is an HFS volume
    pub fn is_hfs(&self) -> bool {
        self.signature == HFS_SIGNATURE
    }

    /// Creation date as Unix seconds
    pub fn created_unix(&self) -> i64 {
        mac_to_unix(self.created)
    }

    /// Modification date as Unix seconds
    pub fn modified_unix(&self) -> i64 {
        mac_to_unix(self.modified)
    }
}

/// Convert a Macintosh timestamp to Unix seconds
pub fn mac_to_unix(seconds: u32) -> i64 {
    seconds as i64 - MAC_EPOCH_OFFSET
}

/// Fixed structures at the start of a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Start sector of the volume within the image
    pub start: u32,
    /// Boot block
    pub boot_block: BootBlock,
    /// Master directory block
    pub mdb: MasterDirectoryBlock,
}

impl VolumeInfo {
    /// Read the volume starting at `start` (in sectors) of an image
    ///
    /// Use a start of 0 for a raw partition file.
    pub fn read<P: AsRef<Path>>(path: P, start: u32) -> Result<Self> {
        let mut file = open_image(path.as_ref())?;
        let base = sector_offset(start);

        let boot = read_at(&mut file, base, BLOCK_LEN)?;
        let mdb = read_at(&mut file, base + MDB_OFFSET, BLOCK_LEN)?;

        Ok(Self {
            start,
            boot_block: BootBlock::parse(&boot)?,
            mdb: MasterDirectoryBlock::parse(&mdb)?,
        })
    }
}
