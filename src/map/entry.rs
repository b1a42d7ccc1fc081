/// Partition map entry and disc header records

use crate::error::{ApmError, Result};
use crate::format::constants::*;
use crate::format::{decode_text, encode_text, read_u16_be, read_u32_be, write_u32_be, Signature};

/// One 512-byte Apple Partition Map entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    /// Block signature (should be "PM")
    pub signature: [u8; 2],
    /// Total number of entries in the map, as reported by this entry
    pub map_entries: u32,
    /// First sector of the partition
    pub start: u32,
    /// Length of the partition in sectors
    pub length: u32,
    /// Partition name
    pub name: String,
    /// Partition type (e.g. "Apple_HFS", "Apple_Driver43")
    pub partition_type: String,
    /// First sector of data within the partition
    pub data_start: u32,
    /// Length of data within the partition in sectors
    pub data_length: u32,
}

impl PartitionEntry {
    /// Create a new entry whose data region spans the whole partition
    pub fn new(name: impl Into<String>, partition_type: impl Into<String>, start: u32, length: u32) -> Self {
        Self {
            signature: PARTITION_MAP_SIGNATURE,
            map_entries: 0,
            start,
            length,
            name: name.into(),
            partition_type: partition_type.into(),
            data_start: 0,
            data_length: length,
        }
    }

    /// Parse an entry from a 512-byte block
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BLOCK_LEN {
            return Err(ApmError::parse(
                data.len() as u64,
                "Partition entry data too short",
            ));
        }

        if !Signature::PartitionMap.matches(data) {
            return Err(ApmError::parse(
                ENTRY_SIGNATURE_OFFSET as u64,
                format!(
                    "Invalid partition signature: 0x{:04X}",
                    read_u16_be(data, ENTRY_SIGNATURE_OFFSET)
                ),
            ));
        }

        Ok(Self {
            signature: PARTITION_MAP_SIGNATURE,
            map_entries: read_u32_be(data, ENTRY_COUNT_OFFSET),
            start: read_u32_be(data, ENTRY_START_OFFSET),
            length: read_u32_be(data, ENTRY_LENGTH_OFFSET),
            name: decode_text(&data[ENTRY_NAME_OFFSET..ENTRY_NAME_OFFSET + ENTRY_TEXT_LEN]),
            partition_type: decode_text(
                &data[ENTRY_TYPE_OFFSET..ENTRY_TYPE_OFFSET + ENTRY_TEXT_LEN],
            ),
            data_start: read_u32_be(data, ENTRY_DATA_START_OFFSET),
            data_length: read_u32_be(data, ENTRY_DATA_LENGTH_OFFSET),
        })
    }

    /// Encode the entry into a 512-byte block
    pub fn to_block(&self) -> [u8; BLOCK_LEN] {
        let mut block = [0u8; BLOCK_LEN];
        block[ENTRY_SIGNATURE_OFFSET..ENTRY_SIGNATURE_OFFSET + 2].copy_from_slice(&self.signature);
        write_u32_be(&mut block, ENTRY_COUNT_OFFSET, self.map_entries);
        write_u32_be(&mut block, ENTRY_START_OFFSET, self.start);
        write_u32_be(&mut block, ENTRY_LENGTH_OFFSET, self.length);
        encode_text(
            &self.name,
            &mut block[ENTRY_NAME_OFFSET..ENTRY_NAME_OFFSET + ENTRY_TEXT_LEN],
        );
        encode_text(
            &self.partition_type,
            &mut block[ENTRY_TYPE_OFFSET..ENTRY_TYPE_OFFSET + ENTRY_TEXT_LEN],
        );
        write_u32_be(&mut block, ENTRY_DATA_START_OFFSET, self.data_start);
        write_u32_be(&mut block, ENTRY_DATA_LENGTH_OFFSET, self.data_length);
        block
    }

    /// Check if this partition holds an HFS volume
    pub fn is_hfs(&self) -> bool {
        self.partition_type == APPLE_HFS_TYPE
    }

    /// Check if this is the map's own self-describing entry
    pub fn is_partition_map(&self) -> bool {
        self.partition_type == APPLE_PARTITION_MAP_TYPE
    }

    /// First sector after the partition, if it fits in 32 bits
    pub fn end(&self) -> Option<u32> {
        self.start.checked_add(self.length)
    }

    /// Size of the partition in bytes
    pub fn size_bytes(&self) -> u64 {
        self.length as u64 * BLOCK_SIZE
    }
}

/// Driver descriptor block at the very start of a multi-partition disc
///
/// Not a partition map entry. It is treated as a one-sector pseudo partition
/// at slot 0 so ranges can start at the disc header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscHeader {
    /// Device block size
    pub block_size: u16,
    /// Number of blocks on the device
    pub block_count: u32,
}

impl DiscHeader {
    /// Pseudo start sector of the header
    pub const START: u32 = 0;
    /// Pseudo length of the header in sectors
    pub const LENGTH: u32 = 1;

    /// Parse the header, returning `None` unless the block starts with "ER"
    pub fn parse(data: &[u8]) -> Option<Self> {
        if !Signature::DiscHeader.matches(data) {
            return None;
        }
        let block_size = if data.len() >= 4 { read_u16_be(data, 2) } else { 0 };
        let block_count = if data.len() >= 8 { read_u32_be(data, 4) } else { 0 };
        Some(Self {
            block_size,
            block_count,
        })
    }

    /// Encode the header into a 512-byte block
    pub fn to_block(&self) -> [u8; BLOCK_LEN] {
        let mut block = [0u8; BLOCK_LEN];
        block[..2].copy_from_slice(&DISC_HEADER_SIGNATURE);
        block[2..4].copy_from_slice(&self.block_size.to_be_bytes());
        write_u32_be(&mut block, 4, self.block_count);
        block
    }
}
