/// Builder for synthetic partition map images

use crate::error::{ApmError, Result};
use crate::format::constants::*;
use crate::map::{DiscHeader, PartitionEntry};
use std::path::Path;

/// Builder for constructing in-memory Apple Partition Map images
///
/// Produces an "ER" disc header, the map's own entry at slot 1 and one entry
/// per added partition. Every entry reports the total entry count. Partition
/// sectors are filled with a pattern derived from the slot and sector so
/// copies can be told apart.
pub struct ApmImageBuilder {
    map_blocks: u32,
    partitions: Vec<PartitionEntry>,
    fill: bool,
}

impl ApmImageBuilder {
    /// Create a new builder reserving the usual 63 map blocks
    pub fn new() -> Self {
        Self {
            map_blocks: 63,
            partitions: Vec::new(),
            fill: true,
        }
    }

    /// Set the number of blocks reserved for the map itself
    pub fn map_blocks(mut self, map_blocks: u32) -> Self {
        self.map_blocks = map_blocks;
        self
    }

    /// Add a partition at an explicit start sector
    pub fn partition(mut self, name: &str, partition_type: &str, start: u32, length: u32) -> Self {
        self.partitions
            .push(PartitionEntry::new(name, partition_type, start, length));
        self
    }

    /// Add an HFS partition directly after the last partition (or the map)
    pub fn hfs_partition(self, name: &str, length: u32) -> Self {
        let start = self.next_free_sector();
        self.partition(name, APPLE_HFS_TYPE, start, length)
    }

    /// Leave partition sectors zeroed instead of writing a fill pattern
    pub fn zeroed(mut self) -> Self {
        self.fill = false;
        self
    }

    /// First sector after the map and every partition added so far
    pub fn next_free_sector(&self) -> u32 {
        self.partitions
            .iter()
            .filter_map(PartitionEntry::end)
            .fold(FIRST_MAP_SLOT + self.map_blocks, u32::max)
    }

    fn entry_count(&self) -> u32 {
        self.partitions.len() as u32 + 1
    }

    /// Build the image bytes
    pub fn build(&self) -> Result<Vec<u8>> {
        let count = self.entry_count();
        if count > self.map_blocks {
            return Err(ApmError::parse(
                PARTITION_MAP_OFFSET,
                format!("{} entries do not fit in {} map blocks", count, self.map_blocks),
            ));
        }

        let total_sectors = self.next_free_sector();
        let mut data = vec![0u8; total_sectors as usize * BLOCK_LEN];

        if self.fill {
            for (i, partition) in self.partitions.iter().enumerate() {
                if partition.end().is_none() {
                    continue;
                }
                let slot = i as u32 + 2;
                for sector in 0..partition.length {
                    let base = sector_offset(partition.start + sector) as usize;
                    let pattern = (slot as u8).wrapping_mul(0x11) ^ sector as u8;
                    data[base..base + BLOCK_LEN].fill(pattern);
                    data[base..base + 4].copy_from_slice(&sector.to_be_bytes());
                }
            }
        }

        let header = DiscHeader {
            block_size: BLOCK_SIZE as u16,
            block_count: total_sectors,
        };
        data[..BLOCK_LEN].copy_from_slice(&header.to_block());

        let map_entry = PartitionEntry::new("Apple", APPLE_PARTITION_MAP_TYPE, FIRST_MAP_SLOT, self.map_blocks);
        let entries = std::iter::once(&map_entry).chain(self.partitions.iter());
        for (i, entry) in entries.enumerate() {
            let mut entry = entry.clone();
            entry.map_entries = count;
            let base = slot_offset(FIRST_MAP_SLOT + i as u32) as usize;
            data[base..base + BLOCK_LEN].copy_from_slice(&entry.to_block());
        }

        Ok(data)
    }

    /// Build the image and write it to a file
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.build()?)?;
        Ok(())
    }
}

impl Default for ApmImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}
