/// Partition map entries, walking and validated access

/// Entry and disc header records
pub mod entry;
/// Map walking and consistency checking
pub mod walker;

pub use entry::{DiscHeader, PartitionEntry};
pub use walker::{partition_count, scan_file, scan_map, MapScan};

use crate::error::{ApmError, Result};
use crate::format::constants::*;
use crate::format::{decode_text, read_u32_be};
use crate::io::{open_image, read_at};
use crate::volume::VolumeInfo;
use std::io::{Read, Seek, SeekFrom};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A partition map that has been walked and found consistent
///
/// Holds the image path and the entry count captured when it was opened.
/// Every accessor opens the image, reads what it needs and closes it again;
/// nothing else is cached. Reopen the map after editing the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMap {
    path: PathBuf,
    count: u32,
}

impl PartitionMap {
    /// Walk the map of an image and keep it if it is consistent
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let count = partition_count(&path)?;
        debug!(path = %path.display(), count, "Opened partition map");
        Ok(Self { path, count })
    }

    /// Path of the image
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries in the map, including the map's own entry
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Slots holding map entries (1-based)
    pub fn slots(&self) -> RangeInclusive<u32> {
        FIRST_MAP_SLOT..=self.count
    }

    fn check_slot(&self, slot: u32) -> Result<()> {
        if slot > self.count {
            warn!(slot, count = self.count, "Partition out of range");
            return Err(ApmError::out_of_range(slot, self.count));
        }
        Ok(())
    }

    fn check_entry_slot(&self, slot: u32) -> Result<()> {
        if slot < FIRST_MAP_SLOT {
            return Err(ApmError::out_of_range(slot, self.count));
        }
        self.check_slot(slot)
    }

    /// Read `len` bytes of a field in the entry at `slot`
    fn read_field(&self, slot: u32, offset: usize, len: usize) -> Result<Vec<u8>> {
        let mut file = open_image(&self.path)?;
        file.seek(SeekFrom::Start(slot_offset(slot) + offset as u64))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_u32_field(&self, slot: u32, offset: usize) -> Result<u32> {
        let buf = self.read_field(slot, offset, 4)?;
        Ok(read_u32_be(&buf, 0))
    }

    /// Read the disc header at block 0
    pub fn header(&self) -> Result<DiscHeader> {
        let mut file = open_image(&self.path)?;
        let block = read_at(&mut file, 0, 8)?;
        DiscHeader::parse(&block).ok_or(ApmError::NoDiscHeader)
    }

    /// Partition name of the entry at `slot`
    pub fn name(&self, slot: u32) -> Result<String> {
        self.check_entry_slot(slot)?;
        let field = self.read_field(slot, ENTRY_NAME_OFFSET, ENTRY_TEXT_LEN)?;
        Ok(decode_text(&field))
    }

    /// Partition type of the entry at `slot`
    pub fn partition_type(&self, slot: u32) -> Result<String> {
        self.check_entry_slot(slot)?;
        let field = self.read_field(slot, ENTRY_TYPE_OFFSET, ENTRY_TEXT_LEN)?;
        Ok(decode_text(&field))
    }

    /// Start sector of the partition at `slot`
    ///
    /// Slot 0 is the disc header, which starts at sector 0.
    pub fn start(&self, slot: u32) -> Result<u32> {
        self.check_slot(slot)?;
        if slot == 0 {
            self.header()?;
            return Ok(DiscHeader::START);
        }
        self.read_u32_field(slot, ENTRY_START_OFFSET)
    }

    /// Length in sectors of the partition at `slot`
    ///
    /// Slot 0 is the disc header, which is one sector long.
    pub fn length(&self, slot: u32) -> Result<u32> {
        self.check_slot(slot)?;
        if slot == 0 {
            self.header()?;
            return Ok(DiscHeader::LENGTH);
        }
        self.read_u32_field(slot, ENTRY_LENGTH_OFFSET)
    }

    /// Start sector and length of the partition at `slot`
    pub fn extent(&self, slot: u32) -> Result<(u32, u32)> {
        Ok((self.start(slot)?, self.length(slot)?))
    }

    /// Decode the whole entry at `slot`
    pub fn entry(&self, slot: u32) -> Result<PartitionEntry> {
        self.check_entry_slot(slot)?;
        let block = self.read_field(slot, 0, BLOCK_LEN)?;
        PartitionEntry::parse(&block)
    }

    /// Decode every entry in map order
    pub fn entries(&self) -> Result<Vec<PartitionEntry>> {
        let mut file = open_image(&self.path)?;
        let mut entries = Vec::with_capacity(self.count as usize);
        for slot in self.slots() {
            let block = read_at(&mut file, slot_offset(slot), BLOCK_LEN)?;
            entries.push(PartitionEntry::parse(&block)?);
        }
        Ok(entries)
    }

    /// Count entries whose type field is exactly "Apple_HFS"
    pub fn hfs_count(&self) -> Result<u32> {
        let expected = apple_hfs_type_field();
        let mut file = open_image(&self.path)?;
        let mut count = 0;
        for slot in self.slots() {
            let field = read_at(
                &mut file,
                slot_offset(slot) + ENTRY_TYPE_OFFSET as u64,
                ENTRY_TEXT_LEN,
            )?;
            if field == expected {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Read the boot block and master directory block of a partition
    pub fn volume_info(&self, slot: u32) -> Result<VolumeInfo> {
        let start = self.start(slot)?;
        VolumeInfo::read(&self.path, start)
    }
}

/// Name of the partition at `slot`, walking the map first
pub fn partition_name<P: AsRef<Path>>(path: P, slot: u32) -> Result<String> {
    PartitionMap::open(path)?.name(slot)
}

/// Type of the partition at `slot`, walking the map first
pub fn partition_type<P: AsRef<Path>>(path: P, slot: u32) -> Result<String> {
    PartitionMap::open(path)?.partition_type(slot)
}

/// Start sector of the partition at `slot`, walking the map first
pub fn partition_start<P: AsRef<Path>>(path: P, slot: u32) -> Result<u32> {
    PartitionMap::open(path)?.start(slot)
}

/// Length of the partition at `slot`, walking the map first
pub fn partition_length<P: AsRef<Path>>(path: P, slot: u32) -> Result<u32> {
    PartitionMap::open(path)?.length(slot)
}

/// Number of "Apple_HFS" partitions in the map
pub fn hfs_partition_count<P: AsRef<Path>>(path: P) -> Result<u32> {
    PartitionMap::open(path)?.hfs_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ApmImageBuilder;
    use crate::format::encode_text;
    use tempfile::TempDir;

    fn sample_image() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.img");
        ApmImageBuilder::new()
            .map_blocks(8)
            .partition("Macintosh HD", APPLE_HFS_TYPE, 10, 4)
            .partition("Scratch", "Apple_Free", 14, 2)
            .write_to(&path)
            .unwrap();
        (dir, path)
    }

    #[test]
    fn test_open_counts_entries() {
        let (_dir, path) = sample_image();
        let map = PartitionMap::open(&path).unwrap();
        assert_eq!(map.count(), 3);
        assert_eq!(map.slots(), 1..=3);
    }

    #[test]
    fn test_field_accessors() {
        let (_dir, path) = sample_image();
        let map = PartitionMap::open(&path).unwrap();

        assert_eq!(map.name(1).unwrap(), "Apple");
        assert_eq!(map.partition_type(1).unwrap(), APPLE_PARTITION_MAP_TYPE);
        assert_eq!(map.name(2).unwrap(), "Macintosh HD");
        assert_eq!(map.partition_type(2).unwrap(), APPLE_HFS_TYPE);
        assert_eq!(map.extent(2).unwrap(), (10, 4));
        assert_eq!(map.extent(3).unwrap(), (14, 2));
    }

    #[test]
    fn test_out_of_range() {
        let (_dir, path) = sample_image();
        let map = PartitionMap::open(&path).unwrap();

        assert!(matches!(
            map.name(4),
            Err(ApmError::OutOfRange { slot: 4, count: 3 })
        ));
        assert!(matches!(map.start(9), Err(ApmError::OutOfRange { .. })));
        assert!(matches!(map.partition_type(0), Err(ApmError::OutOfRange { .. })));
    }

    #[test]
    fn test_disc_header_slot() {
        let (_dir, path) = sample_image();
        assert_eq!(partition_start(&path, 0).unwrap(), 0);
        assert_eq!(partition_length(&path, 0).unwrap(), 1);

        let mut data = std::fs::read(&path).unwrap();
        data[..2].copy_from_slice(b"LK");
        std::fs::write(&path, &data).unwrap();

        assert!(matches!(partition_start(&path, 0), Err(ApmError::NoDiscHeader)));
        assert!(matches!(partition_length(&path, 0), Err(ApmError::NoDiscHeader)));
    }

    #[test]
    fn test_name_round_trip_strips_padding() {
        let (_dir, path) = sample_image();
        let name = "Twenty Character Vol";
        assert_eq!(name.len(), 20);

        let mut data = std::fs::read(&path).unwrap();
        let base = BLOCK_LEN * 3 + ENTRY_NAME_OFFSET;
        encode_text(name, &mut data[base..base + ENTRY_TEXT_LEN]);
        std::fs::write(&path, &data).unwrap();

        assert_eq!(partition_name(&path, 3).unwrap(), name);
    }

    #[test]
    fn test_free_functions_refuse_inconsistent_map() {
        let (_dir, path) = sample_image();
        let mut data = std::fs::read(&path).unwrap();
        crate::format::write_u32_be(&mut data, BLOCK_LEN * 2 + ENTRY_COUNT_OFFSET, 4);
        std::fs::write(&path, &data).unwrap();

        let err = partition_name(&path, 1).unwrap_err();
        assert!(err.is_untrusted_map());
    }

    #[test]
    fn test_entries_and_hfs_count() {
        let (_dir, path) = sample_image();
        let map = PartitionMap::open(&path).unwrap();
        let entries = map.entries().unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_partition_map());
        assert!(entries.iter().all(|e| e.map_entries == 3));
        assert_eq!(map.entry(3).unwrap(), entries[2]);
        assert_eq!(hfs_partition_count(&path).unwrap(), 1);
    }

    #[test]
    fn test_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PartitionMap::open(dir.path().join("nope.img")),
            Err(ApmError::NotFound(_))
        ));
    }
}
