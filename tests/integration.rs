/// Integration tests for apmtool

use apmtool::format::constants::*;
use apmtool::format::write_u32_be;
use apmtool::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Disc with a map entry, a driver and an HFS volume with a boot block
fn sample_disc() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("disc.img");
    let mut data = ApmImageBuilder::new()
        .map_blocks(8)
        .partition("Macintosh", "Apple_Driver43", 10, 4)
        .partition("Macintosh HD", "Apple_HFS", 14, 8)
        .zeroed()
        .build()
        .expect("Failed to build image");

    let volume = 14 * BLOCK_LEN;
    data[volume..volume + 2].copy_from_slice(b"LK");
    data[volume + 26] = 6;
    data[volume + 27..volume + 33].copy_from_slice(b"Finder");
    let mdb = volume + MDB_OFFSET as usize;
    data[mdb..mdb + 2].copy_from_slice(b"BD");
    data[mdb + 36] = 7;
    data[mdb + 37..mdb + 44].copy_from_slice(b"Classic");

    std::fs::write(&path, &data).expect("Failed to write image");
    (dir, path)
}

fn set_count(path: &Path, slot: u32, count: u32) {
    let mut data = std::fs::read(path).expect("Failed to read image");
    write_u32_be(&mut data, slot_offset(slot) as usize + ENTRY_COUNT_OFFSET, count);
    std::fs::write(path, &data).expect("Failed to write image");
}

#[test]
fn test_list_partitions() {
    let (_dir, path) = sample_disc();

    assert_eq!(verify_file(&path).unwrap(), ImageKind::MultiPartitionImage);
    let map = PartitionMap::open(&path).expect("Failed to open map");
    assert_eq!(map.count(), 3);

    let rows: Vec<(String, String, u32, u32)> = map
        .slots()
        .map(|slot| {
            (
                map.name(slot).unwrap(),
                map.partition_type(slot).unwrap(),
                map.start(slot).unwrap(),
                map.length(slot).unwrap(),
            )
        })
        .collect();

    let row = |name: &str, partition_type: &str, start: u32, length: u32| {
        (name.to_string(), partition_type.to_string(), start, length)
    };
    assert_eq!(rows[0], row("Apple", "Apple_partition_map", 1, 8));
    assert_eq!(rows[1], row("Macintosh", "Apple_Driver43", 10, 4));
    assert_eq!(rows[2], row("Macintosh HD", "Apple_HFS", 14, 8));
}

#[test]
fn test_count_is_stable() {
    let (_dir, path) = sample_disc();
    assert_eq!(partition_count(&path).unwrap(), 3);
    assert_eq!(partition_count(&path).unwrap(), 3);
}

#[test]
fn test_forced_count_makes_map_untrusted() {
    let (_dir, path) = sample_disc();
    set_count(&path, 3, 4);

    let result = partition_count(&path);
    assert!(matches!(result, Err(ApmError::InconsistentMap { entries: 3, .. })));

    let scan = scan_file(&path).unwrap();
    assert!(scan.dirty);
    assert!(!scan.is_consistent());

    // Every accessor refuses an untrusted map
    assert!(partition_name(&path, 1).unwrap_err().is_untrusted_map());
    assert!(append_partitions(&path, path.with_extension("out"), 1, 1).is_err());
}

#[test]
fn test_extract_driver_partition() {
    let (dir, path) = sample_disc();
    let out = dir.path().join("driver.bin");

    let result = append_partitions(&path, &out, 2, 2).unwrap();
    assert_eq!(result.bytes_written, 4 * 512);

    let source = std::fs::read(&path).unwrap();
    let copied = std::fs::read(&out).unwrap();
    assert_eq!(copied.len(), 4 * 512);
    assert_eq!(copied, &source[10 * 512..14 * 512]);
}

#[test]
fn test_extract_hfs_volume_is_raw_partition() {
    let (dir, path) = sample_disc();
    let out = dir.path().join("volume.img");

    append_partitions(&path, &out, 3, 3).unwrap();

    assert_eq!(verify_file(&out).unwrap(), ImageKind::RawPartition);
    let info = VolumeInfo::read(&out, 0).unwrap();
    assert!(info.boot_block.is_bootable());
    assert_eq!(info.boot_block.shell_name, "Finder");
    assert!(info.mdb.is_hfs());
    assert_eq!(info.mdb.volume_name, "Classic");
}

#[test]
fn test_volume_info_through_map() {
    let (_dir, path) = sample_disc();
    let map = PartitionMap::open(&path).unwrap();
    let info = map.volume_info(3).unwrap();
    assert_eq!(info.start, 14);
    assert_eq!(info.mdb.volume_name, "Classic");
    assert_eq!(map.hfs_count().unwrap(), 1);
}

#[test]
fn test_relocate_appends_entry() {
    let (_dir, path) = sample_disc();

    let result = copy_partition_block(&path, &path, 3, 4, true).unwrap();
    assert_eq!(result.fix, OffsetFix::FromPredecessor(22));
    assert_eq!(result.map_entries, 4);

    let map = PartitionMap::open(&path).unwrap();
    assert_eq!(map.count(), 4);
    assert_eq!(map.start(4).unwrap(), 22);
    assert_eq!(map.length(4).unwrap(), 8);
    assert_eq!(map.name(4).unwrap(), "Macintosh HD");
    for entry in map.entries().unwrap() {
        assert_eq!(entry.map_entries, 4);
    }
}

#[test]
fn test_driver_repair_workflow() {
    let dir = tempfile::tempdir().unwrap();

    // Driver source: header, map and two driver partitions
    let drivers = dir.path().join("drivers.img");
    ApmImageBuilder::new()
        .map_blocks(4)
        .partition("Macintosh", "Apple_Driver43", 5, 6)
        .partition("Patch Partition", "Apple_Patches", 11, 2)
        .write_to(&drivers)
        .unwrap();
    let driver_map = verify_drivers(&drivers).unwrap();
    assert_eq!(driver_map.count(), 3);

    // Raw volume lacking any partition map
    let volume = dir.path().join("volume.img");
    let mut raw = vec![0u8; 8 * BLOCK_LEN];
    raw[..2].copy_from_slice(b"LK");
    std::fs::write(&volume, &raw).unwrap();
    assert_eq!(verify_file(&volume).unwrap(), ImageKind::RawPartition);
    assert!(matches!(partition_count(&volume), Err(ApmError::MapAbsent)));

    // Header, map and drivers first, then the volume
    let fixed = dir.path().join("fixed.img");
    let head = append_partitions(&drivers, &fixed, 0, 3).unwrap();
    assert_eq!(head.bytes_written, 13 * 512);
    let mut data = std::fs::read(&fixed).unwrap();
    data.extend_from_slice(&raw);
    std::fs::write(&fixed, &data).unwrap();

    // Add an entry for the volume after the patches partition
    let result = copy_partition_block(&drivers, &fixed, 3, 4, true).unwrap();
    assert_eq!(result.fix, OffsetFix::FromPredecessor(13));

    let map = PartitionMap::open(&fixed).unwrap();
    assert_eq!(map.count(), 4);
    assert_eq!(map.start(4).unwrap(), 13);
}

#[test]
fn test_unrecognized_and_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let junk = dir.path().join("junk.bin");
    std::fs::write(&junk, b"hello world, not a disc").unwrap();

    assert_eq!(verify_file(&junk).unwrap(), ImageKind::Unrecognized);
    assert!(matches!(
        verify_drivers(&junk),
        Err(ApmError::MapAbsent)
    ));
    assert!(matches!(
        verify_file(dir.path().join("missing.img")),
        Err(ApmError::NotFound(_))
    ));
}

#[test]
fn test_block_dump() {
    let (_dir, path) = sample_disc();
    let block = read_block(&path, 1).unwrap();
    assert_eq!(block.len(), 512);
    assert_eq!(detect_signature(&block), Some(Signature::PartitionMap));
}
