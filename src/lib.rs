/*!
# apmtool

A Rust library for inspecting and repairing Apple Partition Maps on classic
Macintosh disc images.

## Features

- Walk and validate the partition map, flagging inconsistent entry counts
- Read the name, type, start and length of any map entry
- Append raw partition data to another file
- Relocate map entries between slots and renumber the map in place
- Classify images as whole discs, raw partitions or headerless partitions
- Read the boot block and master directory block of HFS volumes

## Quick Start

```rust,no_run
use apmtool::{append_partitions, copy_partition_block, verify_file, ImageKind, PartitionMap};

// Check what kind of image this is
if verify_file("disc.img")? == ImageKind::MultiPartitionImage {
    // Walk the map once and keep the validated handle
    let map = PartitionMap::open("disc.img")?;
    for slot in map.slots() {
        println!("{}: {} ({})", slot, map.name(slot)?, map.partition_type(slot)?);
    }
}

// Copy the disc header and driver partitions into a new file
append_partitions("drivers.img", "fixed.img", 0, 3)?;

// Move an entry to the end of the map, fixing its start sector
copy_partition_block("disc.img", "fixed.img", 2, 4, true)?;
# Ok::<(), apmtool::ApmError>(())
```

## Modules

- `format`: Block layout, signatures and field codecs
- `map`: Partition map entries, walking and the validated map handle
- `io`: Extraction and relocation
- `verify`: Image classification
- `volume`: Boot block and master directory block
- `builder`: Synthetic image construction
- `error`: Error types and Result alias
*/

#![warn(missing_docs)]

/// Synthetic image construction
pub mod builder;
/// Error types and Result alias
pub mod error;
/// Block layout, signatures and field codecs
pub mod format;
/// Extraction and relocation
pub mod io;
/// Partition map entries and walking
pub mod map;
/// Image classification
pub mod verify;
/// Boot block and master directory block
pub mod volume;

// Re-export common types
pub use builder::ApmImageBuilder;
pub use error::{ApmError, Result};
pub use format::{detect_signature, Signature, BLOCK_SIZE};
pub use io::{append_partitions, copy_partition_block, read_block, Extraction, OffsetFix, Relocation};
pub use map::{
    hfs_partition_count, partition_count, partition_length, partition_name, partition_start,
    partition_type, scan_file, DiscHeader, MapScan, PartitionEntry, PartitionMap,
};
pub use verify::{classify, verify_drivers, verify_file, ImageKind};
pub use volume::{BootBlock, MasterDirectoryBlock, VolumeInfo};
