/// Partition map walking and consistency checking

use crate::error::{ApmError, Result};
use crate::format::constants::*;
use crate::format::{read_u32_be, Signature};
use crate::io::{open_image, read_at};
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Raw outcome of walking the partition map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapScan {
    /// Number of contiguous "PM" entries starting at slot 1
    pub entries: u32,
    /// Count field of the last entry read, if any
    pub reported: Option<u32>,
    /// Set when any entry disagreed with the one before it
    pub dirty: bool,
}

impl MapScan {
    /// Check whether every entry agrees with the number of entries found
    ///
    /// A lone entry is consistent when it reports a count of one.
    pub fn is_consistent(&self) -> bool {
        self.entries > 0 && !self.dirty && self.reported == Some(self.entries)
    }

    /// Get the trusted partition count, or why it cannot be trusted
    pub fn partition_count(&self) -> Result<u32> {
        if self.entries == 0 {
            return Err(ApmError::MapAbsent);
        }
        if !self.is_consistent() {
            return Err(ApmError::InconsistentMap {
                entries: self.entries,
                reported: self.reported.unwrap_or(0),
            });
        }
        Ok(self.entries)
    }
}

/// Walk the partition map from slot 1 until a non-"PM" block or end of file
///
/// Each entry's count field is compared with the previous entry's. A
/// mismatch marks the walk dirty and the newer value is carried forward.
pub fn scan_map<R: Read + Seek>(reader: &mut R) -> Result<MapScan> {
    let mut scan = MapScan {
        entries: 0,
        reported: None,
        dirty: false,
    };

    let mut slot = FIRST_MAP_SLOT;
    loop {
        let header = read_at(reader, slot_offset(slot), ENTRY_COUNT_OFFSET + 4)?;
        if !Signature::PartitionMap.matches(&header) {
            trace!(slot, "End of partition map");
            break;
        }
        if header.len() < ENTRY_COUNT_OFFSET + 4 {
            warn!(slot, "Partition map entry truncated by end of file");
            break;
        }

        scan.entries += 1;
        let count = read_u32_be(&header, ENTRY_COUNT_OFFSET);
        debug!(slot, count, "Found partition map entry");

        match scan.reported {
            Some(expected) if expected != count => {
                warn!(
                    slot,
                    expected, count, "Partition count differs from previous entry"
                );
                scan.dirty = true;
            }
            _ => {}
        }
        scan.reported = Some(count);

        slot = match slot.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    if scan.entries == 0 {
        debug!("No partition map was found");
    } else if !scan.is_consistent() {
        warn!(
            entries = scan.entries,
            reported = ?scan.reported,
            dirty = scan.dirty,
            "Partition map is inconsistent"
        );
    }

    Ok(scan)
}

/// Walk the partition map of an image file
pub fn scan_file<P: AsRef<Path>>(path: P) -> Result<MapScan> {
    let path = path.as_ref();
    let mut file = open_image(path)?;
    debug!(path = %path.display(), "Walking partition map");
    scan_map(&mut file)
}

/// Count the entries of a consistent partition map
pub fn partition_count<P: AsRef<Path>>(path: P) -> Result<u32> {
    scan_file(path)?.partition_count()
}
