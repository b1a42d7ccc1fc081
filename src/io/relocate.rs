/// Moving partition map entries between slots

use crate::error::{ApmError, Result};
use crate::format::constants::*;
use crate::format::write_u32_be;
use crate::io::{open_image, open_image_rw, read_available};
use crate::map::PartitionMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, warn};

/// How the start sector of a relocated entry was treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetFix {
    /// Start sector copied unchanged
    Unchanged,
    /// Start sector set to the end of the preceding partition
    FromPredecessor(u32),
    /// Entry became the first partition, start sector set to 0
    Zeroed,
}

impl OffsetFix {
    /// Numeric status: 0 unchanged, 1 fixed from predecessor, 2 zeroed
    pub fn status_code(&self) -> i32 {
        match self {
            OffsetFix::Unchanged => 0,
            OffsetFix::FromPredecessor(_) => 1,
            OffsetFix::Zeroed => 2,
        }
    }
}

/// Result of relocating a map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Start sector handling
    pub fix: OffsetFix,
    /// Entry count now written to every live entry
    pub map_entries: u32,
}

/// Copy the map entry at slot `from` of `input` into slot `to` of `output`
///
/// `input` and `output` may be the same image. With `fix_offset` the moved
/// entry's start sector is recomputed: from the preceding entry's
/// `start + length` when `to > 2`, or 0 when `to == 1`. Slot 2 has only the
/// map's own entry before it, so fixing there is refused.
///
/// The count field of slots `1..=previous + 1` is then set to
/// `previous + 1`, reflecting the insertion. All changes are staged in
/// memory and committed with a single write.
pub fn copy_partition_block<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    from: u32,
    to: u32,
    fix_offset: bool,
) -> Result<Relocation> {
    let source = PartitionMap::open(input)?;
    if from < FIRST_MAP_SLOT || from > source.count() {
        return Err(ApmError::out_of_range(from, source.count()));
    }
    let block = read_entry_block(source.path(), from)?;

    let target = PartitionMap::open(output)?;
    let previous = target.count();
    let map_entries = previous
        .checked_add(1)
        .ok_or_else(|| ApmError::out_of_range(to, previous))?;
    if to < FIRST_MAP_SLOT || to > map_entries {
        warn!(to, count = previous, "Relocation target out of range");
        return Err(ApmError::out_of_range(to, previous));
    }

    let fix = if fix_offset {
        resolve_fix(&target, to)?
    } else {
        OffsetFix::Unchanged
    };

    let mut file = open_image_rw(target.path())?;
    let mut staged = stage_map(&mut file, map_entries)?;
    apply_relocation(&mut staged, &block, to, fix, map_entries);
    commit_map(&mut file, &staged)?;

    debug!(from, to, ?fix, map_entries, "Relocated partition map entry");
    Ok(Relocation { fix, map_entries })
}

/// Work out the new start sector for an entry moving to slot `to`
fn resolve_fix(target: &PartitionMap, to: u32) -> Result<OffsetFix> {
    match to - 1 {
        0 => Ok(OffsetFix::Zeroed),
        1 => {
            warn!(to, "No partition precedes the target slot");
            Err(ApmError::InvalidRelocation { to })
        }
        predecessor => {
            let (start, length) = target.extent(predecessor)?;
            let likely = start.checked_add(length).ok_or_else(|| {
                ApmError::parse(
                    slot_offset(predecessor) + ENTRY_START_OFFSET as u64,
                    "Preceding partition ends beyond 32-bit sector range",
                )
            })?;
            Ok(OffsetFix::FromPredecessor(likely))
        }
    }
}

/// Read the raw 512-byte entry at `slot`
fn read_entry_block(path: &Path, slot: u32) -> Result<[u8; BLOCK_LEN]> {
    let mut file = open_image(path)?;
    file.seek(SeekFrom::Start(slot_offset(slot)))?;
    let mut block = [0u8; BLOCK_LEN];
    file.read_exact(&mut block)?;
    Ok(block)
}

/// Read map slots `1..=slots` into memory, zero filling past end of file
fn stage_map<R: Read + Seek>(reader: &mut R, slots: u32) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(PARTITION_MAP_OFFSET))?;
    let mut staged = vec![0u8; slots as usize * BLOCK_LEN];
    read_available(reader, &mut staged)?;
    Ok(staged)
}

/// Byte range of `slot` within a staged map starting at slot 1
fn staged_range(slot: u32) -> std::ops::Range<usize> {
    let base = (slot - FIRST_MAP_SLOT) as usize * BLOCK_LEN;
    base..base + BLOCK_LEN
}

/// Place the entry, fix its start and renumber every entry
fn apply_relocation(staged: &mut [u8], block: &[u8], to: u32, fix: OffsetFix, map_entries: u32) {
    let dest = &mut staged[staged_range(to)];
    dest.copy_from_slice(block);
    match fix {
        OffsetFix::Unchanged => {}
        OffsetFix::FromPredecessor(start) => write_u32_be(dest, ENTRY_START_OFFSET, start),
        OffsetFix::Zeroed => write_u32_be(dest, ENTRY_START_OFFSET, 0),
    }

    for slot in FIRST_MAP_SLOT..=map_entries {
        let range = staged_range(slot);
        write_u32_be(&mut staged[range], ENTRY_COUNT_OFFSET, map_entries);
    }
}

/// Write the staged map back in one go
fn commit_map<W: Write + Seek>(writer: &mut W, staged: &[u8]) -> Result<()> {
    writer.seek(SeekFrom::Start(PARTITION_MAP_OFFSET))?;
    writer.write_all(staged)?;
    writer.flush()?;
    Ok(())
}
