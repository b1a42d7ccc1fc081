/// Copying raw partition data out of an image

use crate::error::{ApmError, Result};
use crate::format::constants::*;
use crate::io::open_image;
use crate::map::PartitionMap;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Summary of an extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Number of partitions copied
    pub partitions: u32,
    /// Number of bytes appended to the output
    pub bytes_written: u64,
}

impl Extraction {
    /// Kilobytes appended to the output
    pub fn kilobytes(&self) -> f64 {
        self.bytes_written as f64 / 1024.0
    }
}

/// Location of one partition in the source image
#[derive(Debug, Clone, Copy)]
struct Extent {
    slot: u32,
    start: u32,
    length: u32,
}

/// Append partitions `start..=end` of `input` to `output`
///
/// The output is created if missing and is never truncated, so callers must
/// remove stale outputs themselves. Every partition in the range is resolved
/// before anything is written. If copying fails part way, the output is cut
/// back to the length it had before the call.
pub fn append_partitions<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    start: u32,
    end: u32,
) -> Result<Extraction> {
    let map = PartitionMap::open(input)?;
    append_from_map(&map, output, start, end)
}

/// Append partitions `start..=end` using an already validated map
pub fn append_from_map<Q: AsRef<Path>>(
    map: &PartitionMap,
    output: Q,
    start: u32,
    end: u32,
) -> Result<Extraction> {
    let output = output.as_ref();

    let mut extents = Vec::new();
    for slot in start..=end {
        let (first, length) = map.extent(slot).inspect_err(|e| {
            warn!(slot, error = %e, "Partition not found, nothing extracted");
        })?;
        extents.push(Extent {
            slot,
            start: first,
            length,
        });
    }

    let mut source = open_image(map.path())?;
    let mut dest = OpenOptions::new().create(true).append(true).open(output)?;
    let original_len = dest.metadata()?.len();

    match copy_extents(&mut source, &mut dest, &extents) {
        Ok(extraction) => {
            dest.flush()?;
            debug!(
                output = %output.display(),
                partitions = extraction.partitions,
                bytes = extraction.bytes_written,
                "Extraction complete"
            );
            Ok(extraction)
        }
        Err(e) => {
            warn!(error = %e, "Extraction failed, restoring output length");
            dest.set_len(original_len)?;
            Err(e)
        }
    }
}

/// Stream each extent's sectors from `source` to `dest`
fn copy_extents<R: Read + Seek, W: Write>(
    source: &mut R,
    dest: &mut W,
    extents: &[Extent],
) -> Result<Extraction> {
    let mut extraction = Extraction::default();

    for extent in extents {
        let expected = extent.length as u64 * BLOCK_SIZE;
        source.seek(SeekFrom::Start(sector_offset(extent.start)))?;
        let copied = std::io::copy(&mut source.by_ref().take(expected), dest)?;
        if copied != expected {
            return Err(ApmError::Truncated {
                slot: extent.slot,
                expected,
                copied,
            });
        }

        debug!(
            slot = extent.slot,
            start = extent.start,
            length = extent.length,
            "Copied partition"
        );
        extraction.partitions += 1;
        extraction.bytes_written += copied;
    }

    Ok(extraction)
}
