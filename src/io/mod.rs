/// File access for partition images

/// Appending partition payloads to another file
pub mod extract;
/// Moving and renumbering partition map entries
pub mod relocate;

pub use extract::{append_partitions, Extraction};
pub use relocate::{copy_partition_block, OffsetFix, Relocation};

use crate::error::{ApmError, Result};
use crate::format::constants::*;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Map a failed open to `NotFound` when the file is missing
fn map_open_error(path: &Path, err: std::io::Error) -> ApmError {
    if err.kind() == ErrorKind::NotFound {
        ApmError::NotFound(path.to_path_buf())
    } else {
        ApmError::Io(err)
    }
}

/// Open an image read-only
pub(crate) fn open_image(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| map_open_error(path, e))
}

/// Open an existing image for in-place editing
pub(crate) fn open_image_rw(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| map_open_error(path, e))
}

/// Read as many bytes as are available into `buf`, stopping at end of file
pub(crate) fn read_available<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Read bytes at an absolute offset, returning only what the file holds
pub(crate) fn read_at<R: Read + Seek>(reader: &mut R, offset: u64, len: usize) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    let n = read_available(reader, &mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

/// Read one raw 512-byte block from an image
///
/// The last block of an image that is not a multiple of 512 bytes is
/// returned short. Blocks past the end of the file are an error.
pub fn read_block<P: AsRef<Path>>(path: P, index: u32) -> Result<Vec<u8>> {
    let mut file = open_image(path.as_ref())?;
    let offset = slot_offset(index);
    let block = read_at(&mut file, offset, BLOCK_LEN)?;
    if block.is_empty() {
        return Err(ApmError::parse(offset, "Block beyond end of image"));
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_at_stops_at_eof() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        assert_eq!(read_at(&mut cursor, 3, 8).unwrap(), vec![4, 5]);
        assert!(read_at(&mut cursor, 10, 8).unwrap().is_empty());
    }

    #[test]
    fn test_read_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.img");
        let mut data = vec![0u8; BLOCK_LEN * 2 + 10];
        data[BLOCK_LEN] = 0xAA;
        std::fs::write(&path, &data).unwrap();

        let block = read_block(&path, 1).unwrap();
        assert_eq!(block.len(), BLOCK_LEN);
        assert_eq!(block[0], 0xAA);

        assert_eq!(read_block(&path, 2).unwrap().len(), 10);
        assert!(matches!(
            read_block(&path, 3),
            Err(ApmError::ParseError { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.img");
        assert!(matches!(read_block(&path, 0), Err(ApmError::NotFound(p)) if p == path));
    }
}
