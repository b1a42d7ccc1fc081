/// Image classification and driver source checks

use crate::error::{ApmError, Result};
use crate::format::constants::*;
use crate::format::{detect_signature, Signature};
use crate::io::{open_image, read_at};
use crate::map::PartitionMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// What kind of image a file appears to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Leading bytes match none of the known layouts
    Unrecognized,
    /// A single HFS volume starting with its "LK" boot block
    RawPartition,
    /// A whole disc starting with the "ER" driver descriptor
    MultiPartitionImage,
    /// A raw volume whose "LK" signature has been zeroed
    HeaderlessPartition,
}

impl ImageKind {
    /// Get a human-readable name for this kind
    pub fn name(&self) -> &'static str {
        match self {
            ImageKind::Unrecognized => "Unrecognized",
            ImageKind::RawPartition => "Raw partition",
            ImageKind::MultiPartitionImage => "Multi-partition disc image",
            ImageKind::HeaderlessPartition => "Headerless partition",
        }
    }

    /// Check whether the image is one this library understands
    pub fn is_recognized(&self) -> bool {
        *self != ImageKind::Unrecognized
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classify an image from its first 16 bytes
pub fn classify(leading: &[u8]) -> ImageKind {
    match detect_signature(leading) {
        Some(Signature::BootBlock) => ImageKind::RawPartition,
        Some(Signature::DiscHeader) => ImageKind::MultiPartitionImage,
        _ if leading.len() >= 16
            && leading[..2] == [0, 0]
            && leading[2..16] == HEADERLESS_BOOT_PREFIX =>
        {
            ImageKind::HeaderlessPartition
        }
        _ => ImageKind::Unrecognized,
    }
}

/// Classify an image file by its leading signature bytes
pub fn verify_file<P: AsRef<Path>>(path: P) -> Result<ImageKind> {
    let path = path.as_ref();
    let mut file = open_image(path)?;

    let size = file.metadata()?.len();
    if size % BLOCK_SIZE != 0 {
        warn!(path = %path.display(), size, "Image size is not a multiple of the block size");
    }

    let leading = read_at(&mut file, 0, 16)?;
    let kind = classify(&leading);
    debug!(path = %path.display(), %kind, "Verified image");
    if !kind.is_recognized() {
        warn!(path = %path.display(), "Image format not recognized");
    }
    Ok(kind)
}

/// Check that a file is a usable source of drivers
///
/// The file needs a consistent map of more than one entry, the "ER" disc
/// header at block 0 and a "PM" entry at slot 1. Returns the validated map.
pub fn verify_drivers<P: AsRef<Path>>(path: P) -> Result<PartitionMap> {
    let path = path.as_ref();
    let map = PartitionMap::open(path)?;
    if map.count() <= 1 {
        warn!(path = %path.display(), count = map.count(), "Driver source has too few partitions");
        return Err(ApmError::TooFewPartitions(map.count()));
    }

    let mut file = open_image(path)?;
    let header = read_at(&mut file, 0, 2)?;
    let first_entry = read_at(&mut file, PARTITION_MAP_OFFSET, 2)?;
    if !Signature::DiscHeader.matches(&header) || !Signature::PartitionMap.matches(&first_entry) {
        return Err(ApmError::unrecognized(format!(
            "{} does not start with a disc header and partition map",
            path.display()
        )));
    }

    debug!(path = %path.display(), count = map.count(), "Driver source looks valid");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ApmImageBuilder;

    fn headerless_bytes() -> Vec<u8> {
        let mut data = vec![0u8; 16];
        data[2..].copy_from_slice(&HEADERLESS_BOOT_PREFIX);
        data
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(b"LK`\0"), ImageKind::RawPartition);
        assert_eq!(classify(b"ER\x02\0"), ImageKind::MultiPartitionImage);
        assert_eq!(classify(&headerless_bytes()), ImageKind::HeaderlessPartition);
        assert_eq!(classify(&[0u8; 16]), ImageKind::Unrecognized);
        assert_eq!(classify(b"PM"), ImageKind::Unrecognized);
        assert_eq!(classify(b"L"), ImageKind::Unrecognized);
    }

    #[test]
    fn test_verify_file() {
        let dir = tempfile::tempdir().unwrap();

        let image = dir.path().join("disc.img");
        ApmImageBuilder::new().write_to(&image).unwrap();
        assert_eq!(verify_file(&image).unwrap(), ImageKind::MultiPartitionImage);

        let raw = dir.path().join("raw.img");
        let mut data = headerless_bytes();
        data.resize(1024, 0);
        std::fs::write(&raw, &data).unwrap();
        assert_eq!(verify_file(&raw).unwrap(), ImageKind::HeaderlessPartition);

        let empty = dir.path().join("empty.img");
        std::fs::write(&empty, b"").unwrap();
        assert_eq!(verify_file(&empty).unwrap(), ImageKind::Unrecognized);
    }

    #[test]
    fn test_verify_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            verify_file(dir.path().join("missing.img")),
            Err(ApmError::NotFound(_))
        ));
    }

    #[test]
    fn test_verify_drivers() {
        let dir = tempfile::tempdir().unwrap();

        let drivers = dir.path().join("drivers.img");
        ApmImageBuilder::new()
            .map_blocks(4)
            .partition("Macintosh", "Apple_Driver43", 5, 20)
            .write_to(&drivers)
            .unwrap();
        assert_eq!(verify_drivers(&drivers).unwrap().count(), 2);

        let lone = dir.path().join("lone.img");
        ApmImageBuilder::new().map_blocks(4).write_to(&lone).unwrap();
        assert!(matches!(verify_drivers(&lone), Err(ApmError::TooFewPartitions(1))));
    }

    #[test]
    fn test_verify_drivers_needs_disc_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drivers.img");
        let mut data = ApmImageBuilder::new()
            .map_blocks(4)
            .partition("Macintosh", "Apple_Driver43", 5, 20)
            .build()
            .unwrap();
        data[..2].copy_from_slice(&[0, 0]);
        std::fs::write(&path, &data).unwrap();

        assert!(matches!(
            verify_drivers(&path),
            Err(ApmError::UnrecognizedFormat(_))
        ));
    }
}
