use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for partition map operations
pub type Result<T> = std::result::Result<T, ApmError>;

/// Errors that can occur when working with Apple Partition Map images
#[derive(Debug, Error)]
pub enum ApmError {
    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Requested slot lies beyond the walked partition count
    #[error("Partition {slot} out of range (map has {count} entries)")]
    OutOfRange {
        /// Requested slot
        slot: u32,
        /// Number of entries in the map
        count: u32,
    },

    /// No partition map entry was found at slot 1
    #[error("No partition map found")]
    MapAbsent,

    /// Entries disagree about the total number of partitions
    #[error("Inconsistent partition map: {entries} entries found, map reports {reported}")]
    InconsistentMap {
        /// Number of contiguous "PM" entries found
        entries: u32,
        /// Last count reported by the entries themselves
        reported: u32,
    },

    /// Block 0 does not carry the driver descriptor signature
    #[error("No disc header at block 0")]
    NoDiscHeader,

    /// Leading signature bytes match none of the known layouts
    #[error("Unrecognized format: {0}")]
    UnrecognizedFormat(String),

    /// Driver source needs more than one map entry
    #[error("Too few partitions: {0} (need more than 1)")]
    TooFewPartitions(u32),

    /// Relocation target has no usable predecessor for offset fixing
    #[error("Cannot fix start offset when relocating to slot {to}")]
    InvalidRelocation {
        /// Destination slot
        to: u32,
    },

    /// Source image ended before a partition was fully copied
    #[error("Partition {slot} truncated: expected {expected} bytes, copied {copied}")]
    Truncated {
        /// Partition being copied
        slot: u32,
        /// Bytes the map says the partition holds
        expected: u64,
        /// Bytes actually available
        copied: u64,
    },

    /// Parse error at specific offset
    #[error("Parse error at offset {offset}: {message}")]
    ParseError {
        /// Byte offset where error occurred
        offset: u64,
        /// Error message
        message: String,
    },
}

impl ApmError {
    /// Create a parse error with context
    pub fn parse<S: Into<String>>(offset: u64, message: S) -> Self {
        ApmError::ParseError {
            offset,
            message: message.into(),
        }
    }

    /// Create an unrecognized format error
    pub fn unrecognized<S: Into<String>>(message: S) -> Self {
        ApmError::UnrecognizedFormat(message.into())
    }

    /// Create an out of range error
    pub fn out_of_range(slot: u32, count: u32) -> Self {
        ApmError::OutOfRange { slot, count }
    }

    /// True when the error means the map itself cannot be trusted
    pub fn is_untrusted_map(&self) -> bool {
        matches!(self, ApmError::MapAbsent | ApmError::InconsistentMap { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApmError::OutOfRange { slot: 7, count: 4 };
        assert_eq!(
            err.to_string(),
            "Partition 7 out of range (map has 4 entries)"
        );
    }

    #[test]
    fn test_parse_error() {
        let err = ApmError::parse(512, "Invalid signature");
        assert_eq!(
            err.to_string(),
            "Parse error at offset 512: Invalid signature"
        );
    }

    #[test]
    fn test_untrusted_map() {
        assert!(ApmError::MapAbsent.is_untrusted_map());
        assert!(ApmError::InconsistentMap { entries: 3, reported: 4 }.is_untrusted_map());
        assert!(!ApmError::NoDiscHeader.is_untrusted_map());
    }
}
