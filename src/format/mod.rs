/// On-disc layout of Apple Partition Map images

/// Layout constants
pub mod constants;

pub use constants::*;

/// Known two-byte signatures found at the start of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// Driver descriptor at block 0 of a multi-partition disc ("ER")
    DiscHeader,
    /// Partition map entry ("PM")
    PartitionMap,
    /// HFS volume boot block ("LK")
    BootBlock,
}

impl Signature {
    /// Get the magic bytes for this signature
    pub fn magic_bytes(&self) -> [u8; 2] {
        match self {
            Signature::DiscHeader => DISC_HEADER_SIGNATURE,
            Signature::PartitionMap => PARTITION_MAP_SIGNATURE,
            Signature::BootBlock => BOOT_BLOCK_SIGNATURE,
        }
    }

    /// Get a human-readable name for this signature
    pub fn name(&self) -> &'static str {
        match self {
            Signature::DiscHeader => "Disc header",
            Signature::PartitionMap => "Partition map entry",
            Signature::BootBlock => "Boot block",
        }
    }

    /// Check whether a block starts with this signature
    pub fn matches(&self, data: &[u8]) -> bool {
        data.len() >= 2 && data[..2] == self.magic_bytes()
    }
}

/// Detect a signature from the leading bytes of a block
pub fn detect_signature(data: &[u8]) -> Option<Signature> {
    [
        Signature::DiscHeader,
        Signature::PartitionMap,
        Signature::BootBlock,
    ]
    .into_iter()
    .find(|sig| sig.matches(data))
}

/// Decode a fixed-width, NUL padded text field
pub fn decode_text(field: &[u8]) -> String {
    String::from_utf8_lossy(field)
        .trim_end_matches('\0')
        .to_string()
}

/// Encode text into a fixed-width, NUL padded field, truncating if needed
pub fn encode_text(text: &str, field: &mut [u8]) {
    field.fill(0);
    let bytes = text.as_bytes();
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
}

/// Decode a Pascal string (length byte followed by up to `max` characters)
pub fn decode_pascal(field: &[u8], max: usize) -> String {
    let Some((&len, rest)) = field.split_first() else {
        return String::new();
    };
    let len = (len as usize).min(max).min(rest.len());
    String::from_utf8_lossy(&rest[..len]).to_string()
}

/// Read a big-endian u16 at an offset
#[inline]
pub fn read_u16_be(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Read a big-endian u32 at an offset
#[inline]
pub fn read_u32_be(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Write a big-endian u32 at an offset
#[inline]
pub fn write_u32_be(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}
