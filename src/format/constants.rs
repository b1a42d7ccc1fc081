/// Partition map, boot block and master directory block layout

/// Size of a block (Apple) / sector in bytes; partitions are multiples of this
pub const BLOCK_SIZE: u64 = 512;

/// Size of a block as a buffer length
pub const BLOCK_LEN: usize = BLOCK_SIZE as usize;

/// Signature at the very start of a multi-partition disc ("ER")
pub const DISC_HEADER_SIGNATURE: [u8; 2] = *b"ER";

/// Signature at the start of every partition map block ("PM")
pub const PARTITION_MAP_SIGNATURE: [u8; 2] = *b"PM";

/// Signature at the start of an HFS volume boot block ("LK")
pub const BOOT_BLOCK_SIGNATURE: [u8; 2] = *b"LK";

/// Slot holding the first partition map entry
pub const FIRST_MAP_SLOT: u32 = 1;

/// Offset of the first partition map entry in bytes
pub const PARTITION_MAP_OFFSET: u64 = BLOCK_SIZE * FIRST_MAP_SLOT as u64;

// Offsets from the start of each partition map block

/// 2 bytes - block signature, always "PM"
pub const ENTRY_SIGNATURE_OFFSET: usize = 0;

/// 4 bytes - total number of entries in the map
pub const ENTRY_COUNT_OFFSET: usize = 4;

/// 4 bytes - first sector of the partition
pub const ENTRY_START_OFFSET: usize = 8;

/// 4 bytes - length of the partition in sectors
pub const ENTRY_LENGTH_OFFSET: usize = 12;

/// 32 bytes - partition name, left justified and NUL padded
pub const ENTRY_NAME_OFFSET: usize = 16;

/// 32 bytes - partition type, left justified and NUL padded
pub const ENTRY_TYPE_OFFSET: usize = 48;

/// 4 bytes - first sector of data within the partition
pub const ENTRY_DATA_START_OFFSET: usize = 80;

/// 4 bytes - length of data within the partition in sectors
pub const ENTRY_DATA_LENGTH_OFFSET: usize = 84;

/// Width of the name and type text fields
pub const ENTRY_TEXT_LEN: usize = 32;

/// Partition type of an HFS volume
pub const APPLE_HFS_TYPE: &str = "Apple_HFS";

/// Partition type of the map's own self-describing entry
pub const APPLE_PARTITION_MAP_TYPE: &str = "Apple_partition_map";

/// Boot block bytes 2..16 of a volume whose "LK" signature has been zeroed
pub const HEADERLESS_BOOT_PREFIX: [u8; 14] = [
    0x60, 0x00, 0x00, 0x86, 0x44, 0x18, 0x00, 0x00, 0x06, 0x53, 0x79, 0x73, 0x74, 0x65,
];

// Boot block, at the start of a volume

/// 2 bytes - boot block ID, "LK" on a bootable volume
pub const BB_ID_OFFSET: usize = 0;

/// 4 bytes - entry point to the boot code, usually a BRA instruction
pub const BB_ENTRY_OFFSET: usize = 2;

/// 2 bytes - flag byte and boot block version number
pub const BB_VERSION_OFFSET: usize = 6;

/// 2 bytes - used internally
pub const BB_PAGE_FLAGS_OFFSET: usize = 8;

/// 16 bytes - Pascal string, default shell (usually "Finder")
pub const BB_SHELL_NAME_OFFSET: usize = 26;

/// 16 bytes - Pascal string, application launched at boot
pub const BB_HELLO_NAME_OFFSET: usize = 42;

/// Capacity of the boot block name strings
pub const BB_NAME_LEN: usize = 15;

// Master directory block

/// Offset of the master directory block from the start of a volume
pub const MDB_OFFSET: u64 = 1024;

/// HFS master directory block signature ("BD")
pub const HFS_SIGNATURE: [u8; 2] = *b"BD";

/// 2 bytes - volume signature
pub const MDB_SIGNATURE_OFFSET: usize = 0;

/// 4 bytes - volume creation date
pub const MDB_CREATED_OFFSET: usize = 2;

/// 4 bytes - volume last modification date
pub const MDB_MODIFIED_OFFSET: usize = 6;

/// 2 bytes - number of allocation blocks
pub const MDB_ALLOC_BLOCKS_OFFSET: usize = 18;

/// 2 bytes - number of free allocation blocks
pub const MDB_FREE_BLOCKS_OFFSET: usize = 34;

/// 28 bytes - Pascal string, volume name as it mounts on the desktop
pub const MDB_VOLUME_NAME_OFFSET: usize = 36;

/// Capacity of the volume name
pub const MDB_VOLUME_NAME_LEN: usize = 27;

/// 4 bytes - number of files on the volume
pub const MDB_FILE_COUNT_OFFSET: usize = 84;

/// Byte offset of a slot in the image
#[inline]
pub fn slot_offset(slot: u32) -> u64 {
    slot as u64 * BLOCK_SIZE
}

/// Byte offset of a sector in the image
#[inline]
pub fn sector_offset(sector: u32) -> u64 {
    sector as u64 * BLOCK_SIZE
}

/// The "Apple_HFS" type field as stored on disc
pub fn apple_hfs_type_field() -> [u8; ENTRY_TEXT_LEN] {
    let mut field = [0u8; ENTRY_TEXT_LEN];
    field[..APPLE_HFS_TYPE.len()].copy_from_slice(APPLE_HFS_TYPE.as_bytes());
    field
}
