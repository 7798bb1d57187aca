//! IDA database file structure constants.
//!
//! These values describe the version-6 container format: the file header
//! signatures, the section directory order, and the fixed layouts of the
//! ID0/ID1/NAM/TIL section headers.

// ── File header ─────────────────────────────────────────────────────

/// Signature of a 32-bit database (`.idb`).
pub const SIGNATURE_IDA1: &[u8; 4] = b"IDA1";
/// Signature of a 64-bit database (`.i64`).
pub const SIGNATURE_IDA2: &[u8; 4] = b"IDA2";
/// Second magic word, at byte 26 of the file header.
pub const HEADER_MAGIC: u32 = 0xAABB_CCDD;
/// The only supported container format version.
pub const SUPPORTED_VERSION: u16 = 6;
/// Total size of the file header in bytes.
pub const FILE_HEADER_SIZE: usize = 88;

/// Number of section slots in the header's directory.
pub const SECTION_SLOT_COUNT: usize = 6;
/// Positional names of the section slots.
pub const SECTION_NAMES: [&str; SECTION_SLOT_COUNT] = ["id0", "id1", "nam", "seg", "til", "id2"];

/// Size of a section frame header (compression flag + length).
pub const SECTION_FRAME_SIZE: usize = 9;

// ── ID0 (B-tree) ────────────────────────────────────────────────────

/// ID0 section signature.
pub const ID0_SIGNATURE: &[u8; 9] = b"B-tree v2";
/// Size of the fixed ID0 section header.
pub const ID0_HEADER_SIZE: usize = 28;
/// Size of one entry pointer in a page's entry index.
pub const SIZEOF_ENTRY_POINTER: usize = 6;
/// Size of the page prologue (ppointer + entry count) preceding the entry
/// area. Stored entry offsets are relative to the page start, so this is
/// subtracted when seeking within the entry area.
pub const PAGE_PROLOGUE_SIZE: usize = 6;
/// Upper bound on the root-to-leaf path length. Real trees are a handful of
/// levels deep; exceeding this means a page cycle.
pub const MAX_TREE_DEPTH: usize = 32;

// ── ID1 / NAM ───────────────────────────────────────────────────────

/// Section signature shared by ID1 and NAM (`VA*\0`).
pub const VA_SIGNATURE: &[u8; 4] = b"VA*\x00";
/// Fixed page size of the ID1 and NAM sections.
pub const VA_PAGE_SIZE: usize = 0x2000;
/// Expected constant at offset 4 of the ID1 and NAM headers.
pub const VA_MAGIC_3: u32 = 0x3;
/// Expected constant stored later in the ID1 and NAM headers.
pub const VA_MAGIC_800: u32 = 0x800;
/// Fixed portion of the ID1 header before the segment bounds.
pub const ID1_FIXED_HEADER_SIZE: usize = 0x14;
/// Bytes of flags stored per mapped address.
pub const FLAGS_WORD_SIZE: u64 = 4;

// ── TIL ─────────────────────────────────────────────────────────────

/// TIL section signature.
pub const TIL_SIGNATURE: &[u8; 6] = b"IDATIL";

// ── Word sizes ──────────────────────────────────────────────────────

/// Word size of a 32-bit database.
pub const WORDSIZE_32: usize = 4;
/// Word size of a 64-bit database.
pub const WORDSIZE_64: usize = 8;
