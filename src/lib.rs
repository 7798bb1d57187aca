//! IDA database file parsing.
//!
//! The `idadb` crate provides Rust types and functions for parsing and
//! querying IDA database files (`.idb` for 32-bit programs, `.i64` for
//! 64-bit) without modifying them.
//!
//! An IDA database is a single container of independently framed sections.
//! The `ID0` section embeds a copy-on-write B-tree holding the key/value
//! records that describe the disassembled program; `ID1` maps program
//! addresses to 32-bit per-byte flags through a segment table; `NAM` lists
//! the addresses of named items; `TIL` carries the type library payload.
//!
//! # Quick example
//!
//! ```no_run
//! use idadb::idb::database::IdaDb;
//!
//! # fn main() -> Result<(), idadb::IdbError> {
//! // Open a database (sections are parsed eagerly)
//! let db = IdaDb::open("kernel32.idb")?;
//! db.validate()?;
//!
//! // Query the B-tree
//! let id0 = db.id0().expect("no ID0 section");
//! let mut cursor = id0.min()?;
//! println!("first key: {:02x?}", cursor.key());
//! cursor.next()?;
//!
//! // Query per-address flags
//! println!("flags: {:#x}", db.flags_at(0x68901000)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`IdaDb`](idb::database::IdaDb) | Open `.idb`/`.i64` files, access sections, flat address queries |
//! | [`Id0`](idb::id0::Id0) | B-tree lookups: exact, prefix, min/max |
//! | [`Cursor`](idb::cursor::Cursor) | Ordered forward/backward traversal of B-tree entries |
//! | [`Id1`](idb::id1::Id1) | Segment table and address → flags queries |
//! | [`Nam`](idb::nam::Nam) | Addresses of named items |
//!
//! # Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`idb::database`] | Container: file header, section directory, section accessors |
//! | [`idb::header`] | File header and section frame parsing |
//! | [`idb::id0`] | B-tree section: pages, entries, lookups |
//! | [`idb::cursor`] | B-tree cursor navigation |
//! | [`idb::id1`] | Flags section: segments, per-address flag words |
//! | [`idb::nam`] | Name section |
//! | [`idb::til`] | Type library section (signature-validated payload) |
//! | [`idb::decode`] | Bounds-checked little-endian primitive decoding |
//! | [`idb::constants`] | File structure signatures, magics, and sizes |

pub mod idb;
pub mod util;

use thiserror::Error;

/// Errors returned by `idadb` operations.
#[derive(Error, Debug)]
pub enum IdbError {
    /// An I/O error occurred while reading the database file.
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed binary data: bad signature or magic, truncated structure,
    /// entries out of key order, or an inconsistent segment table.
    #[error("format error: {0}")]
    Format(String),

    /// Well-formed but unsupported input (compressed section, version != 6).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A lookup found no matching key, or an address fell outside every
    /// segment.
    #[error("not present: {0}")]
    NotPresent(String),

    /// A cursor stepped past the first or last entry, or a segment query ran
    /// off the end of the segment table.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
}
