//! Offset-indexed binary tables for the Kotoba knowledge base.
//!
//! Every entity table (categories, words, sentences, the three base indices)
//! is stored in the same little-endian container:
//!
//! ```text
//! u32          entry_count
//! u32[N + 1]   offset        offset[i] = start of record i; offset[N] = payload length
//! bytes        payload       N variable-length records in id order
//! u32[N]       ident         word tables only: identity key per record
//! ```
//!
//! Record bodies are described on the types in [`record`]. String lengths are
//! UTF-8 byte counts; span marks are codepoint counts.
//!
//! Writing goes through [`TableBuilder`], reading through [`Table`]. Decoded
//! records borrow their text from the table buffer.
//!
//! ```rust
//! use kotoba_kdb::{Layout, SentenceRecord, Table, TableBuilder};
//!
//! # fn main() -> Result<(), kotoba_kdb::KdbError> {
//! let mut builder = TableBuilder::new(Layout::Plain);
//! builder.push(&SentenceRecord { reading: "ねこ", translation: "cat" })?;
//! let bytes = builder.finish()?;
//!
//! let table = Table::parse(&bytes, Layout::Plain)?;
//! let sentence: SentenceRecord = table.record(0)?;
//! assert_eq!(sentence.translation, "cat");
//! # Ok(()) }
//! ```

pub mod record;
mod table;
mod wire;

use thiserror::Error;

pub use record::{
    BaseRecord, CategoryRecord, PackedWord, Record, RefRecord, SentenceRecord, WordRecord,
};
pub use table::{Layout, Table, TableBuilder};

/// Largest word id that fits beside a 4-bit rank in a packed base reference.
pub const MAX_PACKED_WORD_ID: u32 = 0x0FFF_FFFF;

#[derive(Debug, Error)]
pub enum KdbError {
    #[error("truncated data: needed {needed} bytes at offset {at}, only {len} available")]
    Truncated { at: usize, needed: usize, len: usize },
    #[error("record {index} has invalid offsets {start}..{end} (payload length {payload})")]
    BadOffset {
        index: usize,
        start: u32,
        end: u32,
        payload: usize,
    },
    #[error("invalid utf-8 text: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("payload of {0} bytes exceeds the u32 offset range")]
    PayloadTooLarge(usize),
    #[error("word id {0} does not fit in 28 bits")]
    WordIdOutOfRange(u32),
    #[error("table has {records} records but {idents} identity keys")]
    IdentCountMismatch { records: usize, idents: usize },
    #[error("record {0} does not exist")]
    NoSuchRecord(u32),
}
