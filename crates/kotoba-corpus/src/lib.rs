//! Load the Kotoba input artifacts into indexable repositories.
//!
//! Three repositories are built from the pre-extracted inputs:
//! - [`CategoryIndex`]: the fixed category taxonomy (JLPT levels, newspaper
//!   frequency bands, source-corpus labels).
//! - [`SentenceRepository`]: the example-sentence corpus, with exact
//!   base-form lookups and a substring fallback scan.
//! - [`WordRepository`]: the flattened dictionary word list together with its
//!   literal, reading and gloss reverse maps.
//!
//! Each repository owns its entities in a `Vec`; cross references are arena
//! indices. Input files are read either memory-mapped or into owned buffers,
//! chosen at runtime via [`LoadMode`].
//!
//! Malformed records are logged with `tracing` and skipped. Only failures to
//! open or decode a whole file surface as errors.
//!
//! # Example
//! ```no_run
//! use kotoba_corpus::{CategoryIndex, LoadMode, SentenceRepository, WordRepository};
//! use kotoba_types::BaseKind;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut categories = CategoryIndex::standard();
//! let words = WordRepository::load("words.xml", LoadMode::Mmap, &mut categories)?;
//! let sentences = SentenceRepository::load("sentences.pipe", LoadMode::Mmap)?;
//!
//! for word in words.iter().take(10) {
//!     for form in &word.literals {
//!         let hits = sentences.lookup_base(BaseKind::Literal, form);
//!         println!("{form}: {} sentences", hits.len());
//!     }
//! }
//! # Ok(()) }
//! ```

mod category;
mod sentence;
mod word;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;

pub use category::{Category, CategoryIndex};
pub use sentence::{Sentence, SentenceRepository};
pub use word::{Word, WordRepository};

/// Strategy for reading input files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the input file (fast, no copy of the raw bytes).
    Mmap,
    /// Read the input file into an owned buffer (portable fallback).
    Owned,
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            // An empty file cannot be mapped on every platform.
            if file.metadata().map(|m| m.len() == 0).unwrap_or(false) {
                return Ok(Buffer::Owned(Vec::new()));
            }
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r") {
        &line[..line.len() - 1]
    } else {
        line
    }
}
