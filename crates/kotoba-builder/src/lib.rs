//! Build the Kotoba knowledge base: match dictionary words to example
//! sentences, collapse the keyword indices, number every entity densely and
//! write the `.kdb` tables.

pub mod base;
pub mod crossref;
pub mod export;
pub mod ids;
pub mod pipeline;
pub mod stats;

pub use base::{BaseEntry, BaseTable, build_base, collapse_ranks};
pub use crossref::{CrossReferencer, MatchOutcome, MatchPolicy, MatchReport, Tier, thin_refs};
pub use ids::IdMap;
pub use pipeline::{BuildOptions, CATEGORY_FILE, SENTENCE_FILE, WORD_FILE, build, write_outputs};
pub use stats::{BuildStats, TierCounts};
