//! Shared types for building the Kotoba dictionary knowledge base.
//!
//! Entities live in per-repository arenas; everything that points across
//! repositories is an arena index (`u32`) rather than a reference, so the
//! word, sentence and category graphs never form ownership cycles.
//!
//! Text offsets come in two units that are never interchangeable: string
//! lengths are UTF-8 byte counts, span marks are codepoint counts. The helpers
//! here ([`codepoint_len`], [`codepoint_offset`]) convert between them.
//!
//! ```rust
//! use kotoba_types::{parse_annotations, sanitize_gloss};
//!
//! let spans = parse_annotations("食べる@たべる@2@5");
//! assert_eq!(spans[0].reading_base, "たべる");
//! assert_eq!(sanitize_gloss("to eat (food)"), vec!["eat"]);
//! ```

use std::fmt;

use unicode_general_category::{GeneralCategory, get_general_category};

/// Highest rank a word can carry inside a base table (4 bits when packed).
pub const MAX_RANK: u8 = 15;

/// Maximum number of tokens a single gloss contributes to the gloss index.
pub const MAX_GLOSS_TOKENS: usize = 16;

/// Gloss tokens must be longer than this many characters to be indexed.
pub const MIN_GLOSS_TOKEN_CHARS: usize = 2;

/// Which side of a sentence annotation a reverse-map key comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BaseKind {
    /// Written base form (`食べる`).
    Literal,
    /// Phonetic base form (`たべる`).
    Reading,
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BaseKind::Literal => "literal",
            BaseKind::Reading => "reading",
        })
    }
}

/// One `literal@reading@start@end` segment of a sentence annotation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Annotation<'a> {
    pub literal_base: &'a str,
    pub reading_base: &'a str,
    pub start: u32,
    pub end: u32,
}

/// A span of an example sentence illustrating a word.
///
/// `sentence` is the arena index of the sentence inside its repository, not
/// the dense id; `start`/`end` are codepoint marks into the literal text.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SentenceRef {
    pub sentence: u32,
    pub start: u32,
    pub end: u32,
}

/// A word listed under a base keyword together with its sense rank.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct WordRank {
    pub word: u32,
    pub rank: u8,
}

impl WordRank {
    /// Build a rank entry, saturating `rank` at [`MAX_RANK`].
    pub fn new(word: u32, rank: usize) -> Self {
        Self {
            word,
            rank: rank.min(MAX_RANK as usize) as u8,
        }
    }
}

/// A dictionary sense: part-of-speech tag plus glosses in source order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Sense {
    pub pos: String,
    pub glosses: Vec<String>,
}

/// Parse the `segment(;segment)*` annotation mini-language.
///
/// Segments with fewer than four `@`-separated fields, or whose marks are not
/// unsigned integers, are dropped. Extra fields are ignored.
pub fn parse_annotations(raw: &str) -> Vec<Annotation<'_>> {
    raw.split(';')
        .filter_map(|segment| {
            let mut fields = segment.split('@');
            let literal_base = fields.next()?.trim();
            let reading_base = fields.next()?.trim();
            let start = fields.next()?.trim().parse().ok()?;
            let end = fields.next()?.trim().parse().ok()?;
            Some(Annotation {
                literal_base,
                reading_base,
                start,
                end,
            })
        })
        .collect()
}

/// Number of Unicode scalar values in `text`.
pub fn codepoint_len(text: &str) -> usize {
    text.chars().count()
}

/// Convert a byte offset (on a char boundary) into a codepoint offset.
pub fn codepoint_offset(text: &str, byte_offset: usize) -> usize {
    text.get(..byte_offset).map(codepoint_len).unwrap_or(0)
}

/// Split an English gloss into lowercase index tokens.
///
/// The gloss is cut at the first character that is neither a letter
/// (general category `L*`) nor a space, so parentheticals, punctuation and
/// letter-like numerals end the indexed prefix.
pub fn sanitize_gloss(gloss: &str) -> Vec<String> {
    let mut prefix = String::with_capacity(gloss.len());
    for c in gloss.chars() {
        if !is_letter(c) && c != ' ' {
            break;
        }
        prefix.extend(c.to_lowercase());
    }

    prefix
        .split(' ')
        .map(str::trim)
        .filter(|token| codepoint_len(token) > MIN_GLOSS_TOKEN_CHARS)
        .take(MAX_GLOSS_TOKENS)
        .map(str::to_owned)
        .collect()
}

fn is_letter(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_annotation_and_drops_short_segment() {
        let spans = parse_annotations("食べる@たべる@2@5;badsegment");
        assert_eq!(
            spans,
            vec![Annotation {
                literal_base: "食べる",
                reading_base: "たべる",
                start: 2,
                end: 5,
            }]
        );
    }

    #[test]
    fn annotation_with_bad_marks_is_dropped() {
        assert!(parse_annotations("a@b@x@3").is_empty());
        assert!(parse_annotations("").is_empty());
        assert_eq!(parse_annotations(" 猫@ねこ@0@1 ;犬@いぬ@3@4@extra").len(), 2);
    }

    #[test]
    fn codepoint_offsets_count_chars_not_bytes() {
        assert_eq!(codepoint_len("たべる"), 3);
        assert_eq!(codepoint_offset("私はたべる", "私は".len()), 2);
        assert_eq!(codepoint_offset("ABCDE", 2), 2);
    }

    #[test]
    fn sanitize_cuts_at_punctuation_and_filters_short_tokens() {
        assert_eq!(sanitize_gloss("To Eat"), vec!["eat"]);
        assert_eq!(sanitize_gloss("cat (animal)"), vec!["cat"]);
        assert_eq!(sanitize_gloss("to live on; to subsist"), vec!["live"]);
        assert!(sanitize_gloss("1st place").is_empty());
    }

    #[test]
    fn sanitize_stops_at_letter_numbers_and_marks() {
        // Roman numerals are Nl, not letters.
        assert_eq!(sanitize_gloss("henry Ⅻ king"), vec!["henry"]);
        // U+0345 is Other_Alphabetic but a combining mark.
        assert_eq!(sanitize_gloss("cafe\u{345} latte"), vec!["cafe"]);
        assert_eq!(sanitize_gloss("Ärger über"), vec!["ärger", "über"]);
    }

    #[test]
    fn sanitize_caps_token_count() {
        let gloss = (0..20).map(|_| "word").collect::<Vec<_>>().join(" ");
        assert_eq!(sanitize_gloss(&gloss).len(), MAX_GLOSS_TOKENS);
    }

    #[test]
    fn rank_saturates() {
        assert_eq!(WordRank::new(7, 3).rank, 3);
        assert_eq!(WordRank::new(7, 40).rank, MAX_RANK);
    }
}
