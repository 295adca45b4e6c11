use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use kotoba_types::{BaseKind, SentenceRef, codepoint_len, codepoint_offset, parse_annotations};
use tracing::{info, warn};

use crate::{LoadMode, load_file, strip_cr};

const MIN_COLUMNS: usize = 5;

/// One example sentence from the corpus.
#[derive(Clone, Debug)]
pub struct Sentence {
    pub ident: u32,
    pub literal: String,
    pub reading: String,
    pub translation: String,
}

/// The example-sentence corpus with base-form reverse maps.
///
/// Posting lists are ordered by sentence identity key and the substring scan
/// visits sentences in the same order, so results are independent of file
/// order and hash-map iteration order.
#[derive(Debug, Default)]
pub struct SentenceRepository {
    sentences: Vec<Sentence>,
    base_literal: HashMap<String, Vec<SentenceRef>>,
    base_reading: HashMap<String, Vec<SentenceRef>>,
    scan_order: Vec<u32>,
}

impl SentenceRepository {
    /// Load a tab-separated corpus file:
    /// `ident \t literal \t reading \t translation \t annotations`.
    pub fn load(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let buffer = load_file(path, mode)?;
        let repo = Self::from_bytes(buffer.as_slice());
        info!(
            "loaded {} sentences ({} literal bases, {} reading bases) from {}",
            repo.len(),
            repo.base_literal.len(),
            repo.base_reading.len(),
            path.display()
        );
        Ok(repo)
    }

    /// Parse corpus records from raw bytes. Malformed lines are skipped.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut repo = Self::default();
        for (lineno, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
            let line = strip_cr(raw_line);
            if line.is_empty() {
                continue;
            }
            let Ok(line) = std::str::from_utf8(line) else {
                warn!("sentences:{} invalid utf-8, skipped", lineno + 1);
                continue;
            };
            repo.push_record(lineno + 1, line);
        }
        repo.finish();
        repo
    }

    fn push_record(&mut self, lineno: usize, line: &str) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_COLUMNS {
            warn!(
                "sentences:{lineno} has {} columns, expected {MIN_COLUMNS}; skipped",
                fields.len()
            );
            return;
        }
        let Ok(ident) = fields[0].trim().parse::<u32>() else {
            warn!("sentences:{lineno} invalid ident {:?}; skipped", fields[0]);
            return;
        };

        let idx = self.sentences.len() as u32;
        for annotation in parse_annotations(fields[4].trim()) {
            let base = SentenceRef {
                sentence: idx,
                start: annotation.start,
                end: annotation.end,
            };
            insert_once(&mut self.base_literal, annotation.literal_base, base);
            insert_once(&mut self.base_reading, annotation.reading_base, base);
        }

        self.sentences.push(Sentence {
            ident,
            literal: fields[1].trim().to_string(),
            reading: fields[2].trim().to_string(),
            translation: fields[3].trim().to_string(),
        });
    }

    fn finish(&mut self) {
        let sentences = &self.sentences;
        let ident_of = |r: &SentenceRef| sentences[r.sentence as usize].ident;
        for list in self.base_literal.values_mut() {
            list.sort_by_key(ident_of);
        }
        for list in self.base_reading.values_mut() {
            list.sort_by_key(ident_of);
        }

        let mut order: Vec<u32> = (0..sentences.len() as u32).collect();
        order.sort_by_key(|&idx| sentences[idx as usize].ident);
        self.scan_order = order;
    }

    /// Exact base-form lookup. Returns an empty slice when the key is absent.
    pub fn lookup_base(&self, kind: BaseKind, key: &str) -> &[SentenceRef] {
        let map = match kind {
            BaseKind::Literal => &self.base_literal,
            BaseKind::Reading => &self.base_reading,
        };
        map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Scan every sentence's literal text for the first occurrence of
    /// `needle`, returning at most one codepoint span per sentence.
    pub fn search_substring(&self, needle: &str) -> Vec<SentenceRef> {
        if needle.is_empty() {
            return Vec::new();
        }
        let needle_len = codepoint_len(needle) as u32;
        self.scan_order
            .iter()
            .filter_map(|&idx| {
                let literal = &self.sentences[idx as usize].literal;
                let byte_start = literal.find(needle)?;
                let start = codepoint_offset(literal, byte_start) as u32;
                Some(SentenceRef {
                    sentence: idx,
                    start,
                    end: start + needle_len,
                })
            })
            .collect()
    }

    pub fn get(&self, idx: u32) -> Option<&Sentence> {
        self.sentences.get(idx as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sentence> + '_ {
        self.sentences.iter()
    }

    pub fn as_slice(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Number of distinct keys in the given reverse map.
    pub fn base_count(&self, kind: BaseKind) -> usize {
        match kind {
            BaseKind::Literal => self.base_literal.len(),
            BaseKind::Reading => self.base_reading.len(),
        }
    }
}

fn insert_once(map: &mut HashMap<String, Vec<SentenceRef>>, key: &str, base: SentenceRef) {
    if key.is_empty() {
        return;
    }
    let list = map.entry(key.to_string()).or_default();
    // Sentences are pushed in load order, so a duplicate can only be the tail.
    if list.last().map(|r| r.sentence) != Some(base.sentence) {
        list.push(base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(lines: &[&str]) -> SentenceRepository {
        SentenceRepository::from_bytes(lines.join("\n").as_bytes())
    }

    #[test]
    fn substring_returns_codepoint_span() {
        let repo = corpus(&["1\tABCDE\tabcde\tletters\t"]);
        let hits = repo.search_substring("CD");
        assert_eq!(
            hits,
            vec![SentenceRef {
                sentence: 0,
                start: 2,
                end: 4
            }]
        );
    }

    #[test]
    fn substring_counts_multibyte_offsets() {
        let repo = corpus(&["7\t私はりんごを食べる\tわたしはりんごをたべる\tI eat an apple.\t"]);
        let hits = repo.search_substring("食べる");
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].start, hits[0].end), (6, 9));
        assert!(repo.search_substring("").is_empty());
    }

    #[test]
    fn substring_reports_first_occurrence_only() {
        let repo = corpus(&["1\tねこねこ\tねこねこ\tcat cat\t"]);
        let hits = repo.search_substring("ねこ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].start, 0);
    }

    #[test]
    fn base_maps_hold_each_sentence_once_per_key() {
        let repo = corpus(&[
            "10\t猫と猫\tねことねこ\tcat and cat\t猫@ねこ@0@1;猫@ねこ@2@3",
            "11\t猫\tねこ\tcat\t猫@ねこ@0@1",
        ]);
        let literal = repo.lookup_base(BaseKind::Literal, "猫");
        assert_eq!(literal.len(), 2);
        assert_eq!((literal[0].start, literal[0].end), (0, 1));
        assert_eq!(repo.lookup_base(BaseKind::Reading, "ねこ").len(), 2);
        assert!(repo.lookup_base(BaseKind::Reading, "いぬ").is_empty());
    }

    #[test]
    fn posting_lists_follow_identity_order() {
        let repo = corpus(&[
            "30\t犬\tいぬ\tdog\t犬@いぬ@0@1",
            "20\t犬だ\tいぬだ\tit's a dog\t犬@いぬ@0@1",
        ]);
        let hits = repo.lookup_base(BaseKind::Literal, "犬");
        let idents: Vec<u32> = hits
            .iter()
            .map(|r| repo.get(r.sentence).unwrap().ident)
            .collect();
        assert_eq!(idents, vec![20, 30]);

        let scanned: Vec<u32> = repo
            .search_substring("犬")
            .iter()
            .map(|r| repo.get(r.sentence).unwrap().ident)
            .collect();
        assert_eq!(scanned, vec![20, 30]);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let repo = corpus(&[
            "1\tonly\tthree",
            "x\ta\tb\tc\t",
            "",
            "2\t猫\tねこ\tcat\tbroken;猫@ねこ@0@1\r",
        ]);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.get(0).unwrap().ident, 2);
        assert_eq!(repo.lookup_base(BaseKind::Literal, "猫").len(), 1);
    }
}
