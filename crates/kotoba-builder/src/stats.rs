use std::path::Path;

use anyhow::{Context, Result};
use kotoba_corpus::Word;
use serde::Serialize;
use tracing::info;

use crate::crossref::MatchReport;

/// Reference counts 0..=9 get their own bucket; the last bucket is `>= 10`.
pub const HISTOGRAM_BUCKETS: usize = 11;

/// Summary of one build, logged at the end and optionally written as JSON.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct BuildStats {
    pub seed: u64,
    pub threads: usize,
    pub categories: usize,
    pub words: usize,
    pub sentences: usize,
    pub base_literal: usize,
    pub base_reading: usize,
    pub base_gloss: usize,
    /// Words per reference count.
    pub ref_histogram: Vec<usize>,
    pub words_by_tier: TierCounts,
    pub thinned_words: usize,
    /// Sentences referenced by at least one word.
    pub sentences_used: usize,
    pub max_sentence_usage: u32,
}

/// Words per deepest matching tier.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TierCounts {
    pub literal: usize,
    pub reading: usize,
    pub literal_substring: usize,
    pub reading_substring: usize,
}

impl From<[usize; 4]> for TierCounts {
    fn from(counts: [usize; 4]) -> Self {
        let [literal, reading, literal_substring, reading_substring] = counts;
        Self {
            literal,
            reading,
            literal_substring,
            reading_substring,
        }
    }
}

impl BuildStats {
    /// Fill the matching-related fields from the cross-reference results.
    pub fn record_matches(&mut self, words: &[Word], report: &MatchReport) {
        self.ref_histogram = ref_histogram(words);
        self.words_by_tier = report.words_by_tier.into();
        self.thinned_words = report.thinned_words;
        self.sentences_used = report.usage.iter().filter(|&&n| n > 0).count();
        self.max_sentence_usage = report.usage.iter().copied().max().unwrap_or(0);
    }

    pub fn log(&self) {
        info!(
            "built {} categories, {} words, {} sentences",
            self.categories, self.words, self.sentences
        );
        info!(
            "base keys: {} literal, {} reading, {} gloss",
            self.base_literal, self.base_reading, self.base_gloss
        );
        let buckets: Vec<String> = self
            .ref_histogram
            .iter()
            .enumerate()
            .map(|(refs, words)| {
                if refs + 1 == HISTOGRAM_BUCKETS {
                    format!(">={refs}:{words}")
                } else {
                    format!("{refs}:{words}")
                }
            })
            .collect();
        info!("words by reference count: {}", buckets.join(" "));
        info!(
            "{} sentences used (max {} words per sentence), {} words thinned",
            self.sentences_used, self.max_sentence_usage, self.thinned_words
        );
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize build stats")?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("write stats to {}", path.display()))?;
        info!("stats written to {}", path.display());
        Ok(())
    }
}

pub fn ref_histogram(words: &[Word]) -> Vec<usize> {
    let mut histogram = vec![0usize; HISTOGRAM_BUCKETS];
    for word in words {
        histogram[word.refs.len().min(HISTOGRAM_BUCKETS - 1)] += 1;
    }
    histogram
}
