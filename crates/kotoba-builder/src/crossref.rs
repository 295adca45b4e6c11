//! Tiered matching of dictionary words to example sentences.
//!
//! Each word is matched independently:
//! 1. exact literal base forms,
//! 2. exact reading base forms,
//! 3. substring search of literal forms over sentence text,
//! 4. (opt-in) substring search of reading forms.
//!
//! A tier only runs while the deduplicated match count is at or below the
//! threshold. Lists longer than the cap are thinned to a uniformly random
//! subset, keeping the original order.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use bitvec::prelude::*;
use dashmap::DashMap;
use kotoba_corpus::{SentenceRepository, Word};
use kotoba_types::{BaseKind, SentenceRef};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

pub const DEFAULT_MATCH_THRESHOLD: usize = 3;
pub const DEFAULT_SREF_CAP: usize = 200;

type SeenSet = BitVec<usize, Lsb0>;

/// Thresholds controlling how far down the tiers a word is matched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MatchPolicy {
    /// Later tiers run only while the match count is `<= threshold`.
    pub threshold: usize,
    /// Maximum references kept per word.
    pub cap: usize,
    /// Enable the reading-form substring tier.
    pub reading_substring: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            cap: DEFAULT_SREF_CAP,
            reading_substring: false,
        }
    }
}

/// The deepest tier that ran for a word.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Tier {
    Literal = 0,
    Reading = 1,
    LiteralSubstring = 2,
    ReadingSubstring = 3,
}

/// Result of matching a single word.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchOutcome {
    pub refs: Vec<SentenceRef>,
    pub tier: Tier,
    /// References dropped by thinning.
    pub thinned: usize,
}

/// Aggregate results of a cross-reference run.
#[derive(Clone, Debug, Default)]
pub struct MatchReport {
    /// How many words reference each sentence, indexed by sentence arena index.
    pub usage: Vec<u32>,
    /// Words whose list was thinned to the cap.
    pub thinned_words: usize,
    /// Words per deepest tier reached, indexed by `Tier as usize`.
    pub words_by_tier: [usize; 4],
}

/// Matches words against a read-only sentence repository.
#[derive(Clone, Copy, Debug)]
pub struct CrossReferencer<'s> {
    sentences: &'s SentenceRepository,
    policy: MatchPolicy,
    seed: u64,
}

impl<'s> CrossReferencer<'s> {
    /// `seed` drives thinning; each word derives its own stream from it and
    /// its identity key, so results do not depend on scheduling.
    pub fn new(sentences: &'s SentenceRepository, policy: MatchPolicy, seed: u64) -> Self {
        Self {
            sentences,
            policy,
            seed,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Match every word on a pool of `threads` workers, storing each word's
    /// references in place.
    pub fn run(&self, words: &mut [Word], threads: usize) -> Result<MatchReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("crossref-{i}"))
            .build()
            .context("failed to start cross-reference workers")?;
        info!(
            "matching {} words against {} sentences on {} threads",
            words.len(),
            self.sentences.len(),
            pool.current_num_threads()
        );

        let corpus_len = self.sentences.len();
        let usage: DashMap<u32, u32> = DashMap::new();
        let thinned_words = AtomicUsize::new(0);
        let tiers: [AtomicUsize; 4] = Default::default();

        pool.install(|| {
            words.par_iter_mut().for_each_init(
                || bitvec![usize, Lsb0; 0; corpus_len],
                |seen, word| {
                    let outcome = self.match_word(word, seen);
                    debug!(
                        "word {}: {} refs (tier {:?}, {} thinned)",
                        word.ident,
                        outcome.refs.len(),
                        outcome.tier,
                        outcome.thinned
                    );
                    tiers[outcome.tier as usize].fetch_add(1, Ordering::Relaxed);
                    if outcome.thinned > 0 {
                        thinned_words.fetch_add(1, Ordering::Relaxed);
                    }
                    for r in &outcome.refs {
                        *usage.entry(r.sentence).or_insert(0) += 1;
                    }
                    word.refs = outcome.refs;
                },
            );
        });

        let mut per_sentence = vec![0u32; corpus_len];
        for (sentence, count) in usage {
            if let Some(slot) = per_sentence.get_mut(sentence as usize) {
                *slot = count;
            }
        }
        let report = MatchReport {
            usage: per_sentence,
            thinned_words: thinned_words.into_inner(),
            words_by_tier: tiers.map(AtomicUsize::into_inner),
        };
        info!(
            "matching done: {} words thinned, tiers {:?}",
            report.thinned_words, report.words_by_tier
        );
        Ok(report)
    }

    /// Match one word.
    ///
    /// `seen` is scratch space with one bit per sentence; it must be all
    /// zeros on entry and is left all zeros on return.
    pub fn match_word(&self, word: &Word, seen: &mut SeenSet) -> MatchOutcome {
        if seen.len() < self.sentences.len() {
            seen.resize(self.sentences.len(), false);
        }

        let threshold = self.policy.threshold;
        let mut refs = Vec::new();
        let mut tier = Tier::Literal;
        for form in &word.literals {
            let hits = self.sentences.lookup_base(BaseKind::Literal, form);
            merge(&mut refs, seen, hits.iter().copied());
        }

        if refs.len() <= threshold {
            tier = Tier::Reading;
            for form in &word.readings {
                let hits = self.sentences.lookup_base(BaseKind::Reading, form);
                merge(&mut refs, seen, hits.iter().copied());
            }
        }

        if refs.len() <= threshold {
            tier = Tier::LiteralSubstring;
            for form in &word.literals {
                merge(&mut refs, seen, self.sentences.search_substring(form));
            }
        }

        if self.policy.reading_substring && refs.len() <= threshold {
            tier = Tier::ReadingSubstring;
            for form in &word.readings {
                merge(&mut refs, seen, self.sentences.search_substring(form));
            }
        }

        for r in &refs {
            seen.set(r.sentence as usize, false);
        }

        let mut thinned = 0;
        if refs.len() > self.policy.cap {
            let mut rng = StdRng::seed_from_u64(word_seed(self.seed, word.ident));
            thinned = thin_refs(&mut refs, self.policy.cap, &mut rng);
        }

        MatchOutcome {
            refs,
            tier,
            thinned,
        }
    }
}

fn merge(
    refs: &mut Vec<SentenceRef>,
    seen: &mut SeenSet,
    hits: impl IntoIterator<Item = SentenceRef>,
) {
    for hit in hits {
        let idx = hit.sentence as usize;
        if !seen[idx] {
            seen.set(idx, true);
            refs.push(hit);
        }
    }
}

/// Reduce `refs` to `cap` entries chosen uniformly at random, preserving
/// their relative order. Returns the number of entries removed.
pub fn thin_refs<R: Rng + ?Sized>(refs: &mut Vec<SentenceRef>, cap: usize, rng: &mut R) -> usize {
    let len = refs.len();
    if len <= cap {
        return 0;
    }
    let mut keep = rand::seq::index::sample(rng, len, cap).into_vec();
    keep.sort_unstable();
    *refs = keep.into_iter().map(|i| refs[i]).collect();
    len - cap
}

fn word_seed(seed: u64, ident: u32) -> u64 {
    seed ^ u64::from(ident).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
