//! Dense identifier assignment.
//!
//! Every table is emitted in id order, and ids are positions in a stable sort
//! of the entities by their natural key. Equal keys keep arena order.

use kotoba_corpus::{CategoryIndex, SentenceRepository, WordRepository};

use crate::base::BaseEntry;

/// A bijection between arena indices and dense ids `0..n`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IdMap {
    /// id → arena index.
    order: Vec<u32>,
    /// arena index → id.
    ids: Vec<u32>,
}

impl IdMap {
    /// Sort `items` by `key` and number them in that order.
    pub fn assign<'a, T, K: Ord>(items: &'a [T], key: impl Fn(&'a T) -> K) -> Self {
        let mut order: Vec<u32> = (0..items.len() as u32).collect();
        order.sort_by(|&a, &b| key(&items[a as usize]).cmp(&key(&items[b as usize])));
        let mut ids = vec![0u32; order.len()];
        for (id, &index) in order.iter().enumerate() {
            ids[index as usize] = id as u32;
        }
        Self { order, ids }
    }

    /// Dense id of the entity at arena `index`.
    pub fn id_of(&self, index: u32) -> u32 {
        self.ids[index as usize]
    }

    /// Arena index of the entity with dense `id`.
    pub fn index_of(&self, id: u32) -> u32 {
        self.order[id as usize]
    }

    /// Arena indices in id order.
    pub fn in_id_order(&self) -> impl Iterator<Item = u32> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Categories are numbered by taxonomy name.
pub fn category_ids(categories: &CategoryIndex) -> IdMap {
    IdMap::assign(categories.as_slice(), |c| c.name.as_str())
}

pub fn word_ids(words: &WordRepository) -> IdMap {
    IdMap::assign(words.as_slice(), |w| w.ident)
}

pub fn sentence_ids(sentences: &SentenceRepository) -> IdMap {
    IdMap::assign(sentences.as_slice(), |s| s.ident)
}

/// Base keywords sort by codepoint, which for UTF-8 is byte order.
pub fn base_ids(entries: &[BaseEntry]) -> IdMap {
    IdMap::assign(entries, |e| e.keyword.as_str())
}
