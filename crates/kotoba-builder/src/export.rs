//! Conversion of the in-memory graph into `.kdb` tables.
//!
//! Cross-entity links are arena indices in memory; here they are rewritten to
//! dense ids through the [`IdMap`]s before encoding.

use kotoba_corpus::{CategoryIndex, SentenceRepository, WordRepository};
use kotoba_kdb::{
    BaseRecord, CategoryRecord, KdbError, Layout, PackedWord, RefRecord, SentenceRecord,
    TableBuilder, WordRecord,
};

use crate::base::BaseEntry;
use crate::ids::IdMap;

/// Dense ids for every entity kind that tables refer to.
#[derive(Clone, Debug, Default)]
pub struct Ids {
    pub categories: IdMap,
    pub words: IdMap,
    pub sentences: IdMap,
}

pub fn category_table(categories: &CategoryIndex, ids: &Ids) -> Result<Vec<u8>, KdbError> {
    let mut table = TableBuilder::new(Layout::Plain);
    for index in ids.categories.in_id_order() {
        let Some(category) = categories.get(index) else {
            continue;
        };
        let mut members: Vec<u32> = category
            .members
            .iter()
            .map(|&word| ids.words.id_of(word))
            .collect();
        members.sort_unstable();
        table.push(&CategoryRecord {
            name: &category.name,
            members,
        })?;
    }
    table.finish()
}

pub fn word_table(words: &WordRepository, ids: &Ids) -> Result<Vec<u8>, KdbError> {
    let mut table = TableBuilder::new(Layout::WithIdents);
    for index in ids.words.in_id_order() {
        let Some(word) = words.get(index) else {
            continue;
        };
        let record = WordRecord {
            literals: word.literals.iter().map(String::as_str).collect(),
            readings: word.readings.iter().map(String::as_str).collect(),
            senses: word
                .senses
                .iter()
                .map(|sense| sense.glosses.iter().map(String::as_str).collect())
                .collect(),
            categories: word
                .categories
                .iter()
                .map(|&category| to_u16(ids.categories.id_of(category)))
                .collect(),
            refs: word
                .refs
                .iter()
                .map(|r| RefRecord {
                    sentence: ids.sentences.id_of(r.sentence),
                    start: to_u16(r.start),
                    end: to_u16(r.end),
                })
                .collect(),
        };
        table.push_with_ident(&record, word.ident)?;
    }
    table.finish()
}

pub fn sentence_table(sentences: &SentenceRepository, ids: &Ids) -> Result<Vec<u8>, KdbError> {
    let mut table = TableBuilder::new(Layout::Plain);
    for index in ids.sentences.in_id_order() {
        let Some(sentence) = sentences.get(index) else {
            continue;
        };
        table.push(&SentenceRecord {
            reading: &sentence.reading,
            translation: &sentence.translation,
        })?;
    }
    table.finish()
}

/// Encode one base table; `order` numbers `entries` by keyword.
pub fn base_table(entries: &[BaseEntry], order: &IdMap, ids: &Ids) -> Result<Vec<u8>, KdbError> {
    let mut table = TableBuilder::new(Layout::Plain);
    for index in order.in_id_order() {
        let entry = &entries[index as usize];
        table.push(&BaseRecord {
            keyword: &entry.keyword,
            words: entry
                .words
                .iter()
                .map(|w| PackedWord {
                    word: ids.words.id_of(w.word),
                    rank: w.rank,
                })
                .collect(),
        })?;
    }
    table.finish()
}

fn to_u16(value: u32) -> u16 {
    value.min(u32::from(u16::MAX)) as u16
}
