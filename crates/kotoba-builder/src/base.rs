use std::collections::HashMap;

use kotoba_types::WordRank;

/// One keyword of a base table and the words listed under it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BaseEntry {
    pub keyword: String,
    /// Each word at most once, with its best (lowest) rank, in first-seen order.
    pub words: Vec<WordRank>,
}

/// Which word reverse map a base table is built from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BaseTable {
    Literal,
    Reading,
    Gloss,
}

impl BaseTable {
    pub const ALL: [BaseTable; 3] = [BaseTable::Literal, BaseTable::Reading, BaseTable::Gloss];

    pub fn file_name(self) -> &'static str {
        match self {
            BaseTable::Literal => "kotoba-base_k.kdb",
            BaseTable::Reading => "kotoba-base_f.kdb",
            BaseTable::Gloss => "kotoba-base_e.kdb",
        }
    }
}

/// Collapse a keyword → ranked-words map into base entries.
///
/// Entry order follows the map and is not meaningful; ids are assigned later
/// by sorting on the keyword.
pub fn build_base(map: &HashMap<String, Vec<WordRank>>) -> Vec<BaseEntry> {
    map.iter()
        .map(|(keyword, ranks)| BaseEntry {
            keyword: keyword.clone(),
            words: collapse_ranks(ranks),
        })
        .collect()
}

/// Keep the lowest rank per word, ordered by each word's first appearance.
pub fn collapse_ranks(ranks: &[WordRank]) -> Vec<WordRank> {
    let mut out: Vec<WordRank> = Vec::with_capacity(ranks.len());
    let mut slot: HashMap<u32, usize> = HashMap::with_capacity(ranks.len());
    for entry in ranks {
        match slot.get(&entry.word) {
            Some(&at) => out[at].rank = out[at].rank.min(entry.rank),
            None => {
                slot.insert(entry.word, out.len());
                out.push(*entry);
            }
        }
    }
    out
}
