use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use kotoba_types::{Sense, SentenceRef, WordRank, sanitize_gloss};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{CategoryIndex, LoadMode, load_file};

#[derive(Debug, Deserialize)]
struct WordsDocument {
    #[serde(rename = "Entry", default)]
    entries: Vec<EntryElement>,
}

#[derive(Debug, Deserialize)]
struct EntryElement {
    #[serde(rename = "Id", default)]
    id: String,
    #[serde(rename = "Kele", default)]
    literals: Vec<String>,
    #[serde(rename = "Rele", default)]
    readings: Vec<String>,
    #[serde(rename = "Sense", default)]
    senses: Vec<SenseElement>,
    #[serde(rename = "Cat", default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SenseElement {
    #[serde(rename = "Pos", default)]
    pos: String,
    #[serde(rename = "Gloss", default)]
    glosses: Vec<String>,
}

/// A dictionary entry and the example sentences matched to it.
#[derive(Clone, Debug)]
pub struct Word {
    pub ident: u32,
    pub literals: Vec<String>,
    pub readings: Vec<String>,
    pub senses: Vec<Sense>,
    /// Category arena indices.
    pub categories: Vec<u32>,
    /// Example-sentence spans, filled by the cross-reference pass.
    pub refs: Vec<SentenceRef>,
}

/// The word list plus its literal, reading and gloss reverse maps.
#[derive(Debug, Default)]
pub struct WordRepository {
    words: Vec<Word>,
    base_real: HashMap<String, Vec<WordRank>>,
    base_kana: HashMap<String, Vec<WordRank>>,
    base_en: HashMap<String, Vec<WordRank>>,
}

impl WordRepository {
    /// Load the flattened `<Words><Entry>...</Entry></Words>` word list,
    /// filing each word under the categories its labels resolve to.
    pub fn load(
        path: impl AsRef<Path>,
        mode: LoadMode,
        categories: &mut CategoryIndex,
    ) -> Result<Self> {
        let path = path.as_ref();
        let buffer = load_file(path, mode)?;
        let text = std::str::from_utf8(buffer.as_slice())
            .with_context(|| format!("decode {}", path.display()))?;
        let repo = Self::from_xml(text, categories)
            .with_context(|| format!("parse {}", path.display()))?;
        info!(
            "loaded {} words ({} literal, {} reading, {} gloss keys) from {}",
            repo.len(),
            repo.base_real.len(),
            repo.base_kana.len(),
            repo.base_en.len(),
            path.display()
        );
        Ok(repo)
    }

    /// Parse a word-list document. Entries with an invalid id are skipped.
    pub fn from_xml(text: &str, categories: &mut CategoryIndex) -> Result<Self> {
        let document: WordsDocument = quick_xml::de::from_str(text)?;
        let mut repo = Self::default();
        for (position, entry) in document.entries.into_iter().enumerate() {
            let Ok(ident) = entry.id.trim().parse::<u32>() else {
                warn!("word entry #{} has invalid id {:?}; skipped", position + 1, entry.id);
                continue;
            };
            repo.push_entry(ident, entry, categories);
        }
        Ok(repo)
    }

    fn push_entry(&mut self, ident: u32, entry: EntryElement, categories: &mut CategoryIndex) {
        let idx = self.words.len() as u32;

        let mut category_refs: Vec<u32> = Vec::new();
        for label in &entry.categories {
            // Unknown labels simply leave the word with fewer categories.
            if let Some(cat) = categories.resolve(label.trim()) {
                if !category_refs.contains(&cat) {
                    category_refs.push(cat);
                    categories.add_member(cat, idx);
                }
            }
        }

        let literals = clean_forms(entry.literals);
        let readings = clean_forms(entry.readings);
        for form in &literals {
            self.base_real
                .entry(form.clone())
                .or_default()
                .push(WordRank::new(idx, 0));
        }
        for form in &readings {
            self.base_kana
                .entry(form.clone())
                .or_default()
                .push(WordRank::new(idx, 0));
        }

        let senses: Vec<Sense> = entry
            .senses
            .into_iter()
            .map(|s| Sense {
                pos: s.pos.trim().to_string(),
                glosses: s.glosses,
            })
            .collect();
        for (rank, sense) in senses.iter().enumerate() {
            for gloss in &sense.glosses {
                for token in sanitize_gloss(gloss) {
                    self.base_en
                        .entry(token)
                        .or_default()
                        .push(WordRank::new(idx, rank));
                }
            }
        }

        self.words.push(Word {
            ident,
            literals,
            readings,
            senses,
            categories: category_refs,
            refs: Vec::new(),
        });
    }

    pub fn get(&self, idx: u32) -> Option<&Word> {
        self.words.get(idx as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Word> + '_ {
        self.words.iter()
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.words
    }

    /// Mutable access for the cross-reference pass; each task touches only
    /// its own word.
    pub fn as_mut_slice(&mut self) -> &mut [Word] {
        &mut self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Literal form → words.
    pub fn base_real(&self) -> &HashMap<String, Vec<WordRank>> {
        &self.base_real
    }

    /// Reading form → words.
    pub fn base_kana(&self) -> &HashMap<String, Vec<WordRank>> {
        &self.base_kana
    }

    /// Sanitized gloss token → words ranked by sense ordinal.
    pub fn base_en(&self) -> &HashMap<String, Vec<WordRank>> {
        &self.base_en
    }
}

fn clean_forms(forms: Vec<String>) -> Vec<String> {
    forms
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<Words>
  <Entry>
    <Id>1358280</Id>
    <Kele>食べる</Kele><Kele>喰べる</Kele>
    <Rele>たべる</Rele>
    <Sense><Pos>v1</Pos><Gloss>to eat</Gloss></Sense>
    <Sense><Pos>v1</Pos><Gloss>to live on (e.g. a salary)</Gloss><Gloss>to eat</Gloss></Sense>
    <Cat>n5</Cat><Cat>ichi1</Cat><Cat>n5</Cat><Cat>spec1</Cat>
  </Entry>
  <Entry>
    <Id>oops</Id>
    <Kele>壊</Kele>
  </Entry>
  <Entry>
    <Id>1467640</Id>
    <Kele>猫</Kele>
    <Rele>ねこ</Rele>
    <Sense><Pos>n</Pos><Gloss>cat</Gloss></Sense>
    <Cat>n5</Cat>
  </Entry>
</Words>"#;

    #[test]
    fn loads_entries_and_skips_bad_ids() {
        let mut categories = CategoryIndex::standard();
        let repo = WordRepository::from_xml(SAMPLE, &mut categories).unwrap();
        assert_eq!(repo.len(), 2);

        let eat = repo.get(0).unwrap();
        assert_eq!(eat.ident, 1358280);
        assert_eq!(eat.literals, vec!["食べる", "喰べる"]);
        assert_eq!(eat.readings, vec!["たべる"]);
        assert_eq!(eat.senses.len(), 2);
        assert_eq!(eat.senses[1].glosses.len(), 2);
        assert_eq!(eat.senses[0].pos, "v1");
    }

    #[test]
    fn resolves_known_labels_once() {
        let mut categories = CategoryIndex::standard();
        let repo = WordRepository::from_xml(SAMPLE, &mut categories).unwrap();
        let n5 = categories.resolve("n5").unwrap();
        let ichi1 = categories.resolve("ichi1").unwrap();
        assert_eq!(repo.get(0).unwrap().categories, vec![n5, ichi1]);
        assert_eq!(categories.get(n5).unwrap().members, vec![0, 1]);
        assert_eq!(categories.get(ichi1).unwrap().members, vec![0]);
    }

    #[test]
    fn builds_reverse_maps_with_sense_ranks() {
        let mut categories = CategoryIndex::standard();
        let repo = WordRepository::from_xml(SAMPLE, &mut categories).unwrap();
        assert_eq!(repo.base_real()["喰べる"], vec![WordRank::new(0, 0)]);
        assert_eq!(repo.base_kana()["ねこ"], vec![WordRank::new(1, 0)]);
        assert_eq!(
            repo.base_en()["eat"],
            vec![WordRank::new(0, 0), WordRank::new(0, 1)]
        );
        assert_eq!(repo.base_en()["live"], vec![WordRank::new(0, 1)]);
        assert!(!repo.base_en().contains_key("salary"));
    }

    #[test]
    fn malformed_document_is_an_error() {
        let mut categories = CategoryIndex::standard();
        assert!(WordRepository::from_xml("<Words><Entry>", &mut categories).is_err());
    }
}
