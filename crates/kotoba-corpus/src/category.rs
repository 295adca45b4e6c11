use std::collections::HashMap;

const JLPT_FOLDER: &str = "Japanese-Language Proficiency Test";
const MAINICHI_FOLDER: &str = "Mainichi Shimbun newspaper";
const ICHIMANGO_FOLDER: &str = "Ichimango goi bunruishuu";
const FREQUENCY_BANDS: usize = 20;

/// A taxonomy node and the words filed under it.
#[derive(Clone, Debug)]
pub struct Category {
    /// Taxonomy path, `folder/name`.
    pub name: String,
    /// Short key used by the word list (`n5`, `news1`, `nf07`, ...).
    pub label: String,
    /// Word arena indices in load order; each word appears once.
    pub members: Vec<u32>,
}

/// The fixed category taxonomy with label lookup.
#[derive(Clone, Debug, Default)]
pub struct CategoryIndex {
    categories: Vec<Category>,
    by_label: HashMap<String, u32>,
}

impl CategoryIndex {
    /// Build the standard taxonomy: JLPT N5..N1, newspaper common-word lists,
    /// the Ichimango list, and twenty newspaper frequency bands.
    pub fn standard() -> Self {
        let mut index = Self::default();
        for level in (1..=5).rev() {
            index.insert(
                format!("n{level}"),
                format!("{JLPT_FOLDER}/JLPT N{level}"),
            );
        }
        index.insert("news1", format!("{MAINICHI_FOLDER}/Common words #1"));
        index.insert("news2", format!("{MAINICHI_FOLDER}/Common words #2"));
        index.insert("ichi1", format!("{ICHIMANGO_FOLDER}/Common words"));
        for band in 1..=FREQUENCY_BANDS {
            index.insert(
                format!("nf{band:02}"),
                format!("{MAINICHI_FOLDER}/Most frequent words #{band:02}"),
            );
        }
        index
    }

    fn insert(&mut self, label: impl Into<String>, name: impl Into<String>) {
        let label = label.into();
        let idx = self.categories.len() as u32;
        self.by_label.insert(label.clone(), idx);
        self.categories.push(Category {
            name: name.into(),
            label,
            members: Vec::new(),
        });
    }

    /// Resolve a word-list label to its arena index.
    pub fn resolve(&self, label: &str) -> Option<u32> {
        self.by_label.get(label).copied()
    }

    /// Record `word` as a member of category `idx`.
    ///
    /// Words are added in load order, so a repeat can only be the last entry.
    pub fn add_member(&mut self, idx: u32, word: u32) {
        let Some(category) = self.categories.get_mut(idx as usize) else {
            return;
        };
        if category.members.last() != Some(&word) {
            category.members.push(word);
        }
    }

    pub fn get(&self, idx: u32) -> Option<&Category> {
        self.categories.get(idx as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> + '_ {
        self.categories.iter()
    }

    pub fn as_slice(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_taxonomy_has_expected_labels() {
        let index = CategoryIndex::standard();
        assert_eq!(index.len(), 5 + 3 + FREQUENCY_BANDS);
        let n5 = index.resolve("n5").unwrap();
        assert_eq!(
            index.get(n5).unwrap().name,
            "Japanese-Language Proficiency Test/JLPT N5"
        );
        let nf07 = index.resolve("nf07").unwrap();
        assert_eq!(
            index.get(nf07).unwrap().name,
            "Mainichi Shimbun newspaper/Most frequent words #07"
        );
        assert!(index.resolve("spec1").is_none());
    }

    #[test]
    fn members_are_deduplicated() {
        let mut index = CategoryIndex::standard();
        let n3 = index.resolve("n3").unwrap();
        index.add_member(n3, 1);
        index.add_member(n3, 4);
        index.add_member(n3, 4);
        assert_eq!(index.get(n3).unwrap().members, vec![1, 4]);
    }
}
