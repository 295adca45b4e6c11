use std::path::PathBuf;

use kotoba_corpus::{CategoryIndex, LoadMode, SentenceRepository, WordRepository};
use kotoba_types::{BaseKind, WordRank};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn loads_sentences_skipping_malformed_lines() {
    let repo = SentenceRepository::load(fixture("sentences.pipe"), LoadMode::Mmap)
        .expect("load sentences");
    assert_eq!(repo.len(), 4);

    let eat = repo.lookup_base(BaseKind::Reading, "たべる");
    let idents: Vec<u32> = eat.iter().map(|r| repo.get(r.sentence).unwrap().ident).collect();
    assert_eq!(idents, vec![4702, 4705]);
    assert_eq!((eat[0].start, eat[0].end), (5, 8));

    let cat = repo.lookup_base(BaseKind::Literal, "猫");
    assert_eq!(cat.len(), 2);
    assert_eq!(repo.get(cat[0].sentence).unwrap().ident, 4701);

    let first = repo.iter().next().unwrap();
    assert_eq!(first.reading, "ねこがさかなをたべる。");
    assert_eq!(first.translation, "The cat eats fish.");
}

#[test]
fn owned_and_mmap_loads_agree() {
    let mmap = SentenceRepository::load(fixture("sentences.pipe"), LoadMode::Mmap).unwrap();
    let owned = SentenceRepository::load(fixture("sentences.pipe"), LoadMode::Owned).unwrap();
    assert_eq!(mmap.len(), owned.len());
    assert_eq!(
        mmap.base_count(BaseKind::Literal),
        owned.base_count(BaseKind::Literal)
    );
    assert_eq!(mmap.search_substring("食べ"), owned.search_substring("食べ"));
}

#[test]
fn loads_words_and_categories() {
    let mut categories = CategoryIndex::standard();
    let words = WordRepository::load(fixture("words.xml"), LoadMode::Owned, &mut categories)
        .expect("load words");
    assert_eq!(words.len(), 4);

    let n5 = categories.resolve("n5").unwrap();
    assert_eq!(categories.get(n5).unwrap().members, vec![0, 1, 2, 3]);
    let nf09 = categories.resolve("nf09").unwrap();
    assert_eq!(categories.get(nf09).unwrap().members, vec![1]);

    // `bogus` is not in the taxonomy and is dropped.
    assert_eq!(words.get(3).unwrap().categories, vec![n5]);

    let thanks = words.get(2).unwrap();
    assert!(thanks.literals.is_empty());
    assert_eq!(words.base_kana()["ありがとう"], vec![WordRank::new(2, 0)]);
    assert_eq!(
        words.base_en()["thanks"],
        vec![WordRank::new(2, 0)],
        "glosses of the first sense share rank 0"
    );
    assert_eq!(words.base_en()["snoop"], vec![WordRank::new(3, 1)]);
    assert!(!words.base_en().contains_key("spy"));
}

#[test]
fn missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.pipe");
    let err = SentenceRepository::load(&missing, LoadMode::Mmap).unwrap_err();
    assert!(err.to_string().contains("nope.pipe"));

    let mut categories = CategoryIndex::standard();
    assert!(WordRepository::load(dir.path().join("nope.xml"), LoadMode::Owned, &mut categories).is_err());
}

#[test]
fn empty_corpus_file_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.pipe");
    std::fs::write(&path, b"").unwrap();
    let repo = SentenceRepository::load(&path, LoadMode::Mmap).unwrap();
    assert!(repo.is_empty());
}
