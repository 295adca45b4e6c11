use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use kotoba_kdb::{BaseRecord, CategoryRecord, Layout, SentenceRecord, Table, WordRecord};

fn main() -> Result<()> {
    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: cargo run -p kotoba-kdb --example dump -- <output-dir>")?;

    let read = |name: &str| {
        let path = dir.join(name);
        std::fs::read(&path).with_context(|| format!("reading {}", path.display()))
    };

    let category_bytes = read("kotoba-category.kdb")?;
    let categories = Table::parse(&category_bytes, Layout::Plain)?;
    println!("Categories: {}", categories.len());
    for category in categories.records::<CategoryRecord>() {
        let category = category?;
        println!("  {:<60} {:>6} words", category.name, category.members.len());
    }

    let word_bytes = read("kotoba-word.kdb")?;
    let words = Table::parse(&word_bytes, Layout::WithIdents)?;
    let mut refs = 0usize;
    let mut without_refs = 0usize;
    for word in words.records::<WordRecord>() {
        let word = word?;
        refs += word.refs.len();
        if word.refs.is_empty() {
            without_refs += 1;
        }
    }
    println!("Words: {} ({} sentence refs, {} without examples)", words.len(), refs, without_refs);

    let sentence_bytes = read("kotoba-sentence.kdb")?;
    let sentences = Table::parse(&sentence_bytes, Layout::Plain)?;
    println!("Sentences: {}", sentences.len());

    for (label, name) in [
        ("literal", "kotoba-base_k.kdb"),
        ("reading", "kotoba-base_f.kdb"),
        ("gloss", "kotoba-base_e.kdb"),
    ] {
        let bytes = read(name)?;
        let table = Table::parse(&bytes, Layout::Plain)?;
        print!("Base ({label}): {} keys", table.len());
        if let Some(first) = table.records::<BaseRecord>().next() {
            let first = first?;
            print!(", first {:?} -> {} words", first.keyword, first.words.len());
        }
        println!();
    }

    // Show the first word with examples, resolving its sentences.
    for id in 0..words.len() as u32 {
        let word: WordRecord = words.record(id)?;
        let Some(first_ref) = word.refs.first() else {
            continue;
        };
        let sentence: SentenceRecord = sentences.record(first_ref.sentence)?;
        println!(
            "Sample word #{id} (ident {}): {:?} / {:?}",
            words.ident(id).unwrap_or_default(),
            word.literals,
            word.readings
        );
        println!("  [{}..{}] {}", first_ref.start, first_ref.end, sentence.reading);
        println!("  {}", sentence.translation);
        break;
    }

    Ok(())
}
