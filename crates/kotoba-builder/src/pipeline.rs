use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use kotoba_corpus::{CategoryIndex, LoadMode, SentenceRepository, WordRepository};
use kotoba_types::BaseKind;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::base::{BaseTable, build_base};
use crate::crossref::{CrossReferencer, MatchPolicy};
use crate::export::{self, Ids};
use crate::ids;
use crate::stats::BuildStats;

pub const CATEGORY_FILE: &str = "kotoba-category.kdb";
pub const WORD_FILE: &str = "kotoba-word.kdb";
pub const SENTENCE_FILE: &str = "kotoba-sentence.kdb";

/// Inputs, outputs and tuning for one build.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub words_path: PathBuf,
    pub sentences_path: PathBuf,
    pub out_dir: PathBuf,
    pub load_mode: LoadMode,
    pub policy: MatchPolicy,
    /// Thinning seed; a random one is drawn (and logged) when unset.
    pub seed: Option<u64>,
    /// Worker count for matching; defaults to the available parallelism.
    pub threads: Option<usize>,
    /// Where to write the JSON stats report, if anywhere.
    pub stats_path: Option<PathBuf>,
}

impl BuildOptions {
    pub fn new(
        words_path: impl Into<PathBuf>,
        sentences_path: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            words_path: words_path.into(),
            sentences_path: sentences_path.into(),
            out_dir: out_dir.into(),
            load_mode: LoadMode::Mmap,
            policy: MatchPolicy::default(),
            seed: None,
            threads: None,
            stats_path: None,
        }
    }
}

/// Load both inputs, cross-reference them and write the six `.kdb` files.
///
/// Nothing is written to `out_dir` unless every table encodes successfully.
pub fn build(options: &BuildOptions) -> Result<BuildStats> {
    let start = Instant::now();
    let mut categories = CategoryIndex::standard();
    let mut words = WordRepository::load(&options.words_path, options.load_mode, &mut categories)?;
    let sentences = SentenceRepository::load(&options.sentences_path, options.load_mode)?;
    info!(
        "inputs loaded in {} ms ({} sentence literal bases, {} reading bases)",
        start.elapsed().as_millis(),
        sentences.base_count(BaseKind::Literal),
        sentences.base_count(BaseKind::Reading)
    );

    let seed = options.seed.unwrap_or_else(rand::random);
    let threads = options.threads.unwrap_or_else(default_threads);
    info!("thinning seed {seed}");

    let match_start = Instant::now();
    let report = CrossReferencer::new(&sentences, options.policy, seed)
        .run(words.as_mut_slice(), threads)?;
    info!("cross-referenced in {} ms", match_start.elapsed().as_millis());

    let literal = build_base(words.base_real());
    let reading = build_base(words.base_kana());
    let gloss = build_base(words.base_en());

    let ids = Ids {
        categories: ids::category_ids(&categories),
        words: ids::word_ids(&words),
        sentences: ids::sentence_ids(&sentences),
    };

    let mut files: Vec<(&'static str, Vec<u8>)> = vec![
        (
            CATEGORY_FILE,
            export::category_table(&categories, &ids).context("encode categories")?,
        ),
        (
            WORD_FILE,
            export::word_table(&words, &ids).context("encode words")?,
        ),
        (
            SENTENCE_FILE,
            export::sentence_table(&sentences, &ids).context("encode sentences")?,
        ),
    ];
    for (table, entries) in BaseTable::ALL.into_iter().zip([&literal, &reading, &gloss]) {
        let order = ids::base_ids(entries);
        let bytes = export::base_table(entries, &order, &ids)
            .with_context(|| format!("encode {}", table.file_name()))?;
        files.push((table.file_name(), bytes));
    }

    write_outputs(&options.out_dir, &files)?;

    let mut stats = BuildStats {
        seed,
        threads,
        categories: categories.len(),
        words: words.len(),
        sentences: sentences.len(),
        base_literal: literal.len(),
        base_reading: reading.len(),
        base_gloss: gloss.len(),
        ..BuildStats::default()
    };
    stats.record_matches(words.as_slice(), &report);
    stats.log();
    if let Some(path) = &options.stats_path {
        stats.write_json(path)?;
    }
    info!("build finished in {} ms", start.elapsed().as_millis());
    Ok(stats)
}

/// Stage every file as a temporary in `dir`, then rename them into place.
///
/// Existing targets are moved aside first. If any rename fails, the files
/// already installed are removed and the previous ones restored, so `dir`
/// holds either the complete new set or the old one.
pub fn write_outputs(dir: &Path, files: &[(&str, Vec<u8>)]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let mut staged = Vec::with_capacity(files.len());
    for (name, bytes) in files {
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("create temporary file in {}", dir.display()))?;
        tmp.write_all(bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .with_context(|| format!("write {name}"))?;
        staged.push((tmp, *name, dir.join(name)));
    }

    let backup_dir = tempfile::Builder::new()
        .prefix(".kotoba-backup")
        .tempdir_in(dir)
        .with_context(|| format!("create backup directory in {}", dir.display()))?;
    let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
    for (_, name, target) in &staged {
        // Directories are left alone; installing over one fails below.
        if !fs::symlink_metadata(target).is_ok_and(|m| !m.is_dir()) {
            continue;
        }
        let aside = backup_dir.path().join(name);
        if let Err(err) = fs::rename(target, &aside) {
            roll_back(&[], &backups);
            return Err(anyhow::Error::new(err).context(format!("move aside {}", target.display())));
        }
        backups.push((aside, target.clone()));
    }

    let mut installed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (tmp, _, target) in staged {
        let len = tmp.as_file().metadata().map(|m| m.len()).unwrap_or(0);
        if let Err(err) = tmp.persist(&target) {
            roll_back(&installed, &backups);
            return Err(anyhow::Error::new(err.error).context(format!("persist {}", target.display())));
        }
        info!("wrote {} ({} bytes)", target.display(), len);
        installed.push(target);
    }
    Ok(())
}

fn roll_back(installed: &[PathBuf], backups: &[(PathBuf, PathBuf)]) {
    for path in installed {
        if let Err(err) = fs::remove_file(path) {
            warn!("could not remove {}: {err}", path.display());
        }
    }
    for (aside, target) in backups {
        if let Err(err) = fs::rename(aside, target) {
            warn!("could not restore {}: {err}", target.display());
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_replace_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("kotoba-word.kdb");
        std::fs::write(&target, b"stale").unwrap();

        write_outputs(dir.path(), &[("kotoba-word.kdb", vec![1, 2, 3])]).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), vec![1, 2, 3]);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn failed_install_restores_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.kdb"), b"old a").unwrap();
        // A non-empty directory cannot be replaced by a file.
        let blocker = dir.path().join("c.kdb");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let result = write_outputs(
            dir.path(),
            &[
                ("a.kdb", vec![1]),
                ("b.kdb", vec![2]),
                ("c.kdb", vec![3]),
            ],
        );
        assert!(result.is_err());
        assert_eq!(std::fs::read(dir.path().join("a.kdb")).unwrap(), b"old a");
        assert!(!dir.path().join("b.kdb").exists());
        assert!(blocker.join("keep").exists());

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.kdb", "c.kdb"]);
    }

    #[test]
    fn failed_install_leaves_no_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("c.kdb");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let result = write_outputs(
            dir.path(),
            &[("a.kdb", vec![1]), ("b.kdb", vec![2]), ("c.kdb", vec![3])],
        );
        assert!(result.is_err());
        assert!(!dir.path().join("a.kdb").exists());
        assert!(!dir.path().join("b.kdb").exists());
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("kdb");
        write_outputs(&nested, &[("kotoba-category.kdb", vec![0; 8])]).unwrap();
        assert!(nested.join("kotoba-category.kdb").exists());
    }

    #[test]
    fn missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let options = BuildOptions::new(
            dir.path().join("absent.xml"),
            dir.path().join("absent.pipe"),
            &out,
        );
        assert!(build(&options).is_err());
        assert!(!out.exists());
    }
}
