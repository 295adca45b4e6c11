use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use kotoba_builder::crossref::{DEFAULT_MATCH_THRESHOLD, DEFAULT_SREF_CAP};
use kotoba_builder::{BuildOptions, MatchPolicy, build};
use kotoba_corpus::LoadMode;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_WORDS: &str = "words.xml";
const DEFAULT_SENTENCES: &str = "sentences.pipe";
const DEFAULT_OUT_DIR: &str = ".";

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    let options = config.build_options();
    info!(
        "using words at {} and sentences at {} (mode: {:?})",
        options.words_path.display(),
        options.sentences_path.display(),
        options.load_mode
    );
    info!("writing tables to {}", options.out_dir.display());
    info!(
        "match threshold {}, sentence cap {}{}",
        options.policy.threshold,
        options.policy.cap,
        if options.policy.reading_substring {
            ", reading substring fallback on"
        } else {
            ""
        }
    );

    build(&options)?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    words_path: PathBuf,
    sentences_path: PathBuf,
    out_dir: PathBuf,
    load_mode: LoadMode,
    match_threshold: usize,
    sref_cap: usize,
    seed: Option<u64>,
    threads: Option<usize>,
    reading_fallback: bool,
    stats_path: Option<PathBuf>,
}

impl Config {
    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            load_mode: self.load_mode,
            policy: MatchPolicy {
                threshold: self.match_threshold,
                cap: self.sref_cap,
                reading_substring: self.reading_fallback,
            },
            seed: self.seed,
            threads: self.threads,
            stats_path: self.stats_path.clone(),
            ..BuildOptions::new(&self.words_path, &self.sentences_path, &self.out_dir)
        }
    }
}

fn load_config() -> Config {
    let mut cli: Vec<(String, String)> = Vec::new();
    let mut reading_fallback = false;
    for arg in env::args().skip(1) {
        if arg == "--reading-fallback" {
            reading_fallback = true;
        } else if let Some((key, value)) = arg.strip_prefix("--").and_then(|a| a.split_once('=')) {
            cli.push((key.to_string(), value.to_string()));
        }
    }
    let setting = |flag: &str, var: &str| -> Option<String> {
        cli.iter()
            .rev()
            .find(|(key, _)| key == flag)
            .map(|(_, value)| value.clone())
            .or_else(|| env::var(var).ok())
    };

    let words_path = setting("words", "KOTOBA_WORDS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WORDS));
    let sentences_path = setting("sentences", "KOTOBA_SENTENCES")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SENTENCES));
    let out_dir = setting("out-dir", "KOTOBA_OUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));
    let load_mode = setting("load-mode", "KOTOBA_LOAD_MODE")
        .as_deref()
        .and_then(parse_load_mode)
        .unwrap_or(LoadMode::Mmap);
    let match_threshold = parse_number(
        "match-threshold",
        setting("match-threshold", "KOTOBA_MATCH_THRESHOLD"),
    )
    .unwrap_or(DEFAULT_MATCH_THRESHOLD);
    let sref_cap = parse_number("sref-cap", setting("sref-cap", "KOTOBA_SREF_CAP"))
        .unwrap_or(DEFAULT_SREF_CAP);
    let seed = parse_number::<u64>("seed", setting("seed", "KOTOBA_SEED"));
    let threads = parse_number::<usize>("threads", setting("threads", "KOTOBA_THREADS"))
        .filter(|v| *v > 0);
    let reading_fallback = reading_fallback
        || env::var("KOTOBA_READING_FALLBACK")
            .ok()
            .as_deref()
            .is_some_and(parse_flag);
    let stats_path = setting("stats", "KOTOBA_STATS").map(PathBuf::from);

    Config {
        words_path,
        sentences_path,
        out_dir,
        load_mode,
        match_threshold,
        sref_cap,
        seed,
        threads,
        reading_fallback,
        stats_path,
    }
}

/// Parse an optional numeric setting, warning when a value is present but
/// unusable so the default is not applied silently.
fn parse_number<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring invalid {name} value {raw:?}; using the default");
            None
        }
    }
}

fn parse_load_mode(raw: &str) -> Option<LoadMode> {
    match raw.to_ascii_lowercase().as_str() {
        "mmap" => Some(LoadMode::Mmap),
        "owned" => Some(LoadMode::Owned),
        _ => None,
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
