//! docsim: build and query lexical/semantic similarity indexes over a folder
//! of text documents.
//!
//! ```bash
//! docsim build ./articles
//! docsim query ./articles/fed.txt -k 5
//! docsim compare a.txt b.txt --repr semantic
//! docsim batch ./articles --json
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docsim_core::config::Config;
use docsim_core::corpus::{list_txt_files, DEFAULT_PATTERN};
use docsim_core::types::{Method, QueryResultEntry, Representation, ScoreSource, SimilarityBand};
use docsim_embed::get_default_embedder;
use docsim_hybrid::{BuildOutcome, SimilarityEngine};

#[derive(Parser)]
#[command(name = "docsim", version, about)]
struct Cli {
    /// Cache directory (overrides `cache.dir`)
    #[arg(long, global = true, env = "DOCSIM_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process documents and (re)build indexes
    Build {
        dir: PathBuf,
        #[arg(long, default_value = DEFAULT_PATTERN)]
        pattern: String,
        #[arg(long, value_enum, default_value_t = MethodArg::Both)]
        method: MethodArg,
        /// Re-normalize documents even when unchanged
        #[arg(long)]
        force: bool,
    },
    /// Most similar indexed documents to FILE
    Query {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = MethodArg::Both)]
        method: MethodArg,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Similarity of two documents
    Compare {
        a: PathBuf,
        b: PathBuf,
        #[arg(long, value_enum, default_value_t = ReprArg::Lexical)]
        repr: ReprArg,
        /// Skip the index and compute from the two documents alone
        #[arg(long)]
        ephemeral: bool,
    },
    /// All-pairs similarity over a directory
    Batch {
        dir: PathBuf,
        #[arg(long, default_value = DEFAULT_PATTERN)]
        pattern: String,
        #[arg(long, value_enum, default_value_t = ReprArg::Lexical)]
        repr: ReprArg,
    },
    /// Index and cache statistics
    Stats,
    /// Remove an index from memory and disk
    Clear {
        #[arg(value_enum)]
        repr: ReprArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Lexical,
    Semantic,
    Both,
}

impl From<MethodArg> for Method {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Lexical => Method::Lexical,
            MethodArg::Semantic => Method::Semantic,
            MethodArg::Both => Method::Both,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReprArg {
    Lexical,
    Semantic,
}

impl From<ReprArg> for Representation {
    fn from(r: ReprArg) -> Self {
        match r {
            ReprArg::Lexical => Representation::Lexical,
            ReprArg::Semantic => Representation::Semantic,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let mut settings = Config::load()?.settings().context("loading configuration")?;
    if let Some(dir) = &cli.cache_dir {
        settings.cache.dir = dir.to_string_lossy().into_owned();
    }
    let embedder = get_default_embedder(&settings)?;
    let mut engine = SimilarityEngine::open(settings, embedder)?;

    match cli.command {
        Command::Build { dir, pattern, method, force } => {
            let files = list_txt_files(&dir, &pattern)?;
            info!(files = files.len(), dir = %dir.display(), "corpus listed");
            let method = Method::from(method);
            let bar_style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} encoded")?
                .progress_chars("#>-");
            let pb = ProgressBar::new_spinner();
            pb.set_message(format!("reading and indexing {} files", files.len()));
            pb.enable_steady_tick(Duration::from_millis(120));
            let report = engine.build_with_progress(&files, method, force, |done, total| {
                if pb.length() != Some(total as u64) {
                    pb.set_style(bar_style.clone());
                    pb.set_length(total as u64);
                }
                pb.set_position(done as u64);
            });
            pb.finish_and_clear();
            let saved = engine.flush()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "files": files.len(),
                        "processed": report.ingest.processed.len(),
                        "read_failures": report.ingest.failures.len(),
                        "encode_failures": report.encode_failures.len(),
                        "lexical": report.lexical,
                        "semantic": report.semantic,
                        "written": saved.written,
                    })
                );
            } else {
                println!("Documents: {} found, {} processed", files.len(), report.ingest.processed.len());
                for (path, why) in &report.ingest.failures {
                    println!("  unreadable {}: {}", path.display(), why);
                }
                println!("Lexical index:  {}", describe(report.lexical));
                println!("Semantic index: {}", describe(report.semantic));
                for (path, why) in &report.encode_failures {
                    println!("  not encoded {}: {}", path.display(), why);
                }
                println!("Saved to {}: {}", engine.settings().cache_dir().display(), saved.written.join(", "));
            }
        }
        Command::Query { file, method, top_k } => {
            let k = top_k.unwrap_or(engine.settings().query.top_k);
            let result = engine.find_similar(&file, method.into(), k)?;
            engine.flush()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                if let Some(lex) = &result.lexical {
                    println!("Lexical (vocabulary {}, coverage {:.0}%):", lex.vocab_size, lex.coverage * 100.0);
                    print_entries(&lex.entries);
                }
                if let Some(sem) = &result.semantic {
                    println!("Semantic ({}, {} dims):", sem.model_id, sem.dim);
                    print_entries(&sem.entries);
                }
            }
        }
        Command::Compare { a, b, repr, ephemeral } => {
            let repr = Representation::from(repr);
            let (score, source) = if ephemeral {
                (engine.similarity(&a, &b, repr)?, ScoreSource::Ephemeral)
            } else {
                let pair = engine.compare(&a, &b, repr)?;
                (pair.score, pair.source)
            };
            engine.flush()?;
            let band = SimilarityBand::classify(score);
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "a": a, "b": b, "representation": repr, "score": score, "source": source, "band": band })
                );
            } else {
                let from = match source {
                    ScoreSource::Index => "from index",
                    ScoreSource::Ephemeral => "computed directly",
                };
                println!("{} similarity: {:.4} ({}, {})", repr, score, band.describe(), from);
            }
        }
        Command::Batch { dir, pattern, repr } => {
            let files = list_txt_files(&dir, &pattern)?;
            let summary = engine.batch_analysis(&files, repr.into())?;
            engine.flush()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{} pairs over {} documents ({})", summary.pairs.len(), files.len(), summary.representation);
                if let Some(mean) = summary.mean {
                    println!("Mean similarity: {:.4}", mean);
                }
                if let Some(p) = &summary.max {
                    println!("Most similar:  {:.4}  {} <> {}", p.score, name(&p.a), name(&p.b));
                }
                if let Some(p) = &summary.min {
                    println!("Least similar: {:.4}  {} <> {}", p.score, name(&p.a), name(&p.b));
                }
                println!("Likely duplicates (>= {}): {}", engine.settings().query.duplicate_threshold, summary.duplicates.len());
                for p in &summary.duplicates {
                    println!("  {:.4}  {} <> {}", p.score, name(&p.a), name(&p.b));
                }
                for (a, b, why) in &summary.failures {
                    println!("  skipped {} <> {}: {}", name(a), name(b), why);
                }
            }
        }
        Command::Stats => {
            let stats = engine.stats();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                let report = engine.load_report();
                println!("Cache: {}", engine.settings().cache_dir().display());
                println!("  documents.json:      {}", report.documents);
                println!("  lexical_index.json:  {}", report.lexical);
                println!("  semantic_index.json: {}", report.semantic);
                println!("Documents: {} ({} with lexical text)", stats.total_documents, stats.documents_with_lexical_text);
                println!(
                    "Lexical:   {} rows, vocabulary {}, built {}",
                    stats.lexical_indexed,
                    stats.vocab_size.unwrap_or(0),
                    built(stats.lexical_built_at)
                );
                println!(
                    "Semantic:  {} rows, {} ({} dims), built {}, encoder {}",
                    stats.semantic_indexed,
                    stats.model_id.as_deref().unwrap_or("-"),
                    stats.dim.unwrap_or(0),
                    built(stats.semantic_built_at),
                    if stats.semantic_capable { "available" } else { "disabled" }
                );
            }
        }
        Command::Clear { repr } => {
            let repr = Representation::from(repr);
            let removed = engine.clear_index(repr)?;
            println!("{} index {}", repr, if removed { "removed" } else { "was not present" });
        }
    }
    Ok(())
}

fn describe(outcome: BuildOutcome) -> String {
    match outcome {
        BuildOutcome::Skipped => "skipped".into(),
        BuildOutcome::Built(n) => format!("built ({} documents)", n),
        BuildOutcome::Empty => "nothing to index, previous index kept".into(),
    }
}

fn built(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "never".into(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

fn print_entries(entries: &[QueryResultEntry]) {
    if entries.is_empty() {
        println!("  (no similar documents)");
    }
    for e in entries {
        println!("  {:>2}. {:.4}  {}", e.rank, e.similarity, e.path.display());
    }
}

fn name(p: &Path) -> String {
    p.file_name().map_or_else(|| p.display().to_string(), |n| n.to_string_lossy().into_owned())
}
