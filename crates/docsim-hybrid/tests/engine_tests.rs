use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use docsim_core::config::Settings;
use docsim_core::types::{Method, Representation, ScoreSource};
use docsim_core::Error;
use docsim_embed::HashingEmbedder;
use docsim_hybrid::cache::SEMANTIC_FILE;
use docsim_hybrid::{ArtifactStatus, BuildOutcome, DocumentStore, SimilarityEngine};

const CORPUS: &[(&str, &str)] = &[
    ("a.txt", "Central bank raised interest rates; markets slumped."),
    ("b.txt", "Markets rallied after the central bank held interest rates."),
    ("c.txt", "Bank shares rallied as markets cheered earnings."),
    ("d.txt", "Football club signed a striker."),
    ("e.txt", "Oil markets steady."),
];

fn write_corpus(dir: &Path) -> Vec<PathBuf> {
    CORPUS
        .iter()
        .map(|(name, body)| {
            let p = dir.join(name);
            fs::write(&p, body).unwrap();
            fs::canonicalize(&p).unwrap()
        })
        .collect()
}

fn settings(cache_dir: &Path) -> Settings {
    let mut s = Settings::default();
    s.cache.dir = cache_dir.to_string_lossy().into_owned();
    s.lexical.min_df = 1;
    s.lexical.max_df = 1.0;
    s.semantic.dim = 64;
    s
}

fn engine(cache_dir: &Path) -> SimilarityEngine {
    let embedder = HashingEmbedder::new(64).unwrap();
    SimilarityEngine::open(settings(cache_dir), Some(Box::new(embedder))).expect("open")
}

#[test]
fn get_or_update_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let mut store = DocumentStore::new();

    let first = store.get_or_update(&paths[0], false).unwrap();
    let second = store.get_or_update(&paths[0], false).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.stats().misses, 1, "second lookup must not renormalize");
    assert_eq!(store.stats().hits, 1);
    assert_eq!(first.file_size, CORPUS[0].1.len());
}

#[test]
fn changed_bytes_invalidate_the_record() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let mut store = DocumentStore::new();

    let before = store.get_or_update(&paths[0], false).unwrap();
    fs::write(&paths[0], "Entirely different text about harvest yields.").unwrap();
    let after = store.get_or_update(&paths[0], false).unwrap();

    assert_ne!(before.content_hash, after.content_hash);
    assert!(after.lexical_text.contains("harvest"));
    assert_eq!(store.stats().misses, 2);
    assert_eq!(store.len(), 1);
}

#[test]
fn rows_align_and_each_document_matches_itself() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let mut eng = engine(&tmp.path().join("cache"));

    let report = eng.build(&paths, Method::Both, false);
    assert_eq!(report.lexical, BuildOutcome::Built(5));
    assert_eq!(report.semantic, BuildOutcome::Built(5));

    let lexical_rows: Vec<PathBuf> = eng.lexical_index().unwrap().rows().paths().map(Path::to_path_buf).collect();
    assert_eq!(lexical_rows, paths);

    for repr in [Representation::Lexical, Representation::Semantic] {
        for (i, p) in paths.iter().enumerate() {
            let scores = eng.scores(p, repr).unwrap();
            assert_eq!(scores.len(), paths.len());
            assert!((scores[i] - 1.0).abs() < 1e-5, "{} row {} self-similarity {}", repr, i, scores[i]);
        }
    }
}

#[test]
fn top_k_excludes_query_and_is_monotonic() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let mut eng = engine(&tmp.path().join("cache"));
    eng.build(&paths, Method::Lexical, false);

    let hits = eng.top_k(&paths[0], Representation::Lexical, 10).unwrap();

    assert!(hits.len() >= 2, "expected several neighbours, got {:?}", hits);
    assert!(hits.iter().all(|h| h.path != paths[0]), "query must not match itself");
    assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    assert_eq!(hits.iter().map(|h| h.rank).collect::<Vec<_>>(), (1..=hits.len()).collect::<Vec<_>>());
    assert_eq!(hits[0].path, paths[1]);
    assert!(hits.iter().all(|h| h.path != paths[3]), "football story shares no terms");

    let limited = eng.top_k(&paths[0], Representation::Lexical, 1).unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn semantic_compare_is_symmetric() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let mut eng = engine(&tmp.path().join("cache"));

    let ab = eng.compare(&paths[0], &paths[1], Representation::Semantic).unwrap();
    let ba = eng.compare(&paths[1], &paths[0], Representation::Semantic).unwrap();
    assert_eq!(ab.source, ScoreSource::Ephemeral);
    assert!((ab.score - ba.score).abs() < 1e-6);

    eng.build(&paths, Method::Semantic, false);
    let ab = eng.compare(&paths[0], &paths[1], Representation::Semantic).unwrap();
    let ba = eng.compare(&paths[1], &paths[0], Representation::Semantic).unwrap();
    assert_eq!(ab.source, ScoreSource::Index);
    assert!((ab.score - ba.score).abs() < 1e-6);
}

#[test]
fn identical_documents_are_lexically_identical() {
    let tmp = TempDir::new().unwrap();
    let text = "the company reported strong quarterly earnings growth";
    let a = tmp.path().join("one.txt");
    let b = tmp.path().join("two.txt");
    fs::write(&a, text).unwrap();
    fs::write(&b, text).unwrap();
    let mut eng = SimilarityEngine::in_memory(Settings::default(), None);

    let score = eng.similarity(&a, &b, Representation::Lexical).unwrap();
    assert!((score - 1.0).abs() < 1e-5, "score = {}", score);

    let pair = eng.compare(&a, &b, Representation::Lexical).unwrap();
    assert_eq!(pair.source, ScoreSource::Ephemeral);
    assert!((pair.score - 1.0).abs() < 1e-5);
}

#[test]
fn out_of_vocabulary_query_finds_nothing() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let query = tmp.path().join("query.txt");
    fs::write(&query, "Zebras gallop over savannah grasslands.").unwrap();
    let mut eng = engine(&tmp.path().join("cache"));
    eng.build(&paths, Method::Lexical, false);

    let scores = eng.scores(&query, Representation::Lexical).unwrap();
    assert!(scores.iter().all(|s| s.abs() < 1e-6), "{:?}", scores);

    let result = eng.find_similar(&query, Method::Lexical, 5).unwrap();
    let lexical = result.lexical.unwrap();
    assert!(lexical.entries.is_empty());
    assert_eq!(lexical.coverage, 0.0);
}

#[test]
fn corrupt_semantic_artifact_leaves_lexical_usable() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let cache_dir = tmp.path().join("cache");
    {
        let mut eng = engine(&cache_dir);
        eng.build(&paths, Method::Both, false);
        let saved = eng.flush().unwrap();
        assert_eq!(saved.written.len(), 3);
    }
    fs::write(cache_dir.join(SEMANTIC_FILE), b"{\"model_id\": 42").unwrap();

    let mut eng = engine(&cache_dir);
    assert_eq!(eng.load_report().lexical, ArtifactStatus::Loaded(5));
    assert!(matches!(eng.load_report().semantic, ArtifactStatus::Corrupt(_)));
    assert!(eng.semantic_index().is_none());

    let result = eng.find_similar(&paths[0], Method::Both, 3).unwrap();
    assert!(result.lexical.is_some());
    assert!(result.semantic.is_none());
    assert_eq!(eng.store().stats().misses, 0, "records came back from the cache");
}

#[test]
fn empty_build_keeps_previous_index() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let mut eng = engine(&tmp.path().join("cache"));
    eng.build(&paths, Method::Lexical, false);

    let report = eng.build(&[], Method::Lexical, false);
    assert_eq!(report.lexical, BuildOutcome::Empty);
    assert_eq!(report.semantic, BuildOutcome::Skipped);
    assert_eq!(eng.lexical_index().map(|ix| ix.len()), Some(5));
}

#[test]
fn queries_without_an_index_are_not_indexed() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let mut eng = engine(&tmp.path().join("cache"));

    let err = eng.find_similar(&paths[0], Method::Both, 3).unwrap_err();
    assert!(matches!(err, Error::NotIndexed(Representation::Lexical)));
    let err = eng.top_k(&paths[0], Representation::Semantic, 3).unwrap_err();
    assert!(matches!(err, Error::NotIndexed(Representation::Semantic)));
}

#[test]
fn semantic_without_encoder_or_with_other_encoder_fails() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let cache_dir = tmp.path().join("cache");
    {
        let mut eng = engine(&cache_dir);
        eng.build(&paths, Method::Semantic, false);
        eng.flush().unwrap();
    }

    let mut no_encoder = SimilarityEngine::open(settings(&cache_dir), None).unwrap();
    assert!(!no_encoder.has_semantic_capability());
    assert!(matches!(no_encoder.find_similar(&paths[0], Method::Semantic, 3), Err(Error::NoEncoder)));
    assert!(matches!(no_encoder.similarity(&paths[0], &paths[1], Representation::Semantic), Err(Error::NoEncoder)));
    let cached = no_encoder.compare(&paths[0], &paths[1], Representation::Semantic).unwrap();
    assert_eq!(cached.source, ScoreSource::Index, "cached rows need no encoder");

    let other = HashingEmbedder::new(32).unwrap();
    let mut mismatched = SimilarityEngine::open(settings(&cache_dir), Some(Box::new(other))).unwrap();
    let err = mismatched.find_similar(&paths[0], Method::Semantic, 3).unwrap_err();
    assert!(matches!(err, Error::ModelMismatch { .. }));
}

#[test]
fn edited_document_falls_back_to_ephemeral_compare() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let mut eng = engine(&tmp.path().join("cache"));
    eng.build(&paths, Method::Lexical, false);

    assert_eq!(eng.compare(&paths[0], &paths[1], Representation::Lexical).unwrap().source, ScoreSource::Index);
    fs::write(&paths[1], "Central bank raised interest rates; markets slumped.").unwrap();
    let pair = eng.compare(&paths[0], &paths[1], Representation::Lexical).unwrap();
    assert_eq!(pair.source, ScoreSource::Ephemeral);
    assert!((pair.score - 1.0).abs() < 1e-5);
}

#[test]
fn unreadable_documents_are_reported_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let mut paths = write_corpus(tmp.path());
    let missing = tmp.path().join("missing.txt");
    paths.push(missing.clone());
    let mut eng = engine(&tmp.path().join("cache"));

    let report = eng.build(&paths, Method::Lexical, false);
    assert_eq!(report.ingest.processed.len(), 5);
    assert_eq!(report.ingest.failures.len(), 1);
    assert_eq!(report.ingest.failures[0].0, missing);
    assert!(matches!(eng.scores(&missing, Representation::Lexical), Err(Error::Read { .. })));
}

#[test]
fn batch_analysis_flags_duplicates() {
    let tmp = TempDir::new().unwrap();
    let mut paths = write_corpus(tmp.path());
    let copy = tmp.path().join("copy.txt");
    fs::write(&copy, CORPUS[0].1).unwrap();
    paths.push(fs::canonicalize(&copy).unwrap());
    let mut eng = engine(&tmp.path().join("cache"));
    eng.build(&paths, Method::Lexical, false);

    let summary = eng.batch_analysis(&paths, Representation::Lexical).unwrap();
    assert_eq!(summary.pairs.len(), 15);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.duplicates.len(), 1);
    assert_eq!(summary.duplicates[0].a, paths[0]);
    assert!(summary.max.unwrap().score > 0.99);
    assert!(summary.mean.unwrap() > 0.0);
}

#[test]
fn clear_index_removes_artifact_and_stats_follow() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let cache_dir = tmp.path().join("cache");
    let mut eng = engine(&cache_dir);
    eng.build(&paths, Method::Both, false);
    eng.flush().unwrap();

    let stats = eng.stats();
    assert_eq!(stats.total_documents, 5);
    assert_eq!(stats.lexical_indexed, 5);
    assert_eq!(stats.dim, Some(64));
    assert_eq!(stats.model_id.as_deref(), Some("hashing-xxh64:d64"));
    assert!(stats.semantic_capable);
    assert!(stats.lexical_built_at.is_some());
    assert!(stats.semantic_built_at.is_some());

    assert!(eng.clear_index(Representation::Semantic).unwrap());
    assert!(!cache_dir.join(SEMANTIC_FILE).exists());
    assert!(eng.semantic_index().is_none());
    let stats = eng.stats();
    assert_eq!(stats.semantic_indexed, 0);
    assert!(stats.semantic_built_at.is_none());
    assert_eq!(stats.lexical_built_at, eng.lexical_index().map(|l| l.built_at()));
    assert!(!eng.clear_index(Representation::Semantic).unwrap());
}

#[test]
fn repeated_and_aliased_paths_count_once() {
    let tmp = TempDir::new().unwrap();
    let paths = write_corpus(tmp.path());
    let mut eng = engine(&tmp.path().join("cache"));
    let inputs = vec![
        paths[0].clone(),
        paths[1].clone(),
        paths[2].clone(),
        paths[0].clone(),
        tmp.path().join(".").join("a.txt"),
    ];

    let report = eng.build(&inputs, Method::Both, false);

    assert_eq!(report.lexical, BuildOutcome::Built(3));
    assert_eq!(report.semantic, BuildOutcome::Built(3));
    assert_eq!(report.ingest.processed, paths[..3].to_vec());
    assert!(report.ingest.failures.is_empty());
    assert_eq!(eng.store().len(), 3);
}
