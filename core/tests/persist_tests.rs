use index_core::persist::{artifact_name, list_indexes, load_index, write_index, MetaFile};
use index_core::InvertedIndex;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn sample_index() -> InvertedIndex {
    let mut idx = InvertedIndex::new();
    idx.add("cloud".into(), "doc1.txt".into(), 3);
    idx.add("cloud".into(), "doc2.txt".into(), 1);
    idx.add("rain".into(), "doc1.txt".into(), 2);
    idx
}

#[test]
fn round_trip_preserves_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.txt");
    let idx = sample_index();
    write_index(&idx, &path).unwrap();
    let loaded = load_index(&path).unwrap();
    assert_eq!(loaded, idx);
}

#[test]
fn written_format_is_canonical() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.txt");
    write_index(&sample_index(), &path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, "cloud\tdoc1.txt:3 doc2.txt:1\nrain\tdoc1.txt:2\n");
}

#[test]
fn duplicate_term_lines_merge_counts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.txt");
    fs::write(&path, "cloud doc1.txt:3 doc2.txt:1\ncloud doc1.txt:2\n").unwrap();
    let loaded = load_index(&path).unwrap();
    let postings = loaded.postings("cloud").unwrap();
    assert_eq!(postings["doc1.txt"], 5);
    assert_eq!(postings["doc2.txt"], 1);
}

#[test]
fn malformed_postings_are_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.txt");
    fs::write(
        &path,
        "cloud doc1.txt:3 broken doc2.txt:notanumber doc3.txt:4\n",
    )
    .unwrap();
    let loaded = load_index(&path).unwrap();
    let postings = loaded.postings("cloud").unwrap();
    assert_eq!(postings.len(), 2);
    assert_eq!(postings["doc1.txt"], 3);
    assert_eq!(postings["doc3.txt"], 4);
}

#[test]
fn stopword_term_lines_are_dropped_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.txt");
    fs::write(&path, "the doc1.txt:9\ncloud doc1.txt:1\n").unwrap();
    let loaded = load_index(&path).unwrap();
    assert!(loaded.postings("the").is_none());
    assert!(loaded.postings("cloud").is_some());
}

#[test]
fn zero_posting_lines_are_tolerated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.txt");
    fs::write(&path, "cloud\nrain doc1.txt:1\n").unwrap();
    let loaded = load_index(&path).unwrap();
    assert!(loaded.postings("cloud").is_none());
    assert_eq!(loaded.postings("rain").unwrap()["doc1.txt"], 1);
}

#[test]
fn artifact_names_never_repeat() {
    let datasets = vec![PathBuf::from("docs.txt")];
    // Back-to-back builds of the same selection land within the clock's
    // resolution; the names must still differ so no artifact is overwritten.
    let first = artifact_name("sequential", &datasets, 2);
    let second = artifact_name("sequential", &datasets, 2);
    assert_ne!(first, second);
    assert!(first.contains("_sequential_docs_2"));
    assert!(first.ends_with(".txt"));
}

#[test]
fn list_indexes_returns_newest_first_and_only_artifacts() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("older.txt"), "cloud\tdoc1.txt:1\n").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));
    fs::write(dir.path().join("newer.txt"), "rain\tdoc2.txt:1\n").unwrap();
    fs::write(dir.path().join("older.meta.json"), "{}").unwrap();

    let names = list_indexes(dir.path()).unwrap();
    assert_eq!(names, vec!["newer.txt", "older.txt"]);
}

#[test]
fn meta_sidecar_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.txt");
    let meta = MetaFile {
        version: 1,
        created_at: "2026-01-01T00:00:00Z".into(),
        engine: "sequential".into(),
        documents: 4,
        empty_documents: Some(1),
        terms: 120,
    };
    index_core::persist::write_meta(&path, &meta).unwrap();
    let loaded = index_core::persist::load_meta(&path).unwrap();
    assert_eq!(loaded.documents, 4);
    assert_eq!(loaded.engine, "sequential");
}
