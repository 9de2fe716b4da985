use crate::index::InvertedIndex;
use crate::tokenizer::stem;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// Informational sidecar written next to each index artifact. Its absence
/// never blocks a query.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub created_at: String,
    pub engine: String,
    pub documents: usize,
    #[serde(default)]
    pub empty_documents: Option<usize>,
    pub terms: usize,
}

/// Write the index in the canonical text format: one term per line,
/// `term \t doc:count doc:count ...`, terms and documents in lexicographic
/// order.
pub fn write_index(index: &InvertedIndex, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create index file {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for (term, docs) in index.iter() {
        write!(w, "{term}\t")?;
        let mut first = true;
        for (doc, count) in docs {
            if !first {
                write!(w, " ")?;
            }
            write!(w, "{doc}:{count}")?;
            first = false;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

/// Parse one index line into its term and postings. Returns `None` when the
/// line carries nothing loadable (blank, or a term that stems away).
fn parse_line(line: &str) -> Option<(String, Vec<(String, u32)>)> {
    let mut fields = line.split_whitespace();
    let raw_term = fields.next()?;
    // Re-stemming is a no-op for well-formed files (stemming is idempotent)
    // and filters stop-word terms out of hand-edited ones.
    let term = stem(raw_term)?;
    let mut postings = Vec::new();
    for field in fields {
        let Some((doc, count)) = field.split_once(':') else {
            tracing::debug!(field, "skipping posting without ':'");
            continue;
        };
        let Ok(count) = count.parse::<u32>() else {
            tracing::debug!(field, "skipping posting with non-integer count");
            continue;
        };
        postings.push((doc.to_string(), count));
    }
    Some((term, postings))
}

/// Load an index artifact, tolerating malformed posting fields and merging
/// duplicate term lines (counts summed, same rule as the build-time
/// aggregator).
pub fn load_index(path: &Path) -> Result<InvertedIndex> {
    let file = File::open(path)
        .with_context(|| format!("failed to open index file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut index = InvertedIndex::new();
    for line in reader.lines() {
        let line = line?;
        let Some((term, postings)) = parse_line(&line) else {
            continue;
        };
        for (doc, count) in postings {
            index.add(term.clone(), doc, count);
        }
    }
    Ok(index)
}

pub fn write_meta(index_path: &Path, meta: &MetaFile) -> Result<()> {
    let path = meta_path(index_path);
    let json = serde_json::to_string_pretty(meta)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write meta file {}", path.display()))?;
    Ok(())
}

pub fn load_meta(index_path: &Path) -> Result<MetaFile> {
    let path = meta_path(index_path);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read meta file {}", path.display()))?;
    Ok(serde_json::from_str(&json)?)
}

fn meta_path(index_path: &Path) -> PathBuf {
    index_path.with_extension("meta.json")
}

static BUILD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Name a new artifact. Each build gets a fresh name; artifacts are immutable
/// once written, so names must never repeat. The microsecond timestamp keeps
/// names unique across processes and the per-process sequence covers builds
/// landing within the clock's resolution.
pub fn artifact_name(engine: &str, datasets: &[PathBuf], partitions: usize) -> String {
    let ts = OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day]_[hour]-[minute]-[second]-[subsecond digits:6]"
        ))
        .unwrap_or_else(|_| "unknown".into());
    let seq = BUILD_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut base: String = datasets
        .iter()
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join("_");
    if base.len() > 80 {
        let mut end = 80;
        while !base.is_char_boundary(end) {
            end -= 1;
        }
        base.truncate(end);
    }
    format!("{ts}-{seq:03}_{engine}_{base}_{partitions}.txt")
}

pub fn created_at_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// List index artifacts (`.txt`) in a directory, newest first.
pub fn list_indexes(dir: &Path) -> Result<Vec<String>> {
    let mut entries: Vec<(String, std::time::SystemTime)> = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read index directory {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".txt") || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry
            .metadata()?
            .modified()
            .unwrap_or(std::time::UNIX_EPOCH);
        entries.push((name, modified));
    }
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(entries.into_iter().map(|(name, _)| name).collect())
}
