use crate::index::{aggregate, process_document, InvertedIndex};
use crate::persist::write_index;
use anyhow::{bail, ensure, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Outcome of one index build. `empty_documents` is `None` when the engine
/// cannot observe per-document processing (the external engine owns its own
/// accounting).
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct BuildStats {
    pub documents: usize,
    pub empty_documents: Option<usize>,
    pub terms: usize,
}

/// The narrow seam between the core and whatever executes a build: input
/// document paths, an output path, and a partition count in; an artifact in
/// the canonical text format out. Scheduling, retries, and fault tolerance
/// belong to the implementation behind this trait, never to callers.
pub trait BuildEngine {
    fn name(&self) -> &'static str;

    fn build(&self, inputs: &[PathBuf], output: &Path, partitions: usize) -> Result<BuildStats>;
}

fn ensure_inputs(inputs: &[PathBuf]) -> Result<()> {
    ensure!(!inputs.is_empty(), "no documents selected for build");
    Ok(())
}

/// Build one partial index from a slice of documents, merging incrementally.
/// This is the map+combine step of the parallel path and the whole of the
/// sequential one.
fn index_partition(docs: &[PathBuf]) -> (InvertedIndex, usize) {
    let mut partial = InvertedIndex::new();
    let mut empty = 0;
    for path in docs {
        let doc_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let counts = process_document(path);
        if counts.is_empty() {
            empty += 1;
            continue;
        }
        partial.insert_document(&doc_id, counts);
    }
    (partial, empty)
}

/// Single-threaded build: one pass over the documents, one partial index
/// folded as it goes.
pub struct SequentialEngine;

impl BuildEngine for SequentialEngine {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn build(&self, inputs: &[PathBuf], output: &Path, _partitions: usize) -> Result<BuildStats> {
        ensure_inputs(inputs)?;
        let (index, empty) = index_partition(inputs);
        write_index(&index, output)?;
        tracing::info!(
            documents = inputs.len(),
            empty,
            terms = index.num_terms(),
            "sequential build complete"
        );
        Ok(BuildStats {
            documents: inputs.len(),
            empty_documents: Some(empty),
            terms: index.num_terms(),
        })
    }
}

/// In-process map/combine/reduce build. Documents are split into disjoint
/// partitions; each partition is combined into a partial index concurrently;
/// the partials are reduced by the same merge the sequential engine uses.
/// Output is byte-identical with [`SequentialEngine`] for the same inputs.
pub struct ParallelEngine;

impl BuildEngine for ParallelEngine {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn build(&self, inputs: &[PathBuf], output: &Path, partitions: usize) -> Result<BuildStats> {
        ensure_inputs(inputs)?;
        let partitions = partitions.max(1).min(inputs.len());
        let chunk = inputs.len().div_ceil(partitions);

        let partials: Vec<(InvertedIndex, usize)> = inputs
            .par_chunks(chunk)
            .map(index_partition)
            .collect();

        let empty: usize = partials.iter().map(|(_, e)| e).sum();
        let index = aggregate(partials.into_iter().map(|(p, _)| p));
        write_index(&index, output)?;
        tracing::info!(
            documents = inputs.len(),
            empty,
            partitions,
            terms = index.num_terms(),
            "parallel build complete"
        );
        Ok(BuildStats {
            documents: inputs.len(),
            empty_documents: Some(empty),
            terms: index.num_terms(),
        })
    }
}

/// Out-of-process distributed engine behind the same seam. The launcher is
/// invoked as `<command> <input>... <output> <partitions>` and must write the
/// canonical text format to the output path. A non-zero exit or a missing
/// artifact fails the build attempt outright; no partial output is cleaned up
/// here.
pub struct ExternalEngine {
    pub command: PathBuf,
}

impl BuildEngine for ExternalEngine {
    fn name(&self) -> &'static str {
        "external"
    }

    fn build(&self, inputs: &[PathBuf], output: &Path, partitions: usize) -> Result<BuildStats> {
        ensure_inputs(inputs)?;
        let status = Command::new(&self.command)
            .args(inputs)
            .arg(output)
            .arg(partitions.to_string())
            .status()?;
        if !status.success() {
            bail!(
                "external index engine {} failed: {status}",
                self.command.display()
            );
        }
        ensure!(
            output.is_file(),
            "external index engine reported success but wrote no artifact at {}",
            output.display()
        );
        // The engine owns its own accounting; read the artifact back for the
        // term count only. How many inputs came up empty is not observable
        // from here.
        let index = crate::persist::load_index(output)?;
        Ok(BuildStats {
            documents: inputs.len(),
            empty_documents: None,
            terms: index.num_terms(),
        })
    }
}

/// Resolve an engine by name, as selected by the CLI and the HTTP layer.
pub fn engine_for(name: &str, external_cmd: Option<PathBuf>) -> Result<Box<dyn BuildEngine>> {
    match name {
        "sequential" => Ok(Box::new(SequentialEngine)),
        "parallel" => Ok(Box::new(ParallelEngine)),
        "external" => {
            let command = match external_cmd {
                Some(cmd) => cmd,
                None => bail!("external engine requires a launcher command"),
            };
            Ok(Box::new(ExternalEngine { command }))
        }
        other => bail!("unknown build engine: {other}"),
    }
}
