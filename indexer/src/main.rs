use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use index_core::corpus::CorpusStore;
use index_core::engine::engine_for;
use index_core::persist::{artifact_name, created_at_now, load_index, write_meta, MetaFile};
use index_core::score::{docs_with_all_terms, rank, score_documents};
use index_core::Query;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a term->document postings index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index artifact from a document corpus
    Build {
        /// Corpus directory to index (.txt/.xml documents)
        #[arg(long, conflicts_with = "files")]
        input: Option<PathBuf>,
        /// Explicit document files to index instead of a whole directory
        #[arg(long, value_name = "FILE", num_args = 1..)]
        files: Vec<PathBuf>,
        /// Directory to write the index artifact into
        #[arg(long)]
        output: PathBuf,
        /// Build engine: sequential, parallel, or external
        #[arg(long, default_value = "sequential")]
        engine: String,
        /// Partition count for the parallel/external engines
        #[arg(long, default_value_t = 2)]
        partitions: usize,
        /// Launcher command for the external engine
        #[arg(long)]
        external_cmd: Option<PathBuf>,
    },
    /// Run a keyword query against an index artifact
    Query {
        /// Index artifact path
        #[arg(long)]
        index: PathBuf,
        /// Corpus directory (for the exact-phrase signal)
        #[arg(long)]
        corpus: PathBuf,
        /// Maximum results to print
        #[arg(long, default_value_t = 5)]
        top: usize,
        /// Query words
        words: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            files,
            output,
            engine,
            partitions,
            external_cmd,
        } => build(input, files, output, &engine, partitions, external_cmd),
        Commands::Query {
            index,
            corpus,
            top,
            words,
        } => query(index, corpus, top, &words.join(" ")),
    }
}

/// Resolve the document selection: either every document under a corpus
/// directory, or the explicit file list. An empty selection is rejected
/// before any processing starts.
fn collect_inputs(input: Option<PathBuf>, files: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let inputs = match input {
        Some(dir) => {
            let corpus = CorpusStore::new(&dir);
            let selections = corpus.list()?;
            corpus.paths_for(&selections)
        }
        None => files,
    };
    ensure!(
        !inputs.is_empty(),
        "no documents selected: pass --input <dir> or --files <f>..."
    );
    Ok(inputs)
}

fn build(
    input: Option<PathBuf>,
    files: Vec<PathBuf>,
    output_dir: PathBuf,
    engine_name: &str,
    partitions: usize,
    external_cmd: Option<PathBuf>,
) -> Result<()> {
    let inputs = collect_inputs(input, files)?;

    fs::create_dir_all(&output_dir)?;
    let engine = engine_for(engine_name, external_cmd)?;
    let name = artifact_name(engine.name(), &inputs, partitions);
    let output = output_dir.join(&name);

    tracing::info!(documents = inputs.len(), engine = engine.name(), "starting build");
    let stats = engine.build(&inputs, &output, partitions)?;
    write_meta(
        &output,
        &MetaFile {
            version: 1,
            created_at: created_at_now(),
            engine: engine.name().to_string(),
            documents: stats.documents,
            empty_documents: stats.empty_documents,
            terms: stats.terms,
        },
    )?;

    match stats.empty_documents {
        Some(empty) => println!("indexed {} documents ({empty} empty)", stats.documents),
        None => println!("indexed {} documents", stats.documents),
    }
    println!("{} distinct terms", stats.terms);
    println!("artifact: {}", output.display());
    Ok(())
}

fn query(index_path: PathBuf, corpus_dir: PathBuf, top: usize, raw: &str) -> Result<()> {
    let index = load_index(&index_path)?;
    let corpus = CorpusStore::new(corpus_dir);
    let query = Query::parse(raw);
    if query.is_empty() {
        println!("no query terms after stop-word removal");
        return Ok(());
    }

    let (scores, exact) = score_documents(&index, &query, &corpus);
    let all_terms = docs_with_all_terms(&index, &query);

    if scores.is_empty() {
        println!("no results");
        return Ok(());
    }
    println!("results:");
    for (doc, score) in rank(&scores).into_iter().take(top) {
        println!("  {score:>6}  {doc}");
    }
    if !exact.is_empty() {
        println!("exact phrase matches: {}", exact.join(", "));
    }
    if !all_terms.is_empty() {
        println!(
            "documents with every term: {}",
            all_terms.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_accepts_an_explicit_file_list() {
        let cli = Cli::try_parse_from([
            "indexer", "build", "--files", "a.txt", "b.txt", "--output", "out",
        ])
        .unwrap();
        let Commands::Build { input, files, .. } = cli.command else {
            panic!("expected build command");
        };
        assert!(input.is_none());
        assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
    }

    #[test]
    fn build_rejects_input_and_files_together() {
        let parsed = Cli::try_parse_from([
            "indexer", "build", "--input", "docs", "--files", "a.txt", "--output", "out",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn collect_inputs_passes_explicit_files_through() {
        let files = vec![PathBuf::from("a.txt"), PathBuf::from("sub/b.txt")];
        assert_eq!(collect_inputs(None, files.clone()).unwrap(), files);
    }

    #[test]
    fn collect_inputs_rejects_an_empty_selection() {
        assert!(collect_inputs(None, Vec::new()).is_err());
    }
}
