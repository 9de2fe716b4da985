use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "xml"];

/// A readable filesystem location holding the document corpus.
///
/// Documents are identified by basename everywhere else in the system; the
/// store is what maps an identifier back to an actual path when the scorer
/// needs the raw text for the phrase check.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    root: PathBuf,
}

impl CorpusStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_document(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext))
    }

    /// Relative paths of every `.txt`/`.xml` document under the store root,
    /// sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            bail!("corpus directory does not exist: {}", self.root.display());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file() && Self::is_document(path) {
                if let Ok(rel) = path.strip_prefix(&self.root) {
                    files.push(rel.to_string_lossy().into_owned());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Absolute paths for a set of corpus-relative selections.
    pub fn paths_for(&self, selections: &[String]) -> Vec<PathBuf> {
        selections.iter().map(|s| self.root.join(s)).collect()
    }

    /// Map a document identifier (basename) back to a path. A direct child
    /// of the root wins; otherwise the first sub-directory file with a
    /// matching basename. Ambiguous basenames across sub-directories are a
    /// known corpus-layout limitation.
    pub fn resolve(&self, doc_id: &str) -> Option<PathBuf> {
        let direct = self.root.join(doc_id);
        if direct.is_file() {
            return Some(direct);
        }
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| {
                e.file_type().is_file() && e.file_name().to_string_lossy() == doc_id
            })
            .map(|e| e.into_path())
    }

    /// Raw text of a document by identifier (lossy UTF-8).
    pub fn read(&self, doc_id: &str) -> Result<String> {
        let path = self
            .resolve(doc_id)
            .with_context(|| format!("document not found in corpus: {doc_id}"))?;
        let bytes =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
