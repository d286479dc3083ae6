use std::path::Path;

/// A knowledge-base source document, immutable once loaded.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    /// Source identifier (the file name).
    pub source: String,
}

/// Read every `.txt` file in `dir` into a `Document`.
///
/// A file that fails to read or decode is logged and skipped; the corpus
/// load itself never fails. An empty corpus is the caller's problem to
/// report.
pub fn load_documents(dir: &Path) -> Vec<Document> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("Could not read docs directory {:?}: {}", dir, err);
            return Vec::new();
        }
    };

    let mut documents = Vec::new();
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    // Stable corpus order regardless of directory iteration order.
    paths.sort();

    for path in paths {
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::read_to_string(&path) {
            Ok(content) => documents.push(Document { content, source }),
            Err(err) => {
                tracing::warn!("Could not load {:?}: {}", path, err);
            }
        }
    }

    documents
}
