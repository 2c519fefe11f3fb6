use crate::DocId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// One or more persisted artifacts are absent. Nothing was loaded.
    #[error("index artifacts missing under {}: {}; run `build` before querying", root.display(), missing.join(", "))]
    MissingIndexArtifacts { root: PathBuf, missing: Vec<String> },

    /// A scoring call expected a single term but the argument tokenized into several.
    #[error("expected a single term but '{term}' tokenizes into {tokens} tokens")]
    InvalidTermArgument { term: String, tokens: usize },

    #[error("document id {0} appears more than once in the corpus")]
    DuplicateDocument(DocId),

    #[error("artifact {artifact} has format version {found}, expected {expected}; rebuild the index")]
    IncompatibleFormat { artifact: String, found: u32, expected: u32 },

    #[error("index is inconsistent: {0}")]
    CorruptIndex(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encode(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
