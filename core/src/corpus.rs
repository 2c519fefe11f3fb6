use crate::error::Result;
use crate::Document;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Deserialize)]
struct CorpusFile {
    movies: Vec<Document>,
}

/// The documents to index, loaded once and handed to the builder.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Load a corpus file of the form `{"movies": [{"id", "title", "description"}, ...]}`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path.as_ref())?;
        let corpus = Self::from_reader(BufReader::new(f))?;
        tracing::info!(path = %path.as_ref().display(), num_docs = corpus.len(), "loaded corpus");
        Ok(corpus)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let file: CorpusFile = serde_json::from_reader(reader)?;
        Ok(Self { documents: file.movies })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
