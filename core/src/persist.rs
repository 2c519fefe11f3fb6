use crate::error::{Result, SearchError};
use crate::index::{DocLengths, DocMap, Postings, SearchIndex, TermFrequencies};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

/// Bumped whenever the layout of any artifact changes. Loads require an exact match.
pub const FORMAT_VERSION: u32 = 1;

const INDEX: &str = "index";
const DOCMAP: &str = "docmap";
const TERM_FREQUENCIES: &str = "term_frequencies";
const DOC_LENGTHS: &str = "doc_lengths";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub created_at: String,
    pub num_docs: usize,
    pub num_terms: usize,
}

/// On-disk wrapper around every binary artifact.
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    format_version: u32,
    kind: String,
    payload: T,
}

/// Leading fields of an [`Envelope`], decoded on their own so a version or
/// kind mismatch is reported before the payload is parsed.
#[derive(Deserialize)]
struct EnvelopeHeader {
    format_version: u32,
    kind: String,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn blob(&self, kind: &str) -> PathBuf { self.root.join(format!("{kind}.bin")) }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    /// Every file a complete saved index consists of.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = [INDEX, DOCMAP, TERM_FREQUENCIES, DOC_LENGTHS]
            .iter()
            .map(|kind| self.blob(kind))
            .collect();
        files.push(self.meta());
        files
    }

    pub fn missing_artifacts(&self) -> Vec<String> {
        self.artifacts()
            .into_iter()
            .filter(|p| !p.is_file())
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Write to a sibling temp file, then rename over the target. The temp file
/// is removed if any step fails.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    if let Err(e) = write_then_rename(&tmp, path, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    drop(f);
    fs::rename(tmp, path)?;
    Ok(())
}

fn save_artifact<T: Serialize>(paths: &IndexPaths, kind: &str, payload: &T) -> Result<()> {
    let envelope = Envelope { format_version: FORMAT_VERSION, kind: kind.to_string(), payload };
    let bytes = bincode::serialize(&envelope)?;
    let path = paths.blob(kind);
    write_atomic(&path, &bytes)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
    Ok(())
}

fn load_artifact<T: DeserializeOwned>(paths: &IndexPaths, kind: &str) -> Result<T> {
    let mut f = File::open(paths.blob(kind))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;

    let header: EnvelopeHeader = bincode::deserialize(&buf)?;
    if header.format_version != FORMAT_VERSION {
        return Err(SearchError::IncompatibleFormat {
            artifact: kind.to_string(),
            found: header.format_version,
            expected: FORMAT_VERSION,
        });
    }
    if header.kind != kind {
        return Err(SearchError::CorruptIndex(format!("{kind}.bin holds a '{}' artifact", header.kind)));
    }
    let envelope: Envelope<T> = bincode::deserialize(&buf)?;
    tracing::debug!(kind = %envelope.kind, version = envelope.format_version, bytes = buf.len(), "read artifact");
    Ok(envelope.payload)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Persist all four index structures. The manifest goes last, so it only
/// exists next to a complete set of blobs.
pub fn save_index(paths: &IndexPaths, index: &SearchIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    if paths.meta().exists() {
        fs::remove_file(paths.meta())?;
    }
    save_artifact(paths, INDEX, &index.postings)?;
    save_artifact(paths, DOCMAP, &index.docmap)?;
    save_artifact(paths, TERM_FREQUENCIES, &index.term_frequencies)?;
    save_artifact(paths, DOC_LENGTHS, &index.doc_lengths)?;
    let meta = MetaFile {
        version: FORMAT_VERSION,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into()),
        num_docs: index.num_docs(),
        num_terms: index.num_terms(),
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "saved index");
    Ok(())
}

/// Load a saved index. Fails without loading anything if any artifact is missing.
pub fn load_index(paths: &IndexPaths) -> Result<SearchIndex> {
    let missing = paths.missing_artifacts();
    if !missing.is_empty() {
        return Err(SearchError::MissingIndexArtifacts { root: paths.root.clone(), missing });
    }
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        return Err(SearchError::IncompatibleFormat {
            artifact: "meta.json".into(),
            found: meta.version,
            expected: FORMAT_VERSION,
        });
    }

    let postings: Postings = load_artifact(paths, INDEX)?;
    let docmap: DocMap = load_artifact(paths, DOCMAP)?;
    let term_frequencies: TermFrequencies = load_artifact(paths, TERM_FREQUENCIES)?;
    let doc_lengths: DocLengths = load_artifact(paths, DOC_LENGTHS)?;
    let index = SearchIndex { postings, docmap, term_frequencies, doc_lengths };

    if index.num_docs() != meta.num_docs || index.num_terms() != meta.num_terms {
        return Err(SearchError::CorruptIndex(format!(
            "manifest lists {} docs / {} terms, artifacts hold {} / {}",
            meta.num_docs,
            meta.num_terms,
            index.num_docs(),
            index.num_terms()
        )));
    }
    index.validate()?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, created_at = %meta.created_at, "loaded index");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Corpus, Document, Tokenizer};

    fn sample() -> SearchIndex {
        let corpus = Corpus::new(vec![
            Document::new(1, "Jaws", "A shark terrorizes a beach town"),
            Document::new(2, "Alien", "The crew meets a hostile creature"),
        ]);
        SearchIndex::build(&Tokenizer::default(), &corpus).unwrap()
    }

    #[test]
    fn artifacts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("cache"));
        let index = sample();
        save_index(&paths, &index).unwrap();
        assert!(paths.missing_artifacts().is_empty());
        assert_eq!(load_index(&paths).unwrap(), index);
        let meta = load_meta(&paths).unwrap();
        assert_eq!(meta.version, FORMAT_VERSION);
        assert_eq!(meta.num_docs, 2);
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory in the way makes the final rename fail
        let target = dir.path().join("index.bin");
        fs::create_dir_all(target.join("occupied")).unwrap();
        assert!(write_atomic(&target, b"payload").is_err());
        assert!(!dir.path().join("index.tmp").exists());
        assert!(target.is_dir());
    }

    #[test]
    fn any_missing_artifact_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &sample()).unwrap();
        fs::remove_file(dir.path().join("doc_lengths.bin")).unwrap();
        match load_index(&paths) {
            Err(SearchError::MissingIndexArtifacts { missing, .. }) => {
                assert_eq!(missing, vec!["doc_lengths.bin".to_string()]);
            }
            other => panic!("expected MissingIndexArtifacts, got {other:?}"),
        }
    }

    #[test]
    fn empty_directory_reports_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        match load_index(&paths) {
            Err(SearchError::MissingIndexArtifacts { missing, .. }) => assert_eq!(missing.len(), 5),
            other => panic!("expected MissingIndexArtifacts, got {other:?}"),
        }
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let index = sample();
        save_index(&paths, &index).unwrap();
        let envelope = Envelope { format_version: FORMAT_VERSION + 1, kind: INDEX.to_string(), payload: &index.postings };
        fs::write(paths.blob(INDEX), bincode::serialize(&envelope).unwrap()).unwrap();
        assert!(matches!(
            load_index(&paths),
            Err(SearchError::IncompatibleFormat { found, .. }) if found == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn swapped_artifacts_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &sample()).unwrap();
        fs::copy(paths.blob(DOC_LENGTHS), paths.blob(DOCMAP)).unwrap();
        assert!(matches!(load_index(&paths), Err(SearchError::CorruptIndex(_))));
    }
}
