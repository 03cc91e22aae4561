use std::io;
use std::path::PathBuf;

pub type ContentResult<T> = Result<T, AssetError>;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: '{asset}'")]
    FileNotFound { asset: String },

    #[error("asset '{asset}' is ambiguous: {candidates} files match")]
    FileAmbiguous { asset: String, candidates: usize },

    #[error("asset path must be relative: '{0}'")]
    AssetPathNotRelative(String),

    #[error("asset path escapes the content root: '{0}'")]
    AssetPathEscapesRoot(String),

    #[error("invalid asset metadata in {path:?}: {reason}")]
    InvalidMetadata { path: PathBuf, reason: String },

    #[error("metadata file {metadata:?} refers to missing asset '{asset}'")]
    MetadataFileNotFound { metadata: PathBuf, asset: String },

    #[error("cannot select an importer for '{asset}': no file extension")]
    ImporterNeedsExtension { asset: String },

    #[error("no valid importer for '{asset}'")]
    NoValidImporter { asset: String },

    #[error("no valid processor for '{asset}' ({input} -> {output})")]
    NoValidProcessor {
        asset: String,
        input: &'static str,
        output: &'static str,
    },

    #[error("importer output for '{asset}' is not a valid {expected}")]
    ImporterOutputInvalid {
        asset: String,
        expected: &'static str,
    },

    #[error("preprocessed asset {path:?} produces '{actual}', requested '{expected}'")]
    PreprocessedTypeMismatch {
        path: PathBuf,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("preprocessed asset {path:?} names unknown processor '{id}'")]
    UnknownProcessor { path: PathBuf, id: String },

    #[error("invalid preprocessed data in {path:?}: {reason}")]
    InvalidPreprocessedData { path: PathBuf, reason: String },

    #[error("processor '{id}' does not support preprocessing")]
    PreprocessingUnsupported { id: String },

    #[error("asset '{asset}' is cached as '{actual}', requested '{expected}'")]
    TypeMismatch {
        asset: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid content manifest {path:?}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("unknown asset type '{0}'")]
    UnknownAssetType(String),

    #[error("deleted files are not being batched")]
    NotBatchingDeletes,

    #[error("batching of deleted files is guaranteed by a running manifest preprocess")]
    BatchGuaranteed,

    #[error("content manager has been disposed")]
    Disposed,

    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("{0}")]
    Other(String),
}

impl AssetError {
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[inline]
    pub(crate) fn not_found(asset: impl Into<String>) -> Self {
        Self::FileNotFound {
            asset: asset.into(),
        }
    }
}
