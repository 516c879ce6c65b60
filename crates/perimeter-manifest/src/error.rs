use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("schema mismatch: expected 2.0, got {found}")]
    SchemaMismatch { found: String },

    #[error("manifest is missing its header line")]
    MissingHeader,

    #[error("malformed manifest line: {reason}")]
    MalformedRecord { reason: String },

    #[error("failed to serialize record for {value:?}: {reason}")]
    Serialize { value: String, reason: String },

    #[error("unparseable timestamp: {value:?}")]
    Timestamp { value: String },

    #[error("failed to write manifest at {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
