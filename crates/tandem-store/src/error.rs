/// Errors from backing-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing exists at the requested path.
    #[error("path not found: {path}")]
    NotFound { path: String },

    /// The destination of a create/copy/move is already occupied.
    #[error("path already exists: {path}")]
    AlreadyExists { path: String },

    /// A file operation was attempted on a directory.
    #[error("not a file: {path}")]
    NotAFile { path: String },

    /// A directory operation was attempted on a file.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// The path is malformed for this backend.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The backend cannot report the requested attribute for this path.
    #[error("{attribute} unavailable for {path}")]
    MetadataUnavailable {
        path: String,
        attribute: &'static str,
    },

    /// I/O error from the underlying storage medium or a content stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration document could not be parsed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The backend is offline or otherwise unable to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
