use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::WriteConfig;
use crate::error::{StoreError, StoreResult};
use crate::stream::ContentStream;
use crate::types::{FileMetadata, Visibility};

/// Path-keyed, filesystem-like byte store.
///
/// Paths are opaque strings; what counts as a directory separator, and
/// whether two paths are equal, is up to the backend.
///
/// All implementations must satisfy these invariants:
/// - Implementations are `Send + Sync`; concurrent callers are allowed.
/// - Every failure is returned as an `Err`, never swallowed.
/// - `write_stream` consumes the stream from its current position and
///   leaves it wherever reading stopped. Callers that need the content
///   again must rewind or reopen it.
pub trait StorageBackend: Send + Sync {
    /// Create or overwrite the file at `path`.
    fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> StoreResult<()>;

    /// Create or overwrite the file at `path` from a stream.
    fn write_stream(
        &self,
        path: &str,
        stream: &mut ContentStream,
        config: &WriteConfig,
    ) -> StoreResult<()>;

    /// Rename `from` to `to`, replacing any file already at `to`.
    fn move_file(&self, from: &str, to: &str) -> StoreResult<()>;

    /// Copy `from` to `to`, replacing any file already at `to`.
    fn copy(&self, from: &str, to: &str) -> StoreResult<()>;

    /// Delete the file at `path`.
    ///
    /// Returns `Err(StoreError::NotFound)` if nothing is there.
    fn delete(&self, path: &str) -> StoreResult<()>;

    /// Delete a directory and everything beneath it.
    fn delete_directory(&self, path: &str) -> StoreResult<()>;

    /// Create a directory (and any missing parents).
    fn create_directory(&self, path: &str, config: &WriteConfig) -> StoreResult<()>;

    /// Check whether a file or directory exists at `path`.
    fn exists(&self, path: &str) -> StoreResult<bool>;

    /// Read the whole file at `path`.
    fn read(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Open the file at `path` for streaming reads.
    fn read_stream(&self, path: &str) -> StoreResult<ContentStream>;

    /// List entries under `directory`; `""` is the root.
    fn list(&self, directory: &str, recursive: bool) -> StoreResult<Vec<FileMetadata>>;

    /// Everything the backend knows about `path`.
    fn metadata(&self, path: &str) -> StoreResult<FileMetadata>;

    fn file_size(&self, path: &str) -> StoreResult<u64> {
        self.metadata(path)?
            .size
            .ok_or_else(|| unavailable(path, "file size"))
    }

    fn mime_type(&self, path: &str) -> StoreResult<String> {
        self.metadata(path)?
            .mime_type
            .ok_or_else(|| unavailable(path, "mime type"))
    }

    fn last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>> {
        self.metadata(path)?
            .last_modified
            .ok_or_else(|| unavailable(path, "last modified time"))
    }

    fn visibility(&self, path: &str) -> StoreResult<Visibility>;

    fn set_visibility(&self, path: &str, visibility: Visibility) -> StoreResult<()>;
}

fn unavailable(path: &str, attribute: &'static str) -> StoreError {
    StoreError::MetadataUnavailable {
        path: path.to_string(),
        attribute,
    }
}

// Shared and boxed handles are backends too, so callers can inject
// `Arc<dyn StorageBackend>` or `Box<dyn StorageBackend>`.
macro_rules! forward_backend {
    ($ptr:ident) => {
        impl<T: StorageBackend + ?Sized> StorageBackend for $ptr<T> {
            fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> StoreResult<()> {
                (**self).write(path, contents, config)
            }

            fn write_stream(
                &self,
                path: &str,
                stream: &mut ContentStream,
                config: &WriteConfig,
            ) -> StoreResult<()> {
                (**self).write_stream(path, stream, config)
            }

            fn move_file(&self, from: &str, to: &str) -> StoreResult<()> {
                (**self).move_file(from, to)
            }

            fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
                (**self).copy(from, to)
            }

            fn delete(&self, path: &str) -> StoreResult<()> {
                (**self).delete(path)
            }

            fn delete_directory(&self, path: &str) -> StoreResult<()> {
                (**self).delete_directory(path)
            }

            fn create_directory(&self, path: &str, config: &WriteConfig) -> StoreResult<()> {
                (**self).create_directory(path, config)
            }

            fn exists(&self, path: &str) -> StoreResult<bool> {
                (**self).exists(path)
            }

            fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
                (**self).read(path)
            }

            fn read_stream(&self, path: &str) -> StoreResult<ContentStream> {
                (**self).read_stream(path)
            }

            fn list(&self, directory: &str, recursive: bool) -> StoreResult<Vec<FileMetadata>> {
                (**self).list(directory, recursive)
            }

            fn metadata(&self, path: &str) -> StoreResult<FileMetadata> {
                (**self).metadata(path)
            }

            fn file_size(&self, path: &str) -> StoreResult<u64> {
                (**self).file_size(path)
            }

            fn mime_type(&self, path: &str) -> StoreResult<String> {
                (**self).mime_type(path)
            }

            fn last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>> {
                (**self).last_modified(path)
            }

            fn visibility(&self, path: &str) -> StoreResult<Visibility> {
                (**self).visibility(path)
            }

            fn set_visibility(&self, path: &str, visibility: Visibility) -> StoreResult<()> {
                (**self).set_visibility(path, visibility)
            }
        }
    };
}

forward_backend!(Arc);
forward_backend!(Box);
