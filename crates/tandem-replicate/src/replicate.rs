use chrono::{DateTime, Utc};
use tandem_store::{
    ContentStream, FileMetadata, StorageBackend, StoreResult, Visibility, WriteConfig,
};
use tracing::{debug, warn};

use crate::config::ReplicationConfig;
use crate::replay::prepare_replay;

/// A backend that mirrors every mutation from `source` onto `replica`.
///
/// Each mutation runs on the source first. A source failure is returned
/// immediately and the replica is not touched. After a source success the
/// same operation runs on the replica and its result becomes the result of
/// the call; a replica failure leaves the source change in place and the
/// two stores diverged. Nothing is rolled back or retried.
///
/// Reads go to the source only, with no fallback to the replica.
///
/// The store holds no mutable state of its own, so it is as thread-safe as
/// its two backends. `ReplicatingStore` is itself a [`StorageBackend`] and
/// nests wherever a single backend is expected.
#[derive(Debug)]
pub struct ReplicatingStore<S, R> {
    source: S,
    replica: R,
    config: ReplicationConfig,
}

impl<S: StorageBackend, R: StorageBackend> ReplicatingStore<S, R> {
    pub fn new(source: S, replica: R) -> Self {
        Self::with_config(source, replica, ReplicationConfig::default())
    }

    pub fn with_config(source: S, replica: R, config: ReplicationConfig) -> Self {
        Self {
            source,
            replica,
            config,
        }
    }

    /// The authoritative store: target of every read and first step of
    /// every write.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The mirror. Reading it directly is how callers detect divergence.
    pub fn replica(&self) -> &R {
        &self.replica
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// Give back `(source, replica)`.
    pub fn into_parts(self) -> (S, R) {
        (self.source, self.replica)
    }

    /// Run the replica half of an operation whose source half succeeded.
    fn mirror<T>(
        &self,
        op: &'static str,
        path: &str,
        step: impl FnOnce(&R) -> StoreResult<T>,
    ) -> StoreResult<T> {
        debug!(op, path, "source step succeeded, mirroring to replica");
        step(&self.replica).inspect_err(|e| {
            warn!(op, path, error = %e, "replica step failed, stores have diverged");
        })
    }
}

impl<S: StorageBackend, R: StorageBackend> StorageBackend for ReplicatingStore<S, R> {
    fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> StoreResult<()> {
        self.source.write(path, contents, config)?;
        self.mirror("write", path, |replica| replica.write(path, contents, config))
    }

    fn write_stream(
        &self,
        path: &str,
        stream: &mut ContentStream,
        config: &WriteConfig,
    ) -> StoreResult<()> {
        // The replica must read from the same offset the source did.
        let start = stream.position().unwrap_or_else(|e| {
            debug!(path, error = %e, "stream position unavailable");
            None
        });
        self.source.write_stream(path, stream, config)?;

        let policy = self.config.stream_replay;
        let mut replay = prepare_replay(&self.source, path, stream, start, policy)
            .inspect_err(|e| {
                warn!(path, error = %e, "cannot replay stream for replica, stores have diverged");
            })?;
        self.mirror("write_stream", path, |replica| {
            replica.write_stream(path, replay.stream(), config)
        })
    }

    fn move_file(&self, from: &str, to: &str) -> StoreResult<()> {
        self.source.move_file(from, to)?;
        self.mirror("move_file", from, |replica| replica.move_file(from, to))
    }

    fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
        self.source.copy(from, to)?;
        self.mirror("copy", from, |replica| replica.copy(from, to))
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        self.source.delete(path)?;
        self.mirror("delete", path, |replica| {
            if self.config.check_replica_before_delete && !replica.exists(path)? {
                debug!(path, "replica already lacks path, delete satisfied");
                return Ok(());
            }
            replica.delete(path)
        })
    }

    fn delete_directory(&self, path: &str) -> StoreResult<()> {
        self.source.delete_directory(path)?;
        self.mirror("delete_directory", path, |replica| {
            replica.delete_directory(path)
        })
    }

    fn create_directory(&self, path: &str, config: &WriteConfig) -> StoreResult<()> {
        self.source.create_directory(path, config)?;
        self.mirror("create_directory", path, |replica| {
            replica.create_directory(path, config)
        })
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        self.source.exists(path)
    }

    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        self.source.read(path)
    }

    fn read_stream(&self, path: &str) -> StoreResult<ContentStream> {
        self.source.read_stream(path)
    }

    fn list(&self, directory: &str, recursive: bool) -> StoreResult<Vec<FileMetadata>> {
        self.source.list(directory, recursive)
    }

    fn metadata(&self, path: &str) -> StoreResult<FileMetadata> {
        self.source.metadata(path)
    }

    fn file_size(&self, path: &str) -> StoreResult<u64> {
        self.source.file_size(path)
    }

    fn mime_type(&self, path: &str) -> StoreResult<String> {
        self.source.mime_type(path)
    }

    fn last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>> {
        self.source.last_modified(path)
    }

    fn visibility(&self, path: &str) -> StoreResult<Visibility> {
        self.source.visibility(path)
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> StoreResult<()> {
        self.source.set_visibility(path, visibility)?;
        self.mirror("set_visibility", path, |replica| {
            replica.set_visibility(path, visibility)
        })
    }
}
