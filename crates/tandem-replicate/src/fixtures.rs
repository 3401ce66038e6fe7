//! Instrumented backend for exercising replication paths in tests.

use std::collections::HashSet;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tandem_store::{
    ContentStream, FileMetadata, InMemoryBackend, StorageBackend, StoreError, StoreResult,
    Visibility, WriteConfig,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Write,
    WriteStream,
    MoveFile,
    Copy,
    Delete,
    DeleteDirectory,
    CreateDirectory,
    Exists,
    Read,
    ReadStream,
    List,
    Metadata,
    FileSize,
    MimeType,
    LastModified,
    Visibility,
    SetVisibility,
}

/// Wraps an [`InMemoryBackend`], records every call, fails the operations
/// it is told to fail, and counts stream handles it has handed out that are
/// still alive.
pub struct Recorder {
    inner: InMemoryBackend,
    calls: Mutex<Vec<(Op, String)>>,
    failing: Mutex<HashSet<Op>>,
    transform: Option<fn(&[u8]) -> Vec<u8>>,
    open_streams: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            inner: InMemoryBackend::new(),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            transform: None,
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A recorder that rewrites content on every write, like a backend that
    /// normalizes what it stores.
    pub fn transforming(f: fn(&[u8]) -> Vec<u8>) -> Self {
        Self {
            transform: Some(f),
            ..Self::new()
        }
    }

    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<(Op, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls.lock().unwrap().iter().filter(|(o, _)| *o == op).count()
    }

    pub fn forget_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    fn check(&self, op: Op, path: &str) -> StoreResult<()> {
        self.calls.lock().unwrap().push((op, path.to_string()));
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StoreError::Unavailable(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn shape(&self, contents: Vec<u8>) -> Vec<u8> {
        match self.transform {
            Some(f) => f(&contents),
            None => contents,
        }
    }
}

/// A reader that decrements its recorder's open-stream count when dropped.
struct Tracked {
    data: Cursor<Vec<u8>>,
    open: Arc<AtomicUsize>,
}

impl Read for Tracked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl io::Seek for Tracked {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.data.seek(pos)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StorageBackend for Recorder {
    fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> StoreResult<()> {
        self.check(Op::Write, path)?;
        let contents = self.shape(contents.to_vec());
        self.inner.write(path, &contents, config)
    }

    fn write_stream(
        &self,
        path: &str,
        stream: &mut ContentStream,
        config: &WriteConfig,
    ) -> StoreResult<()> {
        self.check(Op::WriteStream, path)?;
        let contents = self.shape(stream.read_to_vec()?);
        self.inner.write(path, &contents, config)
    }

    fn move_file(&self, from: &str, to: &str) -> StoreResult<()> {
        self.check(Op::MoveFile, from)?;
        self.inner.move_file(from, to)
    }

    fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
        self.check(Op::Copy, from)?;
        self.inner.copy(from, to)
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        self.check(Op::Delete, path)?;
        self.inner.delete(path)
    }

    fn delete_directory(&self, path: &str) -> StoreResult<()> {
        self.check(Op::DeleteDirectory, path)?;
        self.inner.delete_directory(path)
    }

    fn create_directory(&self, path: &str, config: &WriteConfig) -> StoreResult<()> {
        self.check(Op::CreateDirectory, path)?;
        self.inner.create_directory(path, config)
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        self.check(Op::Exists, path)?;
        self.inner.exists(path)
    }

    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        self.check(Op::Read, path)?;
        self.inner.read(path)
    }

    fn read_stream(&self, path: &str) -> StoreResult<ContentStream> {
        self.check(Op::ReadStream, path)?;
        let data = self.inner.read(path)?;
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(ContentStream::seekable(Tracked {
            data: Cursor::new(data),
            open: Arc::clone(&self.open_streams),
        }))
    }

    fn list(&self, directory: &str, recursive: bool) -> StoreResult<Vec<FileMetadata>> {
        self.check(Op::List, directory)?;
        self.inner.list(directory, recursive)
    }

    fn metadata(&self, path: &str) -> StoreResult<FileMetadata> {
        self.check(Op::Metadata, path)?;
        self.inner.metadata(path)
    }

    fn file_size(&self, path: &str) -> StoreResult<u64> {
        self.check(Op::FileSize, path)?;
        self.inner.file_size(path)
    }

    fn mime_type(&self, path: &str) -> StoreResult<String> {
        self.check(Op::MimeType, path)?;
        self.inner.mime_type(path)
    }

    fn last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>> {
        self.check(Op::LastModified, path)?;
        self.inner.last_modified(path)
    }

    fn visibility(&self, path: &str) -> StoreResult<Visibility> {
        self.check(Op::Visibility, path)?;
        self.inner.visibility(path)
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> StoreResult<()> {
        self.check(Op::SetVisibility, path)?;
        self.inner.set_visibility(path, visibility)
    }
}
