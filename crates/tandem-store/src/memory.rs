use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::WriteConfig;
use crate::error::{StoreError, StoreResult};
use crate::stream::ContentStream;
use crate::traits::StorageBackend;
use crate::types::{EntryKind, FileMetadata, Visibility};

#[derive(Clone, Debug)]
enum Node {
    File {
        contents: Vec<u8>,
        mime_type: String,
    },
    Directory,
}

#[derive(Clone, Debug)]
struct Entry {
    node: Node,
    visibility: Visibility,
    last_modified: DateTime<Utc>,
}

impl Entry {
    fn is_dir(&self) -> bool {
        matches!(self.node, Node::Directory)
    }

    fn to_metadata(&self, path: &str) -> FileMetadata {
        match &self.node {
            Node::File {
                contents,
                mime_type,
            } => FileMetadata {
                path: path.to_string(),
                kind: EntryKind::File,
                size: Some(contents.len() as u64),
                mime_type: Some(mime_type.clone()),
                last_modified: Some(self.last_modified),
                visibility: Some(self.visibility),
            },
            Node::Directory => FileMetadata {
                path: path.to_string(),
                kind: EntryKind::Directory,
                size: None,
                mime_type: None,
                last_modified: Some(self.last_modified),
                visibility: Some(self.visibility),
            },
        }
    }
}

/// In-memory, `BTreeMap`-based backend.
///
/// Intended for tests and embedding. Paths are `/`-separated; leading and
/// trailing slashes are ignored and `..` segments are rejected. Writing a
/// file creates its parent directories. Deleting a directory that does not
/// exist succeeds, deleting a file that does not exist is `NotFound`.
///
/// A poisoned lock makes every [`StorageBackend`] operation fail with
/// [`StoreError::Unavailable`]. The inspection helpers (`len`, `is_empty`,
/// `paths`, `clear`, `Debug`) read through the poison instead: every
/// mutation swaps whole entries, so the map is never left half-updated.
pub struct InMemoryBackend {
    entries: RwLock<BTreeMap<String, Entry>>,
    default_visibility: Visibility,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::with_default_visibility(Visibility::Public)
    }

    /// Create an empty backend that applies `visibility` to entries written
    /// without an explicit one.
    pub fn with_default_visibility(visibility: Visibility) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            default_visibility: visibility,
        }
    }

    /// Number of files currently stored (directories excluded).
    pub fn len(&self) -> usize {
        self.snapshot().values().filter(|e| !e.is_dir()).count()
    }

    /// Returns `true` if no files are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every file and directory.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Sorted paths of all stored files.
    pub fn paths(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .filter(|(_, e)| !e.is_dir())
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Read guard for the inspection helpers; ignores poisoning.
    fn snapshot(&self) -> RwLockReadGuard<'_, BTreeMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_entries(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, Entry>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_entries(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, Entry>>> {
        self.entries
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn visibility_for(&self, config: &WriteConfig) -> Visibility {
        config.resolved_visibility().unwrap_or(self.default_visibility)
    }

    fn put_file(&self, path: &str, contents: Vec<u8>, config: &WriteConfig) -> StoreResult<()> {
        let key = normalize_file(path)?;
        let visibility = self.visibility_for(config);
        let mime_type = config
            .resolved_mime_type()
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime_type(&key, &contents).to_string());

        let mut map = self.write_entries()?;
        if map.get(&key).is_some_and(Entry::is_dir) {
            return Err(StoreError::NotAFile { path: key });
        }
        ensure_parents(&mut map, &key, visibility)?;

        debug!(path = %key, bytes = contents.len(), "memory write");
        map.insert(
            key,
            Entry {
                node: Node::File {
                    contents,
                    mime_type,
                },
                visibility,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    /// Shared body of `move_file` and `copy`.
    fn transfer(&self, from: &str, to: &str, keep_source: bool) -> StoreResult<()> {
        let from = normalize_file(from)?;
        let to = normalize_file(to)?;

        let mut map = self.write_entries()?;
        let entry = match map.get(&from) {
            Some(e) if e.is_dir() => return Err(StoreError::NotAFile { path: from }),
            Some(e) => e.clone(),
            None => return Err(StoreError::NotFound { path: from }),
        };
        if from == to {
            return Ok(());
        }
        if map.get(&to).is_some_and(Entry::is_dir) {
            return Err(StoreError::NotAFile { path: to });
        }
        ensure_parents(&mut map, &to, entry.visibility)?;

        let entry = if keep_source {
            Entry {
                last_modified: Utc::now(),
                ..entry
            }
        } else {
            map.remove(&from);
            entry
        };
        debug!(from = %from, to = %to, copy = keep_source, "memory transfer");
        map.insert(to, entry);
        Ok(())
    }

    fn entry(&self, path: &str) -> StoreResult<(String, Entry)> {
        let key = normalize(path)?;
        let map = self.read_entries()?;
        match map.get(&key) {
            Some(e) => Ok((key, e.clone())),
            None => Err(StoreError::NotFound { path: key }),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for InMemoryBackend {
    fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> StoreResult<()> {
        self.put_file(path, contents.to_vec(), config)
    }

    fn write_stream(
        &self,
        path: &str,
        stream: &mut ContentStream,
        config: &WriteConfig,
    ) -> StoreResult<()> {
        let contents = stream.read_to_vec()?;
        self.put_file(path, contents, config)
    }

    fn move_file(&self, from: &str, to: &str) -> StoreResult<()> {
        self.transfer(from, to, false)
    }

    fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
        self.transfer(from, to, true)
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        let key = normalize_file(path)?;
        let mut map = self.write_entries()?;
        match map.get(&key) {
            Some(e) if e.is_dir() => Err(StoreError::NotAFile { path: key }),
            Some(_) => {
                map.remove(&key);
                debug!(path = %key, "memory delete");
                Ok(())
            }
            None => Err(StoreError::NotFound { path: key }),
        }
    }

    fn delete_directory(&self, path: &str) -> StoreResult<()> {
        let key = normalize(path)?;
        let mut map = self.write_entries()?;
        if key.is_empty() {
            map.clear();
            return Ok(());
        }
        match map.get(&key) {
            Some(e) if !e.is_dir() => return Err(StoreError::NotADirectory { path: key }),
            Some(_) => {}
            None => return Ok(()),
        }
        let prefix = format!("{key}/");
        map.retain(|p, _| p != &key && !p.starts_with(&prefix));
        debug!(path = %key, "memory delete directory");
        Ok(())
    }

    fn create_directory(&self, path: &str, config: &WriteConfig) -> StoreResult<()> {
        let key = normalize(path)?;
        if key.is_empty() {
            return Ok(());
        }
        let visibility = self.visibility_for(config);
        let mut map = self.write_entries()?;
        match map.get(&key) {
            Some(e) if e.is_dir() => return Ok(()),
            Some(_) => return Err(StoreError::AlreadyExists { path: key }),
            None => {}
        }
        ensure_parents(&mut map, &key, visibility)?;
        map.insert(
            key,
            Entry {
                node: Node::Directory,
                visibility,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        let key = normalize(path)?;
        if key.is_empty() {
            return Ok(true);
        }
        Ok(self.read_entries()?.contains_key(&key))
    }

    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        let (key, entry) = self.entry(path)?;
        match entry.node {
            Node::File { contents, .. } => Ok(contents),
            Node::Directory => Err(StoreError::NotAFile { path: key }),
        }
    }

    fn read_stream(&self, path: &str) -> StoreResult<ContentStream> {
        Ok(ContentStream::from_bytes(self.read(path)?))
    }

    fn list(&self, directory: &str, recursive: bool) -> StoreResult<Vec<FileMetadata>> {
        let key = normalize(directory)?;
        let map = self.read_entries()?;
        let prefix = if key.is_empty() {
            String::new()
        } else {
            match map.get(&key) {
                Some(e) if e.is_dir() => format!("{key}/"),
                Some(_) => return Err(StoreError::NotADirectory { path: key }),
                None => return Err(StoreError::NotFound { path: key }),
            }
        };

        Ok(map
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .filter(|(p, _)| recursive || !p[prefix.len()..].contains('/'))
            .map(|(p, e)| e.to_metadata(p))
            .collect())
    }

    fn metadata(&self, path: &str) -> StoreResult<FileMetadata> {
        let (key, entry) = self.entry(path)?;
        Ok(entry.to_metadata(&key))
    }

    fn visibility(&self, path: &str) -> StoreResult<Visibility> {
        Ok(self.entry(path)?.1.visibility)
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> StoreResult<()> {
        let key = normalize(path)?;
        let mut map = self.write_entries()?;
        match map.get_mut(&key) {
            Some(e) => {
                e.visibility = visibility;
                Ok(())
            }
            None => Err(StoreError::NotFound { path: key }),
        }
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("file_count", &self.len())
            .field("default_visibility", &self.default_visibility)
            .finish()
    }
}

/// Strip surrounding slashes and reject empty or `..` segments. The root
/// normalizes to `""`.
fn normalize(path: &str) -> StoreResult<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    for segment in trimmed.split('/') {
        let reason = match segment {
            "" => "empty path segment",
            "." | ".." => "relative path segment",
            _ => continue,
        };
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn normalize_file(path: &str) -> StoreResult<String> {
    let key = normalize(path)?;
    if key.is_empty() {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "root is not a file".to_string(),
        });
    }
    Ok(key)
}

/// Create every missing ancestor directory of `key`.
fn ensure_parents(
    map: &mut BTreeMap<String, Entry>,
    key: &str,
    visibility: Visibility,
) -> StoreResult<()> {
    let mut end = 0;
    while let Some(offset) = key[end..].find('/') {
        end += offset;
        let dir = &key[..end];
        match map.get(dir) {
            Some(e) if e.is_dir() => {}
            Some(_) => {
                return Err(StoreError::NotADirectory {
                    path: dir.to_string(),
                })
            }
            None => {
                map.insert(
                    dir.to_string(),
                    Entry {
                        node: Node::Directory,
                        visibility,
                        last_modified: Utc::now(),
                    },
                );
            }
        }
        end += 1;
    }
    Ok(())
}

fn guess_mime_type(path: &str, contents: &[u8]) -> &'static str {
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("csv") => "text/csv",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ if std::str::from_utf8(contents).is_ok() => "text/plain",
        _ => "application/octet-stream",
    }
}
