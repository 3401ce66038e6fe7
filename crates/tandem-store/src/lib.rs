//! Backing-store abstraction for Tandem.
//!
//! Tandem mirrors filesystem-like operations across stores. This crate
//! defines what a store is: the [`StorageBackend`] capability trait, the
//! values that flow through it, and an in-memory implementation.
//!
//! # Types
//!
//! - [`StorageBackend`] -- write, stream, move, copy, delete, directory,
//!   listing, metadata and visibility operations over `&str` paths
//! - [`ContentStream`] -- a readable handle that knows whether it can rewind
//! - [`WriteConfig`] -- per-call options with a fallback chain
//! - [`FileMetadata`], [`EntryKind`], [`Visibility`]
//!
//! # Backends
//!
//! - [`InMemoryBackend`] -- `BTreeMap`-based store for tests and embedding
//!
//! Concrete media (disk, object storage) live outside this workspace and
//! plug in by implementing [`StorageBackend`]. `Arc<dyn StorageBackend>` and
//! `Box<dyn StorageBackend>` are backends as well.

pub mod config;
pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;
pub mod types;

// Re-export primary types at crate root for ergonomic imports.
pub use config::WriteConfig;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBackend;
pub use stream::{ContentStream, SeekableRead};
pub use traits::StorageBackend;
pub use types::{EntryKind, FileMetadata, Visibility};
