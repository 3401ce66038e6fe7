//! Replicating store for Tandem.
//!
//! [`ReplicatingStore`] wraps two [`StorageBackend`](tandem_store::StorageBackend)s,
//! a *source* and a *replica*, and is a backend itself. Mutations run on
//! the source and then, only if that succeeded, on the replica. Reads are
//! served by the source alone.
//!
//! # Partial failure
//!
//! Every mutation is a two-step sequence, not a transaction:
//!
//! 1. Source step fails: the error is returned, the replica is not called.
//! 2. Source step succeeds, replica step fails: the replica's error is
//!    returned and the source change stays. The stores have diverged and
//!    reconciling them is the caller's job (see
//!    [`ReplicatingStore::source`] and [`ReplicatingStore::replica`]).
//!
//! Errors from either backend pass through unchanged.
//!
//! # Streams
//!
//! A stream written to the source is consumed. Before the replica write it
//! is either rewound (when seekable) or reopened from the source; see
//! [`prepare_replay`] and [`StreamReplay`]. If reopening fails the replica
//! is never written.
//!
//! # Deletes
//!
//! A delete is mirrored only if the replica still has the path. A replica
//! that already lacks it counts as consistent, so a prior partial failure
//! does not turn every later delete into an error.

pub mod config;
pub mod replay;
pub mod replicate;

#[cfg(test)]
mod fixtures;

pub use config::{ReplicationConfig, StreamReplay};
pub use replay::{prepare_replay, Replay};
pub use replicate::ReplicatingStore;
