//! Making a consumed stream readable a second time.

use tandem_store::{ContentStream, StorageBackend, StoreResult};
use tracing::debug;

use crate::config::StreamReplay;

/// A stream ready to be written to the replica.
#[derive(Debug)]
pub enum Replay<'a> {
    /// The caller's stream, repositioned where the source write began.
    Rewound(&'a mut ContentStream),
    /// A handle freshly opened on the source. Dropping it releases it.
    Reacquired(ContentStream),
}

impl Replay<'_> {
    /// The stream to hand to the replica write.
    pub fn stream(&mut self) -> &mut ContentStream {
        match self {
            Replay::Rewound(s) => s,
            Replay::Reacquired(s) => s,
        }
    }

    /// Returns `true` when the stream was reopened from the source.
    pub fn is_reacquired(&self) -> bool {
        matches!(self, Replay::Reacquired(_))
    }
}

/// Produce a readable stream for `path` after `stream` has been written to
/// `source`.
///
/// `start` is the offset `stream` was at before the source write, as
/// reported by [`ContentStream::position`]. With
/// [`StreamReplay::RewindOrReacquire`] a stream with a known `start` that
/// seeks back to it cleanly is reused, so the replica reads exactly the
/// bytes the source read. Anything else is reopened from `source`, which
/// now holds the written content. An error from `source.read_stream` is
/// returned as-is.
pub fn prepare_replay<'a, B: StorageBackend + ?Sized>(
    source: &B,
    path: &str,
    stream: &'a mut ContentStream,
    start: Option<u64>,
    policy: StreamReplay,
) -> StoreResult<Replay<'a>> {
    if let (StreamReplay::RewindOrReacquire, Some(offset)) = (policy, start) {
        match stream.seek_to(offset) {
            Ok(true) => {
                debug!(path, offset, "stream rewound for replica");
                return Ok(Replay::Rewound(stream));
            }
            Ok(false) => {}
            Err(e) => debug!(path, offset, error = %e, "stream rewind failed"),
        }
    }

    let fresh = source.read_stream(path)?;
    debug!(path, "stream reacquired from source for replica");
    Ok(Replay::Reacquired(fresh))
}
