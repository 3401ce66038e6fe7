//! Readable content handles for streamed writes and reads.

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// A reader that can also be repositioned.
pub trait SeekableRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableRead for T {}

enum Inner {
    Seekable(Box<dyn SeekableRead>),
    Sequential(Box<dyn Read + Send>),
}

/// A single-pass byte stream, optionally repositionable.
///
/// Whether the stream can be rewound is fixed at construction: wrap a
/// `Read + Seek` source with [`ContentStream::seekable`] and a forward-only
/// one (pipe, socket, decompressor) with [`ContentStream::sequential`].
/// Dropping the stream releases the underlying handle.
pub struct ContentStream {
    inner: Inner,
}

impl ContentStream {
    pub fn seekable<R: Read + Seek + Send + 'static>(reader: R) -> Self {
        Self {
            inner: Inner::Seekable(Box::new(reader)),
        }
    }

    pub fn sequential<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            inner: Inner::Sequential(Box::new(reader)),
        }
    }

    /// An in-memory, seekable stream over `bytes`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::seekable(Cursor::new(bytes.into()))
    }

    pub fn is_seekable(&self) -> bool {
        matches!(self.inner, Inner::Seekable(_))
    }

    /// Current offset of a seekable stream, `None` for a sequential one.
    pub fn position(&mut self) -> io::Result<Option<u64>> {
        match &mut self.inner {
            Inner::Seekable(r) => r.stream_position().map(Some),
            Inner::Sequential(_) => Ok(None),
        }
    }

    /// Reposition the stream at `offset`.
    ///
    /// Returns `Ok(false)` without touching the stream when it is
    /// sequential.
    pub fn seek_to(&mut self, offset: u64) -> io::Result<bool> {
        match &mut self.inner {
            Inner::Seekable(r) => {
                let pos = r.seek(SeekFrom::Start(offset))?;
                Ok(pos == offset)
            }
            Inner::Sequential(_) => Ok(false),
        }
    }

    /// Reposition the stream at offset zero.
    pub fn rewind(&mut self) -> io::Result<bool> {
        self.seek_to(0)
    }

    /// Drain the remainder of the stream.
    pub fn read_to_vec(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for ContentStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Seekable(r) => r.read(buf),
            Inner::Sequential(r) => r.read(buf),
        }
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream")
            .field("seekable", &self.is_seekable())
            .finish()
    }
}
