//! Output sinks: where drained codec output goes.
//!
//! A session hands each drained output chunk to a [`Sink`] exactly once, in
//! emission order.  Digesting is orthogonal to storage and is layered on top
//! of any sink with [`HashingSink`].
//!
//! | Sink | Storage | Failure |
//! |------|---------|---------|
//! | [`FileSink`] | any `Write`, one `write_all` per chunk | `Io` |
//! | [`MemorySink`] | owned buffer, doubling growth | `Allocation` |
//! | [`NullSink`] | discarded | never |

use std::fs::File;
use std::io::Write;

use crate::codec::CodecError;
use crate::digest::{ContentHash, DigestAccumulator};

mod memory;

pub use memory::MemorySink;

// ── Sink trait ───────────────────────────────────────────────────────────────

pub trait Sink {
    /// Accept one drained chunk.  Either every byte is accepted or an error
    /// is returned; there is no partial acceptance.
    fn consume(&mut self, bytes: &[u8]) -> Result<(), CodecError>;

    /// Called once after the stream completed successfully.
    fn finish(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    /// Total bytes accepted so far.
    fn bytes_written(&self) -> u64;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn consume(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        (**self).consume(bytes)
    }

    fn finish(&mut self) -> Result<(), CodecError> {
        (**self).finish()
    }

    fn bytes_written(&self) -> u64 {
        (**self).bytes_written()
    }
}

// ── FileSink ─────────────────────────────────────────────────────────────────

/// Writes every chunk with a single bulk write.  A short write surfaces as
/// `WriteZero` from `write_all` and is fatal like any other write error.
pub struct FileSink<W: Write = File> {
    inner:   W,
    written: u64,
}

impl<W: Write> FileSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Sink for FileSink<W> {
    fn consume(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.written
    }
}

// ── NullSink ─────────────────────────────────────────────────────────────────

/// Discards everything.  Paired with [`HashingSink`] to name an object
/// without storing it.
#[derive(Debug, Default)]
pub struct NullSink {
    discarded: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for NullSink {
    fn consume(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.discarded += bytes.len() as u64;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.discarded
    }
}

// ── HashingSink ──────────────────────────────────────────────────────────────

/// Folds every byte accepted by `inner` into a [`DigestAccumulator`].
///
/// Bytes are hashed only after `inner` accepted them, so the digest covers
/// exactly what was stored.
pub struct HashingSink<S: Sink> {
    inner:  S,
    digest: DigestAccumulator,
}

impl<S: Sink> HashingSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, digest: DigestAccumulator::new() }
    }

    pub fn into_parts(self) -> (S, DigestAccumulator) {
        (self.inner, self.digest)
    }

    /// Drop the inner sink and finalize the digest.
    pub fn into_digest(self) -> ContentHash {
        self.digest.finalize()
    }
}

impl<S: Sink> Sink for HashingSink<S> {
    fn consume(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.inner.consume(bytes)?;
        self.digest.update(bytes);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CodecError> {
        self.inner.finish()
    }

    fn bytes_written(&self) -> u64 {
        self.inner.bytes_written()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Accepts `budget` bytes, then fails every write.
    struct FullDisk {
        budget: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Ok(0);
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn file_sink_counts_and_forwards() {
        let mut sink = FileSink::new(Vec::new());
        sink.consume(b"hello ").unwrap();
        sink.consume(b"").unwrap();
        sink.consume(b"world").unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.bytes_written(), 11);
        assert_eq!(sink.into_inner(), b"hello world");
    }

    #[test]
    fn file_sink_short_write_is_fatal() {
        let mut sink = FileSink::new(FullDisk { budget: 4 });
        let err = sink.consume(b"too many bytes").unwrap_err();
        match err {
            CodecError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::WriteZero),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sink.bytes_written(), 0);
    }

    #[test]
    fn hashing_sink_skips_rejected_bytes() {
        let mut sink = HashingSink::new(FileSink::new(FullDisk { budget: 3 }));
        sink.consume(b"abc").unwrap();
        assert!(sink.consume(b"def").is_err());
        let (_, acc) = sink.into_parts();
        assert_eq!(acc.bytes_fed(), 3);
        assert_eq!(acc.finalize(), ContentHash::of(b"abc"));
    }

    #[test]
    fn null_sink_digest_only() {
        let mut sink = HashingSink::new(NullSink::new());
        sink.consume(b"compressed").unwrap();
        sink.consume(b" bytes").unwrap();
        assert_eq!(sink.bytes_written(), 16);
        assert_eq!(sink.into_digest(), ContentHash::of(b"compressed bytes"));
    }
}
