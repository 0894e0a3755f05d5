//! Chunked transfer: source → [`CodecSession`] → [`Sink`].
//!
//! [`transfer`] is the single pump used by every whole-object operation,
//! whatever the direction, source kind or sink kind.  Peak memory is one
//! bulk read chunk plus the session's working chunk.
//!
//! A source announces its final chunk itself: a reader source when `read`
//! reports end-of-file, a slice source from absolute offsets.  After the
//! final chunk the session must have seen the end of the frame; if not, a
//! decompression reports [`CodecError::IncompleteStream`] (the caller handed
//! over too few bytes) rather than a stream error.

use std::io::{self, Read};

use tracing::trace;

use crate::codec::{CodecError, CodecSession, Direction};
use crate::sink::Sink;

// ── Sources ──────────────────────────────────────────────────────────────────

/// One chunk of source bytes.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub bytes:   &'a [u8],
    /// No bytes follow this chunk.
    pub is_last: bool,
}

pub trait ChunkSource {
    /// Next chunk.  After a chunk with `is_last` set the source is not
    /// polled again.
    fn next_chunk(&mut self) -> io::Result<Chunk<'_>>;
}

/// Reads a `Read` in bulk chunks, looping over short reads.
pub struct ReaderSource<R: Read> {
    reader: R,
    buf:    Vec<u8>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self { reader, buf: vec![0u8; chunk_size.max(1)] }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ChunkSource for ReaderSource<R> {
    fn next_chunk(&mut self) -> io::Result<Chunk<'_>> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => {
                    return Ok(Chunk { bytes: &self.buf[..filled], is_last: true });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(Chunk { bytes: &self.buf, is_last: false })
    }
}

/// Zero-copy slices over a resident buffer.
#[derive(Debug)]
pub struct SliceSource<'a> {
    data:       &'a [u8],
    pos:        usize,
    chunk_size: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8], chunk_size: usize) -> Self {
        Self { data, pos: 0, chunk_size: chunk_size.max(1) }
    }
}

impl ChunkSource for SliceSource<'_> {
    fn next_chunk(&mut self) -> io::Result<Chunk<'_>> {
        let end = self.data.len().min(self.pos + self.chunk_size);
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(Chunk { bytes, is_last: end == self.data.len() })
    }
}

// ── Driver ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Bytes taken from the source.
    pub bytes_in:  u64,
    /// Bytes accepted by the sink.
    pub bytes_out: u64,
    /// Chunks pushed into the session.
    pub chunks:    u64,
}

/// Pump `source` through `session` into `sink` until the last source chunk
/// has been pushed, then flush the sink.
///
/// The session is left to its owner: on any error it is `Failed` (or
/// unfinished) and is released when dropped.
pub fn transfer<S, K>(
    session: &mut CodecSession,
    source:  &mut S,
    sink:    &mut K,
) -> Result<TransferStats, CodecError>
where
    S: ChunkSource + ?Sized,
    K: Sink + ?Sized,
{
    let mut stats = TransferStats::default();
    loop {
        let chunk = source.next_chunk()?;
        stats.bytes_in += chunk.bytes.len() as u64;
        stats.chunks += 1;
        session.push_chunk(chunk.bytes, chunk.is_last, sink)?;
        if chunk.is_last {
            break;
        }
    }

    if !session.is_finished() {
        return Err(match session.direction() {
            Direction::Decompress => CodecError::IncompleteStream,
            Direction::Compress => {
                CodecError::Stream("encoder did not report end of frame".into())
            }
        });
    }
    sink.finish()?;
    stats.bytes_out = sink.bytes_written();
    trace!(direction = %session.direction(), ?stats, "transfer complete");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::sink::MemorySink;

    /// Hands out at most `step` bytes per read and interrupts every other call.
    struct Trickle<'a> {
        data:        &'a [u8],
        step:        usize,
        interrupted: bool,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupted = !self.interrupted;
            if self.interrupted {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn collect<S: ChunkSource>(mut src: S) -> Vec<(Vec<u8>, bool)> {
        let mut out = Vec::new();
        loop {
            let c = src.next_chunk().unwrap();
            out.push((c.bytes.to_vec(), c.is_last));
            if c.is_last {
                return out;
            }
        }
    }

    #[test]
    fn slice_source_marks_last_by_offset() {
        let chunks = collect(SliceSource::new(b"abcdefgh", 3));
        assert_eq!(
            chunks,
            vec![(b"abc".to_vec(), false), (b"def".to_vec(), false), (b"gh".to_vec(), true)]
        );
        let exact = collect(SliceSource::new(b"abcdef", 3));
        assert_eq!(exact.last().unwrap(), &(b"def".to_vec(), true));
        assert_eq!(collect(SliceSource::new(b"", 3)), vec![(Vec::new(), true)]);
    }

    #[test]
    fn reader_source_fills_across_short_reads() {
        let src = ReaderSource::new(Trickle { data: b"abcdefgh", step: 2, interrupted: false }, 5);
        let chunks = collect(src);
        assert_eq!(chunks, vec![(b"abcde".to_vec(), false), (b"fgh".to_vec(), true)]);
    }

    #[test]
    fn reader_source_exact_multiple_ends_with_empty_chunk() {
        let chunks = collect(ReaderSource::new(&b"abcdef"[..], 3));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], (Vec::new(), true));
    }

    #[test]
    fn truncated_frame_is_incomplete_not_corrupt() {
        let cfg = CodecConfig::with_chunk_sizes(32, 32);
        let frame = zstd::encode_all(&vec![9u8; 5000][..], 3).unwrap();
        let cut = &frame[..frame.len() - 3];

        let mut session = CodecSession::decompressor(&cfg).unwrap();
        let mut sink = MemorySink::with_capacity(32).unwrap();
        let err = transfer(&mut session, &mut SliceSource::new(cut, 32), &mut sink).unwrap_err();
        assert!(matches!(err, CodecError::IncompleteStream));
    }

    #[test]
    fn stats_report_both_sides() {
        let cfg = CodecConfig::with_chunk_sizes(64, 64);
        let data = vec![1u8; 1000];
        let mut session = CodecSession::compressor(&cfg).unwrap();
        let mut sink = MemorySink::with_capacity(64).unwrap();
        let stats = transfer(&mut session, &mut SliceSource::new(&data, 64), &mut sink).unwrap();
        assert_eq!(stats.bytes_in, 1000);
        assert_eq!(stats.chunks, 16);
        assert_eq!(stats.bytes_out, sink.len() as u64);
        assert!(session.is_finished());
    }
}
