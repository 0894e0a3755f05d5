//! Whole-object operations — the primary embedding surface.
//!
//! ```no_run
//! use zobject::config::CodecConfig;
//! use zobject::object;
//!
//! let cfg = CodecConfig::default();
//!
//! // Publish: compress and name in one pass.
//! let (name, _) = object::compress_path_to_path_hashed("file.bin", "staging/obj", &cfg)?;
//! println!("stored as {name}");
//!
//! // Retrieve: decompress and check the name on the way.
//! object::decompress_path_to_path_verified("staging/obj", "file.out", &name, &cfg)?;
//! # Ok::<(), zobject::CodecError>(())
//! ```
//!
//! Every operation owns its session, sink and handles for the duration of
//! the call and releases all of them on every exit path.  Path operations
//! copy the source's permission bits onto the destination after a
//! successful transfer and remove the destination if the transfer failed.
//! A destination that is the source file itself is refused before it is
//! opened for writing.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::codec::{CodecError, CodecSession, Direction};
use crate::config::CodecConfig;
use crate::digest::{ContentHash, DigestAccumulator};
use crate::sink::{FileSink, HashingSink, MemorySink, NullSink, Sink};
use crate::transfer::{transfer, ChunkSource, ReaderSource, SliceSource, TransferStats};

// ── Reader → writer ──────────────────────────────────────────────────────────

pub fn compress_reader_to_writer<R: Read, W: Write>(
    src: R,
    dst: W,
    cfg: &CodecConfig,
) -> Result<TransferStats, CodecError> {
    let mut source = ReaderSource::new(src, cfg.read_chunk_size);
    run(Direction::Compress, &mut source, &mut FileSink::new(dst), cfg)
}

/// Compress and return the name of the bytes written to `dst`.
pub fn compress_reader_to_writer_hashed<R: Read, W: Write>(
    src: R,
    dst: W,
    cfg: &CodecConfig,
) -> Result<(ContentHash, TransferStats), CodecError> {
    let mut source = ReaderSource::new(src, cfg.read_chunk_size);
    let mut sink = HashingSink::new(FileSink::new(dst));
    let stats = run(Direction::Compress, &mut source, &mut sink, cfg)?;
    Ok((sink.into_digest(), stats))
}

pub fn decompress_reader_to_writer<R: Read, W: Write>(
    src: R,
    dst: W,
    cfg: &CodecConfig,
) -> Result<TransferStats, CodecError> {
    let mut source = ReaderSource::new(src, cfg.read_chunk_size);
    run(Direction::Decompress, &mut source, &mut FileSink::new(dst), cfg)
}

// ── Digest only ──────────────────────────────────────────────────────────────

/// Name the object `src` would become, without storing it.
pub fn compress_file_to_digest<R: Read>(src: R, cfg: &CodecConfig) -> Result<ContentHash, CodecError> {
    let mut source = ReaderSource::new(src, cfg.read_chunk_size);
    let mut sink = HashingSink::new(NullSink::new());
    let stats = run(Direction::Compress, &mut source, &mut sink, cfg)?;
    let digest = sink.into_digest();
    debug!(%digest, bytes_in = stats.bytes_in, bytes_out = stats.bytes_out, "digest-only compression finished");
    Ok(digest)
}

pub fn compress_path_to_digest<P: AsRef<Path>>(src: P, cfg: &CodecConfig) -> Result<ContentHash, CodecError> {
    let src = src.as_ref();
    let file = File::open(src).inspect_err(|e| {
        debug!(path = %src.display(), error = %e, "open as compression source failed");
    })?;
    compress_file_to_digest(file, cfg)
}

// ── Path → path ──────────────────────────────────────────────────────────────

pub fn compress_path_to_path<P: AsRef<Path>, Q: AsRef<Path>>(
    src: P,
    dst: Q,
    cfg: &CodecConfig,
) -> Result<TransferStats, CodecError> {
    path_to_path(src.as_ref(), dst.as_ref(), "compression", |s, d| {
        compress_reader_to_writer(s, d, cfg)
    })
}

pub fn compress_path_to_path_hashed<P: AsRef<Path>, Q: AsRef<Path>>(
    src: P,
    dst: Q,
    cfg: &CodecConfig,
) -> Result<(ContentHash, TransferStats), CodecError> {
    path_to_path(src.as_ref(), dst.as_ref(), "compression", |s, d| {
        compress_reader_to_writer_hashed(s, d, cfg)
    })
}

pub fn decompress_path_to_path<P: AsRef<Path>, Q: AsRef<Path>>(
    src: P,
    dst: Q,
    cfg: &CodecConfig,
) -> Result<TransferStats, CodecError> {
    path_to_path(src.as_ref(), dst.as_ref(), "decompression", |s, d| {
        decompress_reader_to_writer(s, d, cfg)
    })
}

/// Decompress a fetched object and check that its compressed bytes carry
/// the expected name.  A mismatch fails the call and removes `dst`.
pub fn decompress_path_to_path_verified<P: AsRef<Path>, Q: AsRef<Path>>(
    src: P,
    dst: Q,
    expected: &ContentHash,
    cfg: &CodecConfig,
) -> Result<TransferStats, CodecError> {
    path_to_path(src.as_ref(), dst.as_ref(), "decompression", |s, d| {
        let mut reader = DigestingReader { inner: s, digest: DigestAccumulator::new() };
        let stats = decompress_reader_to_writer(&mut reader, d, cfg)?;
        let actual = reader.digest.finalize();
        if actual != *expected {
            return Err(CodecError::DigestMismatch { expected: *expected, actual });
        }
        Ok(stats)
    })
}

/// Plain copy that keeps the source's permission bits.
pub fn copy_path_to_path<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<u64, CodecError> {
    path_to_path(src.as_ref(), dst.as_ref(), "copy", |s, d| {
        Ok(io::copy(s, d)?)
    })
}

// ── Memory ───────────────────────────────────────────────────────────────────

/// Compress a resident buffer.  The returned vector is owned by the caller.
pub fn compress_mem_to_mem(input: &[u8], cfg: &CodecConfig) -> Result<Vec<u8>, CodecError> {
    let mut sink = MemorySink::with_capacity(cfg.chunk_size)?;
    run(Direction::Compress, &mut SliceSource::new(input, cfg.chunk_size), &mut sink, cfg)?;
    Ok(sink.into_vec())
}

pub fn decompress_mem_to_mem(input: &[u8], cfg: &CodecConfig) -> Result<Vec<u8>, CodecError> {
    let mut sink = MemorySink::with_capacity(cfg.chunk_size)?;
    run(Direction::Decompress, &mut SliceSource::new(input, cfg.chunk_size), &mut sink, cfg)?;
    Ok(sink.into_vec())
}

pub fn decompress_mem_to_writer<W: Write>(
    input: &[u8],
    dst:   W,
    cfg:   &CodecConfig,
) -> Result<TransferStats, CodecError> {
    let mut source = SliceSource::new(input, cfg.chunk_size);
    run(Direction::Decompress, &mut source, &mut FileSink::new(dst), cfg)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn run<S, K>(
    direction: Direction,
    source:    &mut S,
    sink:      &mut K,
    cfg:       &CodecConfig,
) -> Result<TransferStats, CodecError>
where
    S: ChunkSource + ?Sized,
    K: Sink + ?Sized,
{
    let mut session = CodecSession::new(direction, cfg)?;
    let result = transfer(&mut session, source, sink);
    session.finalize();
    if let Err(e) = &result {
        debug!(%direction, error = %e, "transfer failed");
    }
    result
}

/// Open both ends, run `body`, copy permissions, close both ends.
fn path_to_path<T, F>(src: &Path, dst: &Path, op: &str, body: F) -> Result<T, CodecError>
where
    F: FnOnce(&mut File, &mut File) -> Result<T, CodecError>,
{
    let mut fsrc = File::open(src).inspect_err(|e| {
        debug!(path = %src.display(), error = %e, "open as {op} source failed");
    })?;
    if is_same_file(&fsrc, src, dst)? {
        debug!(src = %src.display(), dst = %dst.display(), "{op} refused: destination is the source");
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} and {} are the same file", src.display(), dst.display()),
        )
        .into());
    }
    let mut fdst = File::create(dst).inspect_err(|e| {
        debug!(path = %dst.display(), error = %e, "open as {op} destination failed");
    })?;
    debug!(src = %src.display(), dst = %dst.display(), "opened for {op}");

    let result = body(&mut fsrc, &mut fdst).and_then(|value| {
        fdst.set_permissions(fsrc.metadata()?.permissions())?;
        Ok(value)
    });
    drop(fdst);
    drop(fsrc);

    if result.is_err() {
        discard_partial(dst);
    }
    debug!(src = %src.display(), ok = result.is_ok(), "{op} finished");
    result
}

/// True if `dst` exists and is the file already open as `src`, whether
/// reached through the same path, a symlink or a hard link.
fn is_same_file(fsrc: &File, src: &Path, dst: &Path) -> io::Result<bool> {
    let dst_meta = match fs::metadata(dst) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let _ = src;
        let src_meta = fsrc.metadata()?;
        Ok(src_meta.dev() == dst_meta.dev() && src_meta.ino() == dst_meta.ino())
    }
    #[cfg(not(unix))]
    {
        let _ = (fsrc, dst_meta);
        Ok(fs::canonicalize(src)? == fs::canonicalize(dst)?)
    }
}

fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "could not remove partial output");
    }
}

/// Folds every byte read through it into a digest.
struct DigestingReader<R: Read> {
    inner:  R,
    digest: DigestAccumulator,
}

impl<R: Read> Read for DigestingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.digest.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> CodecConfig {
        CodecConfig::with_chunk_sizes(64, 100)
    }

    #[test]
    fn mem_roundtrip_small_chunks() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 251) as u8).collect();
        let frame = compress_mem_to_mem(&data, &small()).unwrap();
        assert_eq!(decompress_mem_to_mem(&frame, &small()).unwrap(), data);
    }

    #[test]
    fn decompress_mem_returns_success_on_success() {
        let frame = compress_mem_to_mem(b"", &small()).unwrap();
        let out = decompress_mem_to_mem(&frame, &small());
        assert!(matches!(out, Ok(ref v) if v.is_empty()));
    }

    #[test]
    fn empty_input_is_not_a_frame() {
        let err = decompress_mem_to_mem(&[], &small()).unwrap_err();
        assert!(matches!(err, CodecError::IncompleteStream));
    }

    #[test]
    fn reader_and_memory_paths_decode_each_other() {
        let data = b"published once, fetched many times".repeat(50);
        let mut frame = Vec::new();
        compress_reader_to_writer(&data[..], &mut frame, &small()).unwrap();
        assert_eq!(decompress_mem_to_mem(&frame, &small()).unwrap(), data);

        let mut out = Vec::new();
        decompress_mem_to_writer(&frame, &mut out, &small()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn digest_only_matches_hashed_writer() {
        let data = vec![3u8; 10_000];
        let mut frame = Vec::new();
        let (named, _) = compress_reader_to_writer_hashed(&data[..], &mut frame, &small()).unwrap();
        assert_eq!(named, ContentHash::of(&frame));
        assert_eq!(compress_file_to_digest(&data[..], &small()).unwrap(), named);
    }

    #[test]
    fn digesting_reader_sees_every_byte() {
        let mut reader = DigestingReader { inner: &b"abcdef"[..], digest: DigestAccumulator::new() };
        let mut sink = Vec::new();
        io::copy(&mut reader, &mut sink).unwrap();
        assert_eq!(reader.digest.finalize(), ContentHash::of(b"abcdef"));
    }
}
