//! Streaming content-addressed compression engine.
//!
//! Objects are compressed once into a single zstd frame and named by the
//! BLAKE3 digest of that frame.  The digest is folded in while the encoder
//! emits output, so publishing an object is one pass over its bytes with
//! memory bounded by the configured chunk sizes.
//!
//! Layers, leaves first: [`codec`] (one session per run), [`digest`],
//! [`sink`], [`transfer`] (the chunk pump) and [`object`] (whole-object
//! operations).

pub mod config;
pub mod codec;
pub mod digest;
pub mod sink;
pub mod transfer;
pub mod object;

pub use config::CodecConfig;
pub use codec::{CodecError, CodecSession, Direction, Phase, StreamOutcome};
pub use digest::{ContentHash, DigestAccumulator};
pub use sink::{FileSink, HashingSink, MemorySink, NullSink, Sink};
pub use transfer::{transfer, ChunkSource, ReaderSource, SliceSource, TransferStats};
