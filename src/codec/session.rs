//! One compression or decompression run over the zstd streaming API.
//!
//! # Lifecycle
//! [`CodecSession::new`] allocates the codec context and the working output
//! chunk; failure yields no session at all.  Input is then pushed chunk by
//! chunk with [`CodecSession::push_chunk`].  The codec context is released by
//! [`CodecSession::finalize`] or, on every other exit path, by `Drop`.
//!
//! # Draining
//! Each push runs the codec against a fixed-size output chunk and hands every
//! filled chunk to the sink, repeating until the codec has consumed all input
//! and left the output chunk not full.  Memory use is therefore bounded by
//! the chunk size plus the codec's own window, whatever the payload size.
//!
//! # Errors
//! Any error reported by the library is terminal: codec state after an error
//! is undefined, so the session flips to [`Phase::Failed`] and refuses all
//! further input.  Sink errors are propagated unchanged but are terminal too.

use std::fmt;

use tracing::trace;
use zstd::stream::raw::{CParameter, Decoder, Encoder, InBuffer, Operation, OutBuffer};

use super::{CodecError, Direction, Phase, StreamOutcome};
use crate::config::CodecConfig;
use crate::sink::Sink;

enum Engine {
    Compress(Encoder<'static>),
    Decompress(Decoder<'static>),
}

pub struct CodecSession {
    direction: Direction,
    phase:     Phase,
    engine:    Option<Engine>,
    scratch:   Vec<u8>,
    pushes:    u64,
}

impl CodecSession {
    pub fn new(direction: Direction, config: &CodecConfig) -> Result<Self, CodecError> {
        config.validate()?;

        let engine = match direction {
            Direction::Compress => {
                let mut enc = Encoder::new(config.level).map_err(setup_error)?;
                enc.set_parameter(CParameter::ChecksumFlag(config.checksum))
                    .map_err(setup_error)?;
                Engine::Compress(enc)
            }
            Direction::Decompress => Engine::Decompress(Decoder::new().map_err(setup_error)?),
        };

        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(config.chunk_size)
            .map_err(|e| CodecError::Setup(e.to_string()))?;
        scratch.resize(config.chunk_size, 0);

        trace!(%direction, level = config.level, chunk = config.chunk_size, "codec session opened");
        Ok(Self { direction, phase: Phase::Active, engine: Some(engine), scratch, pushes: 0 })
    }

    pub fn compressor(config: &CodecConfig) -> Result<Self, CodecError> {
        Self::new(Direction::Compress, config)
    }

    pub fn decompressor(config: &CodecConfig) -> Result<Self, CodecError> {
        Self::new(Direction::Decompress, config)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// True once the codec context has been freed.
    pub fn is_released(&self) -> bool {
        self.engine.is_none()
    }

    /// Number of chunks pushed so far, including empty ones.
    pub fn pushes(&self) -> u64 {
        self.pushes
    }

    /// Feed one chunk of input and drain all output it produces into `sink`.
    ///
    /// `is_last` puts a compressor into finish mode: the frame epilogue is
    /// written and the push returns [`StreamOutcome::End`] or fails.  A
    /// decompressor ignores the flag and reports `End` when it decodes the
    /// end of the frame; bytes following the frame are a stream error.
    pub fn push_chunk<K: Sink + ?Sized>(
        &mut self,
        input:   &[u8],
        is_last: bool,
        sink:    &mut K,
    ) -> Result<StreamOutcome, CodecError> {
        match self.phase {
            Phase::Active => {}
            Phase::Finished if input.is_empty() => return Ok(StreamOutcome::End),
            Phase::Finished => {
                self.phase = Phase::Failed;
                return Err(CodecError::Stream(format!(
                    "{} bytes of trailing data after end of stream",
                    input.len()
                )));
            }
            Phase::Failed => return Err(CodecError::InvalidState { phase: self.phase }),
        }
        let engine = self
            .engine
            .as_mut()
            .ok_or(CodecError::InvalidState { phase: self.phase })?;
        self.pushes += 1;

        let result = match engine {
            Engine::Compress(enc) => compress_chunk(enc, &mut self.scratch, input, is_last, sink),
            Engine::Decompress(dec) => decompress_chunk(dec, &mut self.scratch, input, sink),
        };

        match &result {
            Ok(StreamOutcome::End)      => self.phase = Phase::Finished,
            Ok(StreamOutcome::Continue) => {}
            Err(e) => {
                trace!(direction = %self.direction, error = %e, "codec session failed");
                self.phase = Phase::Failed;
            }
        }
        result
    }

    /// Release the codec context and working chunk.  Safe to call any
    /// number of times; `Drop` calls it as well.
    pub fn finalize(&mut self) {
        if self.engine.take().is_some() {
            self.scratch = Vec::new();
            trace!(direction = %self.direction, phase = ?self.phase, pushes = self.pushes,
                   "codec session released");
        }
    }
}

impl Drop for CodecSession {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl fmt::Debug for CodecSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSession")
            .field("direction", &self.direction)
            .field("phase", &self.phase)
            .field("released", &self.is_released())
            .field("chunk_size", &self.scratch.len())
            .field("pushes", &self.pushes)
            .finish()
    }
}

// ── Drain loops ──────────────────────────────────────────────────────────────

fn compress_chunk<K: Sink + ?Sized>(
    enc:     &mut Encoder<'static>,
    scratch: &mut [u8],
    input:   &[u8],
    is_last: bool,
    sink:    &mut K,
) -> Result<StreamOutcome, CodecError> {
    let mut src = InBuffer::around(input);
    loop {
        let before = src.pos();
        let produced = {
            let mut dst = OutBuffer::around(&mut *scratch);
            enc.run(&mut src, &mut dst).map_err(stream_error)?;
            dst.pos()
        };
        sink.consume(&scratch[..produced])?;
        if src.pos() == input.len() && produced < scratch.len() {
            break;
        }
        if produced == 0 && src.pos() == before {
            return Err(CodecError::Stream("encoder made no progress".into()));
        }
    }
    if !is_last {
        return Ok(StreamOutcome::Continue);
    }

    loop {
        let (remaining, produced) = {
            let mut dst = OutBuffer::around(&mut *scratch);
            let remaining = enc.finish(&mut dst, true).map_err(stream_error)?;
            (remaining, dst.pos())
        };
        sink.consume(&scratch[..produced])?;
        if remaining == 0 {
            return Ok(StreamOutcome::End);
        }
        if produced == 0 {
            return Err(CodecError::Stream("encoder did not complete the frame".into()));
        }
    }
}

fn decompress_chunk<K: Sink + ?Sized>(
    dec:     &mut Decoder<'static>,
    scratch: &mut [u8],
    input:   &[u8],
    sink:    &mut K,
) -> Result<StreamOutcome, CodecError> {
    let mut src = InBuffer::around(input);
    loop {
        let before = src.pos();
        let (hint, produced) = {
            let mut dst = OutBuffer::around(&mut *scratch);
            let hint = dec.run(&mut src, &mut dst).map_err(stream_error)?;
            (hint, dst.pos())
        };
        sink.consume(&scratch[..produced])?;
        // A zero hint means the frame is decoded and fully flushed.
        if hint == 0 {
            let trailing = input.len() - src.pos();
            if trailing > 0 {
                return Err(CodecError::Stream(format!(
                    "{trailing} bytes of trailing data after end of stream"
                )));
            }
            return Ok(StreamOutcome::End);
        }
        if src.pos() == input.len() && produced < scratch.len() {
            return Ok(StreamOutcome::Continue);
        }
        if produced == 0 && src.pos() == before {
            return Err(CodecError::Stream("decoder made no progress".into()));
        }
    }
}

fn setup_error(e: std::io::Error) -> CodecError {
    CodecError::Setup(e.to_string())
}

fn stream_error(e: std::io::Error) -> CodecError {
    CodecError::Stream(e.to_string())
}
