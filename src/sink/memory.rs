//! Resident output buffer for buffer-to-buffer operations.

use tracing::trace;

use super::Sink;
use crate::codec::CodecError;

/// Growable in-memory sink with an explicit doubling policy.
///
/// The logical capacity starts at `initial_capacity` and doubles, repeatedly
/// if necessary, whenever the next chunk would overflow it.  Growth goes
/// through `try_reserve_exact`, so an allocator refusal becomes
/// [`CodecError::Allocation`] instead of an abort, and existing bytes are
/// never truncated or moved out of order.
#[derive(Debug)]
pub struct MemorySink {
    buf:      Vec<u8>,
    capacity: usize,
    growths:  usize,
}

impl MemorySink {
    pub fn with_capacity(initial_capacity: usize) -> Result<Self, CodecError> {
        let capacity = initial_capacity.max(1);
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)?;
        Ok(Self { buf, capacity, growths: 0 })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Logical capacity under the doubling policy.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of doublings performed so far.
    pub fn growth_events(&self) -> usize {
        self.growths
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Hand the buffer to the caller.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    fn grow_for(&mut self, incoming: usize) -> Result<(), CodecError> {
        let needed = self.buf.len().saturating_add(incoming);
        if needed <= self.capacity {
            return Ok(());
        }
        // Saturates at usize::MAX, which the reservation below rejects.
        let mut target = self.capacity;
        let mut doublings = 0;
        while target < needed {
            target = target.saturating_mul(2);
            doublings += 1;
        }
        self.buf.try_reserve_exact(target - self.buf.len())?;
        trace!(from = self.capacity, to = target, "memory sink grew");
        self.capacity = target;
        self.growths += doublings;
        Ok(())
    }
}

impl Sink for MemorySink {
    fn consume(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.grow_for(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.buf.len() as u64
    }
}
