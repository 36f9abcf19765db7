//! Decoded PCM buffers.

use crate::format::OutputCaps;
use bytes::Bytes;
use std::time::Duration;

/// A span of decoded PCM tagged with the caps it was produced under.
///
/// The payload is a [`Bytes`] handle, so cloning a buffer never copies
/// sample data.
#[derive(Clone, Debug, PartialEq)]
pub struct PcmBuffer {
    data: Bytes,
    caps: OutputCaps,
    /// Monotonic sequence number within the session.
    pub sequence: u64,
    /// Byte offset of this buffer in the decoded stream.
    pub offset: u64,
    /// Presentation timestamp, from the decoded sample count.
    pub pts: Duration,
    /// Duration of this buffer's content.
    pub duration: Duration,
    /// First buffer after a flush or a caps change.
    pub discont: bool,
}

impl PcmBuffer {
    /// Create a buffer. Timing fields start at zero.
    pub fn new(data: Bytes, caps: OutputCaps) -> Self {
        let duration = Duration::from_nanos(caps.duration_nanos(data.len()));
        Self {
            data,
            caps,
            sequence: 0,
            offset: 0,
            pts: Duration::ZERO,
            duration,
            discont: false,
        }
    }

    /// Set the sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Set the byte offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the presentation timestamp.
    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = pts;
        self
    }

    /// Mark as discontinuous.
    pub fn with_discont(mut self, discont: bool) -> Self {
        self.discont = discont;
        self
    }

    /// The PCM payload.
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The PCM payload as a slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The caps this buffer was produced under.
    #[inline]
    pub fn caps(&self) -> &OutputCaps {
        &self.caps
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of sample frames (one sample per channel) in the payload.
    pub fn sample_frames(&self) -> usize {
        match self.caps.bytes_per_frame() {
            0 => 0,
            n => self.data.len() / n,
        }
    }

    /// Consume the buffer, returning the payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}
