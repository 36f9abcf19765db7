//! Decoding engine interface.
//!
//! The engine is the component that turns compressed MPEG audio into PCM. The
//! decoder element only talks to it through two traits:
//!
//! - [`FormatControl`] - the output-format register the negotiator writes
//! - [`DecodingEngine`] - feed-mode decoding on top of that
//!
//! [`EngineCapabilities`] is the set of encodings an engine build can emit.
//! It is queried once when a session starts; nothing downstream of that
//! assumes a particular encoding is present.

pub mod header;
#[cfg(feature = "audio-mp3")]
mod symphonia;

#[cfg(feature = "audio-mp3")]
pub use symphonia::SymphoniaEngine;

use crate::format::{SampleEncoding, StreamFormat};
use bytes::Bytes;
use smallvec::SmallVec;
use thiserror::Error;

/// Errors reported by a decoding engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The (rate, channels, encoding) triple cannot be produced.
    #[error("unsupported output format: {encoding} at {rate} Hz, {channels} channel(s)")]
    UnsupportedFormat {
        /// Requested sample rate.
        rate: u32,
        /// Requested channel count.
        channels: u16,
        /// Requested encoding.
        encoding: SampleEncoding,
    },

    /// Decoding was attempted with an empty format set.
    #[error("no output format configured")]
    NoFormat,

    /// A frame does not match the configured output format.
    #[error("stream is {rate} Hz, {channels} channel(s) but output is configured differently")]
    FormatMismatch {
        /// Sample rate found in the stream.
        rate: u32,
        /// Channel count found in the stream.
        channels: u16,
    },

    /// The feed is not open.
    #[error("feed is not open")]
    FeedClosed,

    /// No frame header was found within the resync limit.
    #[error("lost sync: skipped {0} bytes without finding a frame header")]
    LostSync(usize),

    /// The compressed data could not be decoded.
    #[error("bad data: {0}")]
    BadData(String),

    /// Engine-specific failure.
    #[error("engine failure: {0}")]
    Internal(String),
}

/// Output format committed to an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EngineFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Sample encoding.
    pub encoding: SampleEncoding,
}

impl EngineFormat {
    /// Create an engine format.
    pub const fn new(sample_rate: u32, channels: u16, encoding: SampleEncoding) -> Self {
        Self {
            sample_rate,
            channels,
            encoding,
        }
    }

    /// Rate and channels of this format.
    pub const fn stream_format(&self) -> StreamFormat {
        StreamFormat::new(self.sample_rate, self.channels)
    }
}

/// Set of encodings an engine build can produce.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineCapabilities {
    encodings: SmallVec<[SampleEncoding; 8]>,
}

impl EngineCapabilities {
    /// No encodings at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every encoding in [`SampleEncoding::ALL`].
    pub fn all() -> Self {
        SampleEncoding::ALL.into_iter().collect()
    }

    /// Add an encoding.
    pub fn with(mut self, encoding: SampleEncoding) -> Self {
        if !self.encodings.contains(&encoding) {
            self.encodings.push(encoding);
        }
        self
    }

    /// Membership test.
    #[inline]
    pub fn contains(&self, encoding: SampleEncoding) -> bool {
        self.encodings.contains(&encoding)
    }

    /// Iterate supported encodings.
    pub fn iter(&self) -> impl Iterator<Item = SampleEncoding> + '_ {
        self.encodings.iter().copied()
    }

    /// Number of supported encodings.
    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    /// Whether no encoding is supported.
    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }
}

impl FromIterator<SampleEncoding> for EngineCapabilities {
    fn from_iter<I: IntoIterator<Item = SampleEncoding>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

/// Decoding parameters applied when a session starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineParams {
    /// Skip the encoder info frame and trim encoder/decoder delay.
    pub gapless: bool,
    /// Look ahead at the following header before trusting a sync word.
    pub seek_buffer: bool,
    /// Maximum bytes to skip while searching for sync. `None` = unlimited.
    pub resync_limit: Option<usize>,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            gapless: true,
            seek_buffer: true,
            resync_limit: None,
        }
    }
}

/// Result of one [`DecodingEngine::decode_frame`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeStatus {
    /// The first frame after opening the feed was found, or the committed
    /// format changed since it was last reported. The next call yields the
    /// frame that triggered it.
    NewFormat(EngineFormat),
    /// One decoded frame in the committed encoding.
    Frame(Bytes),
    /// No complete frame is buffered.
    NeedMore,
    /// The stream ended.
    Done,
}

/// Output-format register of an engine.
///
/// The negotiator is the only writer during a negotiation pass.
pub trait FormatControl {
    /// Encodings this engine build can produce.
    fn capabilities(&self) -> EngineCapabilities;

    /// Check whether a single encoding is available.
    fn supports(&self, encoding: SampleEncoding) -> bool {
        self.capabilities().contains(encoding)
    }

    /// Commit an output format, replacing any previous one.
    ///
    /// Fails if this (rate, channels, encoding) triple is jointly
    /// unsupported, in which case nothing is committed.
    fn configure(
        &mut self,
        rate: u32,
        channels: u16,
        encoding: SampleEncoding,
    ) -> Result<(), EngineError>;

    /// Clear the format set.
    fn reset_format(&mut self);

    /// The currently committed format, if any.
    fn committed_format(&self) -> Option<EngineFormat>;
}

/// Feed-mode MPEG audio decoder.
pub trait DecodingEngine: FormatControl + Send {
    /// Apply decoding parameters. Called before the feed is opened.
    fn apply_params(&mut self, params: &EngineParams) -> Result<(), EngineError>;

    /// Open (or reopen) the feed. Discards buffered input; keeps the format.
    fn open_feed(&mut self) -> Result<(), EngineError>;

    /// Close the feed.
    fn close(&mut self);

    /// Append compressed bytes to the feed.
    fn feed(&mut self, data: &[u8]) -> Result<(), EngineError>;

    /// Decode at most one frame from the buffered input.
    fn decode_frame(&mut self) -> Result<DecodeStatus, EngineError>;
}
