//! The mpg123 decoder element.
//!
//! [`Mpg123Decoder`] wraps a [`DecodingEngine`] as a decode session:
//!
//! - Negotiates the output format against downstream candidates
//! - Feeds compressed bytes and drains decoded frames
//! - Announces caps to the sink when the engine reports a new format
//! - Tags each decoded span with sequence, offset and timestamps
//!
//! # Example
//!
//! ```rust
//! use parallax_mpg123::config::DecoderConfig;
//! use parallax_mpg123::decoder::{FlowStatus, Mpg123Decoder};
//! use parallax_mpg123::format::{CandidateCaps, CandidateList, SampleEncoding, UpstreamCaps};
//! use parallax_mpg123::testing::{CollectingSink, ScriptedEngine};
//!
//! let engine = ScriptedEngine::supporting(&[SampleEncoding::S16]);
//! let mut decoder = Mpg123Decoder::start(engine, DecoderConfig::default()).unwrap();
//!
//! let upstream = UpstreamCaps::new().with_rate(44100).with_channels(2);
//! let candidates = CandidateList::from(vec![CandidateCaps::integer(16, true)]);
//! decoder.set_format(&upstream, &candidates).unwrap();
//!
//! let mut sink = CollectingSink::new();
//! decoder.engine_mut().push_new_format();
//! decoder.engine_mut().push_frame(4608);
//! assert_eq!(decoder.handle_frame(&[0u8; 417], &mut sink).unwrap(), FlowStatus::Ok);
//! assert_eq!(sink.buffers.len(), 1);
//! ```
//!
//! [`DecodingEngine`]: crate::engine::DecodingEngine

mod session;

pub use session::{DecoderStats, Mpg123Decoder};

use crate::buffer::PcmBuffer;
use crate::error::Result;
use crate::format::OutputCaps;

/// Element factory name.
pub const ELEMENT_NAME: &str = "mpg123";

/// Human readable element name.
pub const LONG_NAME: &str = "mpg123 mp3 decoder";

/// Element classification.
pub const CLASSIFICATION: &str = "Codec/Decoder/Audio";

/// Element description.
pub const DESCRIPTION: &str = "Decodes mp3 streams using the mpg123 decoder";

/// Downstream half of a decode session.
///
/// Receives the output caps, then the decoded buffers produced under them,
/// in arrival order until the next caps change.
pub trait OutputSink {
    /// Fix the output format for subsequent buffers.
    fn set_caps(&mut self, caps: &OutputCaps) -> Result<()>;

    /// Accept one decoded buffer.
    fn push(&mut self, buffer: PcmBuffer) -> Result<()>;
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn set_caps(&mut self, caps: &OutputCaps) -> Result<()> {
        (**self).set_caps(caps)
    }

    fn push(&mut self, buffer: PcmBuffer) -> Result<()> {
        (**self).push(buffer)
    }
}

/// Flow result of handling one compressed buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStatus {
    /// All buffered input was decoded; send more.
    Ok,
    /// The stream ended.
    Eos,
}
