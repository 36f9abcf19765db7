//! # parallax-mpg123
//!
//! An MPEG audio decoder element with downstream output format negotiation.
//!
//! The element sits between an MPEG audio parser and a raw audio consumer.
//! It feeds compressed bytes to a decoding engine, negotiates which PCM
//! layout the engine produces against what downstream accepts, and hands
//! decoded spans to the sink tagged with their caps.
//!
//! ## Features
//!
//! - **First-match negotiation**: downstream order decides, the engine's
//!   capability set filters, the rate and channel count are carried through
//! - **Deferred caps**: negotiated caps are announced at the frame that
//!   carries the new format
//! - **Feed mode**: upstream may split compressed data anywhere
//! - **Pure Rust engine**: Layer I/II/III decoding via Symphonia (feature `audio-mp3`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parallax_mpg123::prelude::*;
//!
//! let engine = SymphoniaEngine::new();
//! let mut decoder = Mpg123Decoder::start(engine, DecoderConfig::default())?;
//!
//! let upstream = UpstreamCaps::new().with_rate(44100).with_channels(2);
//! let candidates = CandidateList::from(vec![
//!     CandidateCaps::integer(24, true),
//!     CandidateCaps::integer(16, true),
//! ]);
//! decoder.set_format(&upstream, &candidates)?;
//!
//! for chunk in mp3_bytes.chunks(4096) {
//!     if decoder.handle_frame(chunk, &mut sink)? == FlowStatus::Eos {
//!         break;
//!     }
//! }
//! let engine = decoder.stop();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod format;
pub mod negotiation;
pub mod observability;
pub mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::PcmBuffer;
    pub use crate::config::DecoderConfig;
    pub use crate::decoder::{FlowStatus, Mpg123Decoder, OutputSink};
    #[cfg(feature = "audio-mp3")]
    pub use crate::engine::SymphoniaEngine;
    pub use crate::engine::{
        DecodeStatus, DecodingEngine, EngineCapabilities, EngineFormat, FormatControl,
    };
    pub use crate::error::{Error, Result};
    pub use crate::format::{
        CandidateCaps, CandidateList, CapsValue, OutputCaps, SampleEncoding, StreamFormat,
        UpstreamCaps,
    };
    pub use crate::negotiation::{FormatNegotiator, Negotiated, NegotiationError};
}

pub use error::{Error, Result};
