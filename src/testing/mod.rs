//! Test doubles for engines and sinks.
//!
//! - [`ScriptedEngine`]: records every engine call and replays scripted decode results
//! - [`CollectingSink`]: keeps every caps change and buffer it receives
//! - [`silent_frame`], [`info_frame`]: synthesized MPEG audio frames

use crate::buffer::PcmBuffer;
use crate::decoder::OutputSink;
use crate::engine::{
    DecodeStatus, DecodingEngine, EngineCapabilities, EngineError, EngineFormat, EngineParams,
    FormatControl,
};
use crate::error::{Error, Result};
use crate::format::{OutputCaps, SampleEncoding};
use std::collections::VecDeque;

/// One recorded engine call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCall {
    /// `configure`, recorded whether or not it succeeded.
    Configure(EngineFormat),
    /// `reset_format`.
    ResetFormat,
    /// `apply_params`.
    ApplyParams(EngineParams),
    /// `open_feed`.
    OpenFeed,
    /// `close`.
    Close,
    /// `feed`, with the number of bytes.
    Feed(usize),
}

/// An engine that decodes nothing and replays a script instead.
///
/// `decode_frame` pops scripted results in order and reports
/// [`DecodeStatus::NeedMore`] once the script is exhausted.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    capabilities: EngineCapabilities,
    rejected: Vec<SampleEncoding>,
    format: Option<EngineFormat>,
    open: bool,
    fed: Vec<u8>,
    script: VecDeque<std::result::Result<DecodeStatus, EngineError>>,
    calls: Vec<EngineCall>,
}

impl ScriptedEngine {
    /// Create an engine with the given capability set.
    pub fn new(capabilities: EngineCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    /// Create an engine supporting exactly `encodings`.
    pub fn supporting(encodings: &[SampleEncoding]) -> Self {
        Self::new(encodings.iter().copied().collect())
    }

    /// Make `configure` fail for `encoding` even though it is advertised.
    pub fn rejecting(mut self, encoding: SampleEncoding) -> Self {
        self.rejected.push(encoding);
        self
    }

    /// Queue a decode result.
    pub fn push_status(&mut self, status: DecodeStatus) {
        self.script.push_back(Ok(status));
    }

    /// Queue a decode error.
    pub fn push_error(&mut self, error: EngineError) {
        self.script.push_back(Err(error));
    }

    /// Queue a `NewFormat` carrying the committed format.
    ///
    /// Falls back to 44.1 kHz stereo S16 when nothing is committed yet.
    pub fn push_new_format(&mut self) {
        let format = self
            .format
            .unwrap_or(EngineFormat::new(44100, 2, SampleEncoding::S16));
        self.push_status(DecodeStatus::NewFormat(format));
    }

    /// Queue a frame of `len` zero bytes.
    pub fn push_frame(&mut self, len: usize) {
        self.push_status(DecodeStatus::Frame(vec![0u8; len].into()));
    }

    /// Every call received so far.
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Forget recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Every `configure` attempt, in order.
    pub fn configured(&self) -> Vec<EngineFormat> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Configure(f) => Some(*f),
                _ => None,
            })
            .collect()
    }

    /// Bytes fed since the feed was last opened.
    pub fn fed(&self) -> &[u8] {
        &self.fed
    }

    /// Whether the feed is open.
    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl FormatControl for ScriptedEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities.clone()
    }

    fn configure(
        &mut self,
        rate: u32,
        channels: u16,
        encoding: SampleEncoding,
    ) -> std::result::Result<(), EngineError> {
        let format = EngineFormat::new(rate, channels, encoding);
        self.calls.push(EngineCall::Configure(format));
        if self.rejected.contains(&encoding) || !self.capabilities.contains(encoding) {
            return Err(EngineError::UnsupportedFormat {
                rate,
                channels,
                encoding,
            });
        }
        self.format = Some(format);
        Ok(())
    }

    fn reset_format(&mut self) {
        self.calls.push(EngineCall::ResetFormat);
        self.format = None;
    }

    fn committed_format(&self) -> Option<EngineFormat> {
        self.format
    }
}

impl DecodingEngine for ScriptedEngine {
    fn apply_params(&mut self, params: &EngineParams) -> std::result::Result<(), EngineError> {
        self.calls.push(EngineCall::ApplyParams(*params));
        Ok(())
    }

    fn open_feed(&mut self) -> std::result::Result<(), EngineError> {
        self.calls.push(EngineCall::OpenFeed);
        self.fed.clear();
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.calls.push(EngineCall::Close);
        self.open = false;
    }

    fn feed(&mut self, data: &[u8]) -> std::result::Result<(), EngineError> {
        if !self.open {
            return Err(EngineError::FeedClosed);
        }
        self.calls.push(EngineCall::Feed(data.len()));
        self.fed.extend_from_slice(data);
        Ok(())
    }

    fn decode_frame(&mut self) -> std::result::Result<DecodeStatus, EngineError> {
        if !self.open {
            return Err(EngineError::FeedClosed);
        }
        self.script.pop_front().unwrap_or(Ok(DecodeStatus::NeedMore))
    }
}

/// A sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Caps in the order they were set.
    pub caps: Vec<OutputCaps>,
    /// Buffers in arrival order.
    pub buffers: Vec<PcmBuffer>,
    refuse_push: bool,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `push` always fails.
    pub fn refusing() -> Self {
        Self {
            refuse_push: true,
            ..Self::default()
        }
    }

    /// Total payload bytes received.
    pub fn total_bytes(&self) -> usize {
        self.buffers.iter().map(PcmBuffer::len).sum()
    }

    /// The most recently set caps.
    pub fn current_caps(&self) -> Option<&OutputCaps> {
        self.caps.last()
    }
}

impl OutputSink for CollectingSink {
    fn set_caps(&mut self, caps: &OutputCaps) -> Result<()> {
        self.caps.push(caps.clone());
        Ok(())
    }

    fn push(&mut self, buffer: PcmBuffer) -> Result<()> {
        if self.refuse_push {
            return Err(Error::Sink("push refused".into()));
        }
        self.buffers.push(buffer);
        Ok(())
    }
}

/// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, stereo.
pub const MPEG1_L3_STEREO_44100: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
/// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, mono.
pub const MPEG1_L3_MONO_44100: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];
/// MPEG-1 Layer III, 128 kbit/s, 32 kHz, stereo.
pub const MPEG1_L3_STEREO_32000: [u8; 4] = [0xFF, 0xFB, 0x98, 0x00];
/// MPEG-2 Layer III, 64 kbit/s, 22.05 kHz, mono.
pub const MPEG2_L3_MONO_22050: [u8; 4] = [0xFF, 0xF3, 0x80, 0xC0];

/// A whole frame of digital silence for `header`.
///
/// Side information and main data are all zero, which every Layer III
/// decoder reads as zero-length granules.
pub fn silent_frame(header: [u8; 4]) -> Vec<u8> {
    let len = crate::engine::header::FrameHeader::parse(&header)
        .map_or(0, |h| h.frame_len())
        .max(header.len());
    let mut frame = vec![0u8; len];
    frame[..4].copy_from_slice(&header);
    frame
}

/// A silent "Info" frame with a LAME extension carrying `encoder_delay`.
pub fn info_frame(header: [u8; 4], encoder_delay: u16) -> Vec<u8> {
    let mut frame = silent_frame(header);
    let Some(parsed) = crate::engine::header::FrameHeader::parse(&header) else {
        return frame;
    };

    let mut pos = 4 + if parsed.crc { 2 } else { 0 } + parsed.side_info_len();
    frame[pos..pos + 4].copy_from_slice(b"Info");
    // no optional Xing fields
    pos += 8;
    frame[pos..pos + 4].copy_from_slice(b"LAME");
    let delay = encoder_delay & 0x0FFF;
    frame[pos + 21] = (delay >> 4) as u8;
    frame[pos + 22] = ((delay & 0x0F) << 4) as u8;
    frame
}
