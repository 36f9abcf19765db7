//! MPEG audio engine backed by Symphonia (pure Rust).
//!
//! Works in feed mode: compressed bytes are appended with
//! [`DecodingEngine::feed`] and frames are cut out of the buffered input by
//! their headers, so upstream may split data at arbitrary points. Symphonia's
//! decoders take exactly one frame per packet, and its own framing lives in
//! the format reader, which wants a seekable source rather than a feed.

use super::header::{FrameHeader, HEADER_LEN, ID3V1_LEN, Layer, id3v2_len, parse_info_frame};
use super::{
    DecodeStatus, DecodingEngine, EngineCapabilities, EngineError, EngineFormat, EngineParams,
    FormatControl,
};
use crate::format::{MAX_CHANNELS, MPEG_SAMPLE_RATES, SampleEncoding, StreamFormat};
use bytes::Bytes;
use symphonia::core::audio::{AudioBufferRef, Channels, RawSampleBuffer};
use symphonia::core::codecs::{
    CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3, CodecParameters, Decoder, DecoderOptions,
};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;
use symphonia::core::sample::{i24, u24};

/// Layer III synthesis delay in samples, trimmed together with the encoder delay.
const LAYER3_DECODER_DELAY: usize = 529;

/// Interleaved PCM in one of the output encodings.
enum RawPcm {
    S16(RawSampleBuffer<i16>),
    S24(RawSampleBuffer<i24>),
    S32(RawSampleBuffer<i32>),
    U16(RawSampleBuffer<u16>),
    U24(RawSampleBuffer<u24>),
    U32(RawSampleBuffer<u32>),
    F32(RawSampleBuffer<f32>),
}

macro_rules! with_raw_pcm {
    ($pcm:expr, $buf:ident => $body:expr) => {
        match $pcm {
            RawPcm::S16($buf) => $body,
            RawPcm::S24($buf) => $body,
            RawPcm::S32($buf) => $body,
            RawPcm::U16($buf) => $body,
            RawPcm::U24($buf) => $body,
            RawPcm::U32($buf) => $body,
            RawPcm::F32($buf) => $body,
        }
    };
}

impl RawPcm {
    /// Convert a decoded buffer to `encoding` in native byte order.
    fn convert(encoding: SampleEncoding, decoded: AudioBufferRef<'_>) -> Self {
        let capacity = decoded.capacity() as u64;
        let spec = *decoded.spec();
        let mut pcm = match encoding {
            SampleEncoding::S16 => Self::S16(RawSampleBuffer::new(capacity, spec)),
            SampleEncoding::S24 => Self::S24(RawSampleBuffer::new(capacity, spec)),
            SampleEncoding::S32 => Self::S32(RawSampleBuffer::new(capacity, spec)),
            SampleEncoding::U16 => Self::U16(RawSampleBuffer::new(capacity, spec)),
            SampleEncoding::U24 => Self::U24(RawSampleBuffer::new(capacity, spec)),
            SampleEncoding::U32 => Self::U32(RawSampleBuffer::new(capacity, spec)),
            SampleEncoding::F32 => Self::F32(RawSampleBuffer::new(capacity, spec)),
        };
        with_raw_pcm!(&mut pcm, buf => buf.copy_interleaved_ref(decoded));
        pcm
    }

    fn as_bytes(&self) -> &[u8] {
        with_raw_pcm!(self, buf => buf.as_bytes())
    }
}

struct ActiveDecoder {
    layer: Layer,
    stream: StreamFormat,
    inner: Box<dyn Decoder>,
}

impl ActiveDecoder {
    fn new(header: &FrameHeader) -> Result<Self, EngineError> {
        let codec = match header.layer {
            Layer::L1 => CODEC_TYPE_MP1,
            Layer::L2 => CODEC_TYPE_MP2,
            Layer::L3 => CODEC_TYPE_MP3,
        };
        let channels = if header.channels() == 1 {
            Channels::FRONT_LEFT
        } else {
            Channels::FRONT_LEFT | Channels::FRONT_RIGHT
        };

        let mut params = CodecParameters::new();
        params
            .for_codec(codec)
            .with_sample_rate(header.sample_rate)
            .with_channels(channels);

        let inner = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| EngineError::Internal(format!("failed to create decoder: {}", e)))?;

        Ok(Self {
            layer: header.layer,
            stream: header.stream_format(),
            inner,
        })
    }

    fn matches(&self, header: &FrameHeader) -> bool {
        self.layer == header.layer && self.stream == header.stream_format()
    }
}

/// Feed-mode MPEG audio engine using Symphonia's decoders.
///
/// ID3 tags anywhere in the stream are skipped. The feed has no natural end,
/// so this engine never reports [`DecodeStatus::Done`].
///
/// # Example
///
/// ```rust,ignore
/// use parallax_mpg123::engine::{DecodingEngine, FormatControl, SymphoniaEngine};
/// use parallax_mpg123::format::SampleEncoding;
///
/// let mut engine = SymphoniaEngine::new();
/// engine.configure(44100, 2, SampleEncoding::S16)?;
/// engine.open_feed()?;
/// engine.feed(&mp3_bytes)?;
/// while let DecodeStatus::Frame(pcm) | DecodeStatus::NewFormat(_) = engine.decode_frame()? {
///     // ...
/// }
/// ```
pub struct SymphoniaEngine {
    capabilities: EngineCapabilities,
    params: EngineParams,
    format: Option<EngineFormat>,
    open: bool,
    /// Buffered compressed input.
    input: Vec<u8>,
    /// Bytes of an ID3v2 tag still to discard.
    skip: usize,
    /// Garbage bytes skipped since the last good frame.
    resync_skipped: usize,
    /// No frame seen since the feed was opened.
    at_stream_start: bool,
    /// Format last reported through `NewFormat`.
    announced: Option<EngineFormat>,
    /// Frame held back after announcing its format.
    held: Option<(FrameHeader, Vec<u8>)>,
    decoder: Option<ActiveDecoder>,
    /// Sample frames still to drop from the start of the output.
    trim_frames: usize,
    frames_decoded: u64,
}

impl SymphoniaEngine {
    /// Create an engine that can emit every encoding.
    pub fn new() -> Self {
        Self::with_capabilities(EngineCapabilities::all())
    }

    /// Create an engine restricted to a subset of encodings.
    pub fn with_capabilities(capabilities: EngineCapabilities) -> Self {
        Self {
            capabilities,
            params: EngineParams::default(),
            format: None,
            open: false,
            input: Vec::new(),
            skip: 0,
            resync_skipped: 0,
            at_stream_start: true,
            announced: None,
            held: None,
            decoder: None,
            trim_frames: 0,
            frames_decoded: 0,
        }
    }

    /// Number of frames decoded since creation.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Number of compressed bytes waiting to be decoded.
    pub fn buffered(&self) -> usize {
        self.input.len()
    }

    fn discard(&mut self, n: usize) -> Result<(), EngineError> {
        self.input.drain(..n);
        self.resync_skipped += n;
        match self.params.resync_limit {
            Some(limit) if self.resync_skipped > limit => {
                Err(EngineError::LostSync(self.resync_skipped))
            }
            _ => Ok(()),
        }
    }

    /// Skip to the next byte that could start a header.
    fn skip_garbage(&mut self) -> Result<(), EngineError> {
        let n = self.input[1..]
            .iter()
            .position(|b| *b == 0xFF)
            .map_or(self.input.len(), |p| p + 1);
        self.discard(n)
    }

    /// With the seek buffer on, the next header (when buffered) must agree.
    fn confirm_sync(&self, header: &FrameHeader, len: usize) -> bool {
        if !self.params.seek_buffer {
            return true;
        }
        match self.input.get(len..len + HEADER_LEN) {
            Some(next) if next.starts_with(b"TAG") || next.starts_with(b"ID3") => true,
            Some(next) => FrameHeader::parse(next).is_some_and(|n| header.is_compatible(&n)),
            None => true,
        }
    }

    /// Cut the next complete frame out of the input.
    fn next_frame(&mut self) -> Result<Option<(FrameHeader, Vec<u8>)>, EngineError> {
        loop {
            if self.skip > 0 {
                let n = self.skip.min(self.input.len());
                self.input.drain(..n);
                self.skip -= n;
                if self.skip > 0 {
                    return Ok(None);
                }
            }

            if self.input.len() < HEADER_LEN {
                return Ok(None);
            }

            if self.input.starts_with(b"ID3") {
                match id3v2_len(&self.input) {
                    Some(len) => {
                        tracing::debug!(len, "skipping ID3v2 tag");
                        self.skip = len;
                        continue;
                    }
                    None => return Ok(None),
                }
            }

            if self.input.starts_with(b"TAG") {
                if self.input.len() < ID3V1_LEN {
                    return Ok(None);
                }
                self.input.drain(..ID3V1_LEN);
                tracing::debug!("skipping ID3v1 tag");
                // a concatenated stream may follow with its own info frame
                self.at_stream_start = true;
                continue;
            }

            let Some(header) = FrameHeader::parse(&self.input) else {
                self.skip_garbage()?;
                continue;
            };

            let len = header.frame_len();
            if self.input.len() < len {
                return Ok(None);
            }
            if !self.confirm_sync(&header, len) {
                self.skip_garbage()?;
                continue;
            }

            if self.resync_skipped > 0 {
                tracing::debug!(skipped = self.resync_skipped, "resynced");
                self.resync_skipped = 0;
            }
            let frame: Vec<u8> = self.input.drain(..len).collect();
            return Ok(Some((header, frame)));
        }
    }

    fn decode_packet(
        &mut self,
        header: &FrameHeader,
        frame: &[u8],
    ) -> Result<Option<Bytes>, EngineError> {
        let format = self.format.ok_or(EngineError::NoFormat)?;
        let ts = self.frames_decoded * header.samples_per_frame() as u64;
        let packet = Packet::new_from_slice(0, ts, header.samples_per_frame() as u64, frame);

        let active = match self.decoder.take() {
            Some(active) if active.matches(header) => active,
            _ => ActiveDecoder::new(header)?,
        };
        let decoder = &mut self.decoder.insert(active).inner;

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                tracing::warn!(error = msg, "dropping undecodable frame");
                return Ok(None);
            }
            Err(e) => return Err(EngineError::Internal(e.to_string())),
        };

        let channels = decoded.spec().channels.count().max(1);
        let frame_bytes = channels * format.encoding.bytes_per_sample();
        let raw = RawPcm::convert(format.encoding, decoded);
        self.frames_decoded += 1;

        let mut pcm = raw.as_bytes();
        if self.trim_frames > 0 {
            let trim = self.trim_frames.min(pcm.len() / frame_bytes);
            self.trim_frames -= trim;
            pcm = &pcm[trim * frame_bytes..];
        }
        if pcm.is_empty() {
            return Ok(None);
        }
        Ok(Some(Bytes::copy_from_slice(pcm)))
    }
}

impl Default for SymphoniaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatControl for SymphoniaEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities.clone()
    }

    fn configure(
        &mut self,
        rate: u32,
        channels: u16,
        encoding: SampleEncoding,
    ) -> Result<(), EngineError> {
        if !MPEG_SAMPLE_RATES.contains(&rate)
            || !(1..=MAX_CHANNELS).contains(&channels)
            || !self.capabilities.contains(encoding)
        {
            return Err(EngineError::UnsupportedFormat {
                rate,
                channels,
                encoding,
            });
        }
        self.format = Some(EngineFormat::new(rate, channels, encoding));
        Ok(())
    }

    fn reset_format(&mut self) {
        self.format = None;
    }

    fn committed_format(&self) -> Option<EngineFormat> {
        self.format
    }
}

impl DecodingEngine for SymphoniaEngine {
    fn apply_params(&mut self, params: &EngineParams) -> Result<(), EngineError> {
        self.params = *params;
        Ok(())
    }

    fn open_feed(&mut self) -> Result<(), EngineError> {
        self.input.clear();
        self.skip = 0;
        self.resync_skipped = 0;
        self.at_stream_start = true;
        self.announced = None;
        self.held = None;
        self.trim_frames = 0;
        if let Some(active) = self.decoder.as_mut() {
            active.inner.reset();
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.input.clear();
        self.held = None;
        self.decoder = None;
    }

    fn feed(&mut self, data: &[u8]) -> Result<(), EngineError> {
        if !self.open {
            return Err(EngineError::FeedClosed);
        }
        self.input.extend_from_slice(data);
        Ok(())
    }

    fn decode_frame(&mut self) -> Result<DecodeStatus, EngineError> {
        if !self.open {
            return Err(EngineError::FeedClosed);
        }

        loop {
            if let Some((header, frame)) = self.held.take() {
                match self.decode_packet(&header, &frame)? {
                    Some(pcm) => return Ok(DecodeStatus::Frame(pcm)),
                    None => continue,
                }
            }

            let Some((header, frame)) = self.next_frame()? else {
                return Ok(DecodeStatus::NeedMore);
            };

            if self.at_stream_start {
                self.at_stream_start = false;
                if self.params.gapless {
                    if let Some(info) = parse_info_frame(&header, &frame) {
                        if let Some(delay) = info.encoder_delay {
                            self.trim_frames = delay as usize + LAYER3_DECODER_DELAY;
                        }
                        tracing::debug!(trim = self.trim_frames, "consumed encoder info frame");
                        continue;
                    }
                }
            }

            let committed = self.format.ok_or(EngineError::NoFormat)?;
            let stream = header.stream_format();
            if committed.stream_format() != stream {
                return Err(EngineError::FormatMismatch {
                    rate: stream.sample_rate,
                    channels: stream.channels,
                });
            }

            if self.announced != Some(committed) {
                self.announced = Some(committed);
                self.held = Some((header, frame));
                return Ok(DecodeStatus::NewFormat(committed));
            }

            if let Some(pcm) = self.decode_packet(&header, &frame)? {
                return Ok(DecodeStatus::Frame(pcm));
            }
        }
    }
}
