//! Decode session.

use super::{FlowStatus, OutputSink};
use crate::buffer::PcmBuffer;
use crate::config::DecoderConfig;
use crate::engine::{DecodeStatus, DecodingEngine, EngineCapabilities, EngineError, EngineFormat};
use crate::error::{Error, Result};
use crate::format::{CandidateList, OutputCaps, UpstreamCaps};
use crate::negotiation::FormatNegotiator;
use crate::observability::{
    DecoderMetrics, record_negotiation, span_session, trace_eos, trace_error, trace_frame_pushed,
};
use bytes::Bytes;
use std::time::Duration;

/// Session statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Compressed buffers received.
    pub buffers_in: u64,
    /// Decoded buffers pushed downstream.
    pub frames_out: u64,
    /// Decoded bytes pushed downstream.
    pub bytes_out: u64,
    /// Successful negotiations.
    pub negotiations_ok: u64,
    /// Failed negotiations.
    pub negotiations_failed: u64,
}

/// A running decode session over an exclusively owned engine.
///
/// Created by [`start`](Self::start) and ended by [`stop`](Self::stop), which
/// hands the engine back. The engine's format register is only written by
/// [`set_format`](Self::set_format).
pub struct Mpg123Decoder<E: DecodingEngine> {
    engine: E,
    config: DecoderConfig,
    /// Queried once at start.
    capabilities: EngineCapabilities,
    /// Caps from the last negotiation, applied on the next `NewFormat`.
    pending: Option<OutputCaps>,
    /// Caps last announced to the sink.
    current: Option<OutputCaps>,
    /// Whether the last negotiation succeeded.
    negotiated: bool,
    eos: bool,
    stats: DecoderStats,
    metrics: DecoderMetrics,
    sequence: u64,
    offset: u64,
    /// Timestamp of the first sample counted in `samples_since_base`.
    base_pts: Duration,
    samples_since_base: u64,
    /// Take the next input timestamp as the clock base.
    await_pts: bool,
    discont: bool,
}

impl<E: DecodingEngine> Mpg123Decoder<E> {
    /// Start a session: query capabilities, clear the format set, apply
    /// parameters and open the feed.
    ///
    /// On failure the engine is closed and dropped.
    pub fn start(mut engine: E, config: DecoderConfig) -> Result<Self> {
        let span = span_session(&config.name);
        let _guard = span.enter();

        let capabilities = engine.capabilities();
        if let Err(e) = Self::open(&mut engine, &config) {
            tracing::error!(error = %e, "failed to start decoder");
            engine.close();
            return Err(e.into());
        }

        tracing::info!(
            encodings = capabilities.len(),
            gapless = config.gapless,
            "decoder started"
        );

        let metrics = DecoderMetrics::new(&config.name);
        Ok(Self {
            engine,
            config,
            capabilities,
            pending: None,
            current: None,
            negotiated: false,
            eos: false,
            stats: DecoderStats::default(),
            metrics,
            sequence: 0,
            offset: 0,
            base_pts: Duration::ZERO,
            samples_since_base: 0,
            await_pts: true,
            discont: true,
        })
    }

    fn open(engine: &mut E, config: &DecoderConfig) -> std::result::Result<(), EngineError> {
        engine.reset_format();
        engine.apply_params(&config.engine_params())?;
        engine.open_feed()
    }

    /// End the session, closing and returning the engine.
    pub fn stop(mut self) -> E {
        let _guard = span_session(&self.config.name).entered();
        self.engine.close();
        tracing::info!(
            buffers_in = self.stats.buffers_in,
            frames_out = self.stats.frames_out,
            "decoder stopped"
        );
        self.engine
    }

    /// Negotiate the output format for a new upstream description.
    ///
    /// The chosen caps are held back and announced to the sink when the
    /// engine reports the frame that carries the new format. On failure
    /// decoding is suspended until a later negotiation succeeds.
    pub fn set_format(
        &mut self,
        upstream: &UpstreamCaps,
        candidates: &CandidateList,
    ) -> Result<OutputCaps> {
        let _guard = span_session(&self.config.name).entered();
        let negotiator = FormatNegotiator::new(&self.capabilities);

        match negotiator.negotiate(upstream, candidates, &mut self.engine) {
            Ok(negotiated) => {
                self.stats.negotiations_ok += 1;
                record_negotiation(&self.config.name, true);
                self.negotiated = true;
                self.pending = Some(negotiated.caps.clone());
                Ok(negotiated.caps)
            }
            Err(e) => {
                self.stats.negotiations_failed += 1;
                record_negotiation(&self.config.name, false);
                self.negotiated = false;
                self.pending = None;
                Err(e.into())
            }
        }
    }

    /// Decode one compressed buffer.
    pub fn handle_frame<S: OutputSink>(&mut self, data: &[u8], sink: &mut S) -> Result<FlowStatus> {
        self.handle_frame_with_pts(data, None, sink)
    }

    /// Decode one compressed buffer carrying an upstream timestamp.
    ///
    /// Only the first timestamp after start or flush is used; later output
    /// timestamps follow from the decoded sample count.
    pub fn handle_frame_with_pts<S: OutputSink>(
        &mut self,
        data: &[u8],
        pts: Option<Duration>,
        sink: &mut S,
    ) -> Result<FlowStatus> {
        if !self.negotiated {
            return Err(Error::NotNegotiated);
        }
        if self.eos {
            return Ok(FlowStatus::Eos);
        }

        if let (true, Some(pts)) = (self.await_pts, pts) {
            self.base_pts = pts;
            self.samples_since_base = 0;
            self.await_pts = false;
        }

        self.stats.buffers_in += 1;
        self.metrics.record_in();
        let metrics = self.metrics.clone();
        let _timer = metrics.start_timer();

        self.engine.feed(data)?;

        loop {
            match self.engine.decode_frame() {
                Ok(DecodeStatus::NewFormat(format)) => self.apply_format(format, sink)?,
                Ok(DecodeStatus::Frame(pcm)) => self.push_frame(pcm, sink)?,
                Ok(DecodeStatus::NeedMore) => return Ok(FlowStatus::Ok),
                Ok(DecodeStatus::Done) => {
                    self.eos = true;
                    trace_eos(&self.config.name);
                    return Ok(FlowStatus::Eos);
                }
                Err(e) => {
                    trace_error(&self.config.name, &e);
                    return Err(Error::Decode(e));
                }
            }
        }
    }

    /// Discard buffered input and held-back caps.
    ///
    /// The engine keeps its committed format.
    pub fn flush(&mut self) -> Result<()> {
        self.engine.open_feed()?;
        self.pending = None;
        self.eos = false;
        self.discont = true;
        self.await_pts = true;
        self.base_pts = self.position();
        self.samples_since_base = 0;
        tracing::debug!(element = %self.config.name, "decoder flushed");
        Ok(())
    }

    fn apply_format<S: OutputSink>(&mut self, format: EngineFormat, sink: &mut S) -> Result<()> {
        let caps = self
            .pending
            .take()
            .unwrap_or_else(|| OutputCaps::for_encoding(format.stream_format(), format.encoding));

        if self.current.as_ref() == Some(&caps) {
            return Ok(());
        }

        tracing::debug!(element = %self.config.name, %caps, "applying output caps");
        sink.set_caps(&caps)?;
        self.base_pts = self.position();
        self.samples_since_base = 0;
        self.current = Some(caps);
        self.discont = true;
        Ok(())
    }

    fn push_frame<S: OutputSink>(&mut self, pcm: Bytes, sink: &mut S) -> Result<()> {
        if pcm.is_empty() {
            return Ok(());
        }
        let caps = self.current.clone().ok_or(Error::NotNegotiated)?;
        let len = pcm.len();

        let buffer = PcmBuffer::new(pcm, caps)
            .with_sequence(self.sequence)
            .with_offset(self.offset)
            .with_pts(self.position())
            .with_discont(std::mem::take(&mut self.discont));

        self.samples_since_base += buffer.sample_frames() as u64;
        self.sequence += 1;
        self.offset += len as u64;
        self.stats.frames_out += 1;
        self.stats.bytes_out += len as u64;
        self.metrics.record_out(len);
        trace_frame_pushed(&self.config.name, len, buffer.sequence);

        sink.push(buffer)
    }

    /// Running output position.
    fn position(&self) -> Duration {
        let rate = self.current.as_ref().map_or(0, |c| c.sample_rate as u64);
        if rate == 0 {
            return self.base_pts;
        }
        let nanos = self.samples_since_base as u128 * 1_000_000_000 / rate as u128;
        self.base_pts + Duration::from_nanos(nanos as u64)
    }

    /// The session configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Capabilities queried at start.
    pub fn capabilities(&self) -> &EngineCapabilities {
        &self.capabilities
    }

    /// Session statistics.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Caps last announced to the sink.
    pub fn current_caps(&self) -> Option<&OutputCaps> {
        self.current.as_ref()
    }

    /// Negotiated caps not yet announced.
    pub fn pending_caps(&self) -> Option<&OutputCaps> {
        self.pending.as_ref()
    }

    /// Whether the last negotiation succeeded.
    pub fn is_negotiated(&self) -> bool {
        self.negotiated
    }

    /// Whether the engine reported the end of the stream.
    pub fn is_eos(&self) -> bool {
        self.eos
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the engine.
    ///
    /// Format changes made through this handle are not seen by the session.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E: DecodingEngine> std::fmt::Debug for Mpg123Decoder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mpg123Decoder")
            .field("name", &self.config.name)
            .field("negotiated", &self.negotiated)
            .field("current", &self.current)
            .field("pending", &self.pending)
            .field("eos", &self.eos)
            .field("stats", &self.stats)
            .finish()
    }
}
