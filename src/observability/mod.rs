//! Observability features: metrics and tracing.
//!
//! - **Metrics**: Counters and histograms via `metrics-rs`
//! - **Tracing**: Structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `mpg123_buffers_received` | Counter | Compressed buffers received |
//! | `mpg123_frames_decoded` | Counter | PCM frames pushed downstream |
//! | `mpg123_bytes_decoded` | Counter | PCM bytes pushed downstream |
//! | `mpg123_negotiations` | Counter | Successful negotiations |
//! | `mpg123_negotiation_failures` | Counter | Failed negotiations |
//! | `mpg123_decode_time_ns` | Histogram | Decode time per compressed buffer |
//!
//! All metrics carry an `element` label.
//!
//! ## Tracing
//!
//! Spans are emitted for each decode session and each negotiation pass.
//!
//! ## Example
//!
//! ```rust,ignore
//! use parallax_mpg123::observability::init_metrics;
//!
//! // Initialize metrics (call once at startup)
//! init_metrics();
//!
//! // Install a metrics exporter (prometheus, statsd, etc.) to collect them
//! ```

mod metrics;
mod tracing_support;

pub use metrics::{DecoderMetrics, TimerGuard, init_metrics, record_negotiation};
pub use tracing_support::{
    instrument_session, span_negotiation, span_session, trace_eos, trace_error,
    trace_frame_pushed,
};
