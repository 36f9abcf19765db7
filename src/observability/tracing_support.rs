//! Tracing integration for structured logging and spans.

use crate::format::StreamFormat;
use tracing::{Level, Span, span};

/// Create a span for a decode session.
///
/// # Example
///
/// ```rust
/// use parallax_mpg123::observability::span_session;
///
/// let span = span_session("mpg123-0");
/// let _guard = span.enter();
/// // Session work here...
/// ```
#[inline]
pub fn span_session(element: &str) -> Span {
    span!(Level::INFO, "session", element = %element)
}

/// Create a span for one negotiation pass.
#[inline]
pub fn span_negotiation(stream: Option<StreamFormat>, candidates: usize) -> Span {
    match stream {
        Some(s) => span!(
            Level::DEBUG,
            "negotiation",
            rate = s.sample_rate,
            channels = s.channels,
            candidates = candidates
        ),
        None => span!(Level::DEBUG, "negotiation", candidates = candidates),
    }
}

/// Enter a session span, returning the guard.
pub fn instrument_session(element: &str) -> tracing::span::EnteredSpan {
    span_session(element).entered()
}

/// Log a decoded frame being pushed.
#[inline]
pub fn trace_frame_pushed(element: &str, size: usize, sequence: u64) {
    tracing::trace!(
        element = %element,
        size = size,
        sequence = sequence,
        "frame pushed"
    );
}

/// Log a decode error.
#[inline]
pub fn trace_error(element: &str, error: &dyn std::error::Error) {
    tracing::error!(
        element = %element,
        error = %error,
        "decoding error"
    );
}

/// Log end-of-stream.
#[inline]
pub fn trace_eos(element: &str) {
    tracing::info!(element = %element, "end of stream");
}
