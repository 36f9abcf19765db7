//! Metrics collection using metrics-rs.

use metrics::{Counter, Histogram, Unit, counter, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const FRAMES_DECODED: &str = "mpg123_frames_decoded";
const BYTES_DECODED: &str = "mpg123_bytes_decoded";
const BUFFERS_RECEIVED: &str = "mpg123_buffers_received";
const NEGOTIATIONS: &str = "mpg123_negotiations";
const NEGOTIATION_FAILURES: &str = "mpg123_negotiation_failures";
const DECODE_TIME_NS: &str = "mpg123_decode_time_ns";

/// Initialize metrics descriptions.
///
/// Call this once at application startup before using any metrics.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        FRAMES_DECODED,
        Unit::Count,
        "Total number of PCM frames pushed downstream"
    );
    metrics::describe_counter!(BYTES_DECODED, Unit::Bytes, "Total PCM bytes pushed downstream");
    metrics::describe_counter!(
        BUFFERS_RECEIVED,
        Unit::Count,
        "Total number of compressed buffers received"
    );
    metrics::describe_counter!(
        NEGOTIATIONS,
        Unit::Count,
        "Successful output format negotiations"
    );
    metrics::describe_counter!(
        NEGOTIATION_FAILURES,
        Unit::Count,
        "Failed output format negotiations"
    );
    metrics::describe_histogram!(
        DECODE_TIME_NS,
        Unit::Nanoseconds,
        "Time to decode one compressed buffer"
    );
}

/// Record the outcome of one negotiation pass.
#[inline]
pub fn record_negotiation(element: &str, success: bool) {
    let name = if success {
        NEGOTIATIONS
    } else {
        NEGOTIATION_FAILURES
    };
    counter!(name, "element" => element.to_string()).increment(1);
}

/// Metrics collector for one decoder instance.
///
/// Handles are created once with the element label attached.
#[derive(Clone)]
pub struct DecoderMetrics {
    element: String,
    buffers_in: Counter,
    frames_out: Counter,
    bytes_out: Counter,
    decode_time: Histogram,
}

impl DecoderMetrics {
    /// Create a collector labelled with `element`.
    pub fn new(element: &str) -> Self {
        Self {
            element: element.to_string(),
            buffers_in: counter!(BUFFERS_RECEIVED, "element" => element.to_string()),
            frames_out: counter!(FRAMES_DECODED, "element" => element.to_string()),
            bytes_out: counter!(BYTES_DECODED, "element" => element.to_string()),
            decode_time: histogram!(DECODE_TIME_NS, "element" => element.to_string()),
        }
    }

    /// Record an incoming compressed buffer.
    #[inline]
    pub fn record_in(&self) {
        self.buffers_in.increment(1);
    }

    /// Record a decoded frame pushed downstream.
    #[inline]
    pub fn record_out(&self, bytes: usize) {
        self.frames_out.increment(1);
        self.bytes_out.increment(bytes as u64);
    }

    /// Record decode time.
    #[inline]
    pub fn record_time(&self, duration: Duration) {
        self.decode_time.record(duration.as_nanos() as f64);
    }

    /// Start a timer and return a guard that records on drop.
    pub fn start_timer(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            metrics: self,
        }
    }

    /// Get the element name.
    pub fn element(&self) -> &str {
        &self.element
    }
}

impl std::fmt::Debug for DecoderMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderMetrics")
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

/// Guard that records decode time when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    metrics: &'a DecoderMetrics,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.metrics.record_time(self.start.elapsed());
    }
}
