//! Negotiation error types.

use crate::engine::EngineError;
use crate::format::{MediaKind, SampleEncoding, StreamField, StreamFormat};
use std::fmt;
use thiserror::Error;

/// Error during output format negotiation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// Upstream caps lack a mandatory field. The stream is undecodable until
    /// upstream supplies a corrected description.
    #[error("Upstream caps have no valid {field}")]
    MissingStreamInfo {
        /// The missing or invalid field.
        field: StreamField,
    },

    /// Every candidate was rejected.
    #[error("No compatible output format for {rate} Hz, {channels} channel(s):\n  {explanation}")]
    NoCompatibleFormat {
        /// Upstream sample rate.
        rate: u32,
        /// Upstream channel count.
        channels: u16,
        /// Number of candidates tried (after normalization).
        tried: usize,
        /// Detailed explanation.
        explanation: String,
    },
}

impl NegotiationError {
    /// Create a "no compatible format" error listing why each candidate failed.
    pub fn no_compatible_format(stream: StreamFormat, rejections: &[Rejection]) -> Self {
        let explanation = if rejections.is_empty() {
            "Downstream offered no candidates".to_string()
        } else {
            rejections
                .iter()
                .enumerate()
                .map(|(i, r)| format!("candidate {}: {}", i, r))
                .collect::<Vec<_>>()
                .join("\n  ")
        };
        Self::NoCompatibleFormat {
            rate: stream.sample_rate,
            channels: stream.channels,
            tried: rejections.len(),
            explanation,
        }
    }
}

/// Why a single candidate did not match.
///
/// These are absorbed by the scan; they only surface inside
/// [`NegotiationError::NoCompatibleFormat`]'s explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The media type is not raw PCM.
    UnsupportedMediaType(String),
    /// The candidate leaves the width open.
    WidthUnspecified,
    /// No encoding exists for this combination.
    NoEncoding {
        /// Integer or float.
        kind: MediaKind,
        /// Requested width.
        width: u32,
        /// Requested signedness.
        signed: bool,
    },
    /// The engine build cannot produce this encoding.
    NotInCapabilities(SampleEncoding),
    /// The engine refused the (rate, channels, encoding) triple.
    EngineRejected(EngineError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedMediaType(media_type) => {
                write!(f, "unsupported media type {}", media_type)
            }
            Self::WidthUnspecified => f.write_str("width not specified"),
            Self::NoEncoding {
                kind,
                width,
                signed,
            } => write!(
                f,
                "no {} encoding with width {} (signed={})",
                kind.media_type(),
                width,
                signed
            ),
            Self::NotInCapabilities(encoding) => {
                write!(f, "{} not supported by the engine", encoding)
            }
            Self::EngineRejected(e) => write!(f, "rejected by the engine: {}", e),
        }
    }
}
