//! Output format negotiation.
//!
//! Reconciles three inputs into at most one output format:
//!
//! 1. the rate and channel count of the compressed stream ([`UpstreamCaps`])
//! 2. the encodings the engine build can produce ([`EngineCapabilities`])
//! 3. the ordered candidates downstream accepts ([`CandidateList`])
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    FormatNegotiator                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  1. Validate upstream rate/channels                             │
//! │  2. Normalize candidates (expand lists, keep order)             │
//! │  3. For each candidate: resolve encoding, test capabilities     │
//! │  4. Commit to the engine; on reject roll back and continue      │
//! │  5. First commit that sticks wins                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use parallax_mpg123::engine::EngineCapabilities;
//! use parallax_mpg123::format::{CandidateCaps, CandidateList, SampleEncoding, UpstreamCaps};
//! use parallax_mpg123::negotiation::FormatNegotiator;
//! use parallax_mpg123::testing::ScriptedEngine;
//!
//! let capabilities = EngineCapabilities::none().with(SampleEncoding::S16);
//! let mut engine = ScriptedEngine::new(capabilities.clone());
//!
//! let upstream = UpstreamCaps::new().with_rate(44100).with_channels(2);
//! let candidates = CandidateList::from(vec![
//!     CandidateCaps::integer(24, true),
//!     CandidateCaps::integer(16, true),
//! ]);
//!
//! let result = FormatNegotiator::new(&capabilities)
//!     .negotiate(&upstream, &candidates, &mut engine)
//!     .unwrap();
//! assert_eq!(result.encoding, SampleEncoding::S16);
//! ```
//!
//! [`UpstreamCaps`]: crate::format::UpstreamCaps
//! [`EngineCapabilities`]: crate::engine::EngineCapabilities
//! [`CandidateList`]: crate::format::CandidateList

mod error;
mod negotiator;

pub use error::{NegotiationError, Rejection};
pub use negotiator::{FormatNegotiator, Negotiated, negotiate};
