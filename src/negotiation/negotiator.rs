//! The output format negotiator.

use super::error::{NegotiationError, Rejection};
use crate::engine::{EngineCapabilities, FormatControl};
use crate::format::{
    CandidateCaps, CandidateList, OutputCaps, SampleEncoding, StreamFormat, UpstreamCaps,
};
use crate::observability::span_negotiation;

/// Outcome of a successful negotiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Negotiated {
    /// Encoding committed to the engine.
    pub encoding: SampleEncoding,
    /// Stream format carried through from upstream.
    pub stream: StreamFormat,
    /// Output caps to advertise downstream.
    pub caps: OutputCaps,
    /// Position of the chosen candidate in the normalized list.
    pub candidate_index: usize,
}

/// Picks the first downstream candidate the engine can produce and commits it.
///
/// The engine's format register is written only by [`negotiate`]. Candidates
/// that fail the capability test never touch the engine; a candidate the
/// engine refuses at commit time is rolled back before the next one is tried.
/// If nothing matches, the format committed before the pass is restored.
///
/// [`negotiate`]: FormatNegotiator::negotiate
#[derive(Clone, Debug)]
pub struct FormatNegotiator<'a> {
    capabilities: &'a EngineCapabilities,
}

impl<'a> FormatNegotiator<'a> {
    /// Create a negotiator for an engine with the given capability set.
    pub fn new(capabilities: &'a EngineCapabilities) -> Self {
        Self { capabilities }
    }

    /// Run one negotiation pass.
    pub fn negotiate<F: FormatControl + ?Sized>(
        &self,
        upstream: &UpstreamCaps,
        candidates: &CandidateList,
        engine: &mut F,
    ) -> Result<Negotiated, NegotiationError> {
        let stream = StreamFormat::try_from(upstream);
        let span = span_negotiation(stream.ok(), candidates.len());
        let _guard = span.enter();

        let stream = stream.map_err(|field| {
            tracing::error!(%field, "upstream caps incomplete");
            NegotiationError::MissingStreamInfo { field }
        })?;

        let previous = engine.committed_format();
        let normalized = candidates.normalize();
        let mut rejections = Vec::with_capacity(normalized.len());

        for (index, candidate) in normalized.iter().enumerate() {
            let encoding = match self.resolve(candidate) {
                Ok(encoding) => encoding,
                Err(rejection) => {
                    tracing::debug!(index, %candidate, reason = %rejection, "candidate rejected");
                    rejections.push(rejection);
                    continue;
                }
            };

            engine.reset_format();
            if let Err(e) = engine.configure(stream.sample_rate, stream.channels, encoding) {
                engine.reset_format();
                let rejection = Rejection::EngineRejected(e);
                tracing::debug!(index, %candidate, reason = %rejection, "candidate rejected");
                rejections.push(rejection);
                continue;
            }

            let caps = OutputCaps::for_encoding(stream, encoding);
            tracing::debug!(index, %caps, "negotiated output caps");
            return Ok(Negotiated {
                encoding,
                stream,
                caps,
                candidate_index: index,
            });
        }

        engine.reset_format();
        if let Some(prev) = previous {
            if let Err(e) = engine.configure(prev.sample_rate, prev.channels, prev.encoding) {
                tracing::warn!(error = %e, "could not restore previous output format");
            }
        }

        let err = NegotiationError::no_compatible_format(stream, &rejections);
        tracing::debug!(error = %err, "negotiation failed");
        Err(err)
    }

    /// Map a candidate to an encoding this engine build can emit.
    fn resolve(&self, candidate: &CandidateCaps) -> Result<SampleEncoding, Rejection> {
        let kind = candidate
            .kind()
            .ok_or_else(|| Rejection::UnsupportedMediaType(candidate.media_type.clone()))?;
        let width = candidate.fixed_width().ok_or(Rejection::WidthUnspecified)?;
        let signed = candidate.effective_signed();

        let encoding = SampleEncoding::lookup(kind, width, signed).ok_or(Rejection::NoEncoding {
            kind,
            width,
            signed,
        })?;

        if !self.capabilities.contains(encoding) {
            return Err(Rejection::NotInCapabilities(encoding));
        }
        Ok(encoding)
    }
}

/// Negotiate against an engine, querying its capability set first.
///
/// Sessions query capabilities once at start and use [`FormatNegotiator`]
/// directly; this is the one-shot form.
pub fn negotiate<F: FormatControl + ?Sized>(
    upstream: &UpstreamCaps,
    candidates: &CandidateList,
    engine: &mut F,
) -> Result<Negotiated, NegotiationError> {
    let capabilities = engine.capabilities();
    FormatNegotiator::new(&capabilities).negotiate(upstream, candidates, engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, EngineFormat};
    use crate::format::{CapsValue, MediaKind, StreamField};
    use crate::testing::{EngineCall, ScriptedEngine};

    fn stereo_44k() -> UpstreamCaps {
        UpstreamCaps::new().with_rate(44100).with_channels(2)
    }

    #[test]
    fn test_worked_example() {
        let mut engine = ScriptedEngine::supporting(&[SampleEncoding::S16]);
        let candidates = CandidateList::from(vec![
            CandidateCaps::integer(24, true),
            CandidateCaps::integer(16, true),
        ]);

        let result = negotiate(&stereo_44k(), &candidates, &mut engine).unwrap();

        assert_eq!(result.encoding, SampleEncoding::S16);
        assert_eq!(result.candidate_index, 1);
        assert_eq!(result.caps.kind, MediaKind::Integer);
        assert_eq!(result.caps.sample_rate, 44100);
        assert_eq!(result.caps.channels, 2);
        assert_eq!(result.caps.width, 16);
        assert_eq!(result.caps.depth, 16);
        assert_eq!(result.caps.signed, Some(true));
        // the 24-bit candidate never reached the engine
        assert_eq!(
            engine.configured(),
            vec![EngineFormat::new(44100, 2, SampleEncoding::S16)]
        );
    }

    #[test]
    fn test_rate_and_channels_carried_through() {
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        for (rate, channels) in [(8000, 1), (22050, 2), (48000, 1)] {
            let upstream = UpstreamCaps::new().with_rate(rate).with_channels(channels);
            let candidates = CandidateList::from(vec![CandidateCaps::float(32)]);
            let result = negotiate(&upstream, &candidates, &mut engine).unwrap();
            assert_eq!(result.stream, StreamFormat::new(rate, channels));
            assert_eq!(result.caps.stream_format(), StreamFormat::new(rate, channels));
            assert_eq!(result.caps.signed, None);
        }
    }

    #[test]
    fn test_empty_candidates() {
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        let err = negotiate(&stereo_44k(), &CandidateList::new(), &mut engine).unwrap_err();
        assert!(matches!(
            err,
            NegotiationError::NoCompatibleFormat {
                rate: 44100,
                channels: 2,
                tried: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_rate() {
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        let upstream = UpstreamCaps::new().with_channels(2);
        let candidates = CandidateList::from(vec![CandidateCaps::integer(16, true)]);

        let err = negotiate(&upstream, &candidates, &mut engine).unwrap_err();
        assert_eq!(
            err,
            NegotiationError::MissingStreamInfo {
                field: StreamField::Rate
            }
        );
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_missing_or_invalid_channels() {
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        let candidates = CandidateList::from(vec![CandidateCaps::integer(16, true)]);

        for upstream in [
            UpstreamCaps::new().with_rate(44100),
            UpstreamCaps::new().with_rate(44100).with_channels(0),
            UpstreamCaps::new().with_rate(44100).with_channels(6),
        ] {
            assert_eq!(
                negotiate(&upstream, &candidates, &mut engine),
                Err(NegotiationError::MissingStreamInfo {
                    field: StreamField::Channels
                })
            );
        }
    }

    #[test]
    fn test_width_absent_never_matches() {
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        let candidates = CandidateList::from(vec![
            CandidateCaps::raw_int(),
            CandidateCaps::raw_int().with_signed(CapsValue::Fixed(false)),
            CandidateCaps::raw_int().with_width(CapsValue::Range { min: 16, max: 32 }),
            CandidateCaps::raw_float(),
        ]);

        let err = negotiate(&stereo_44k(), &candidates, &mut engine).unwrap_err();
        assert!(matches!(err, NegotiationError::NoCompatibleFormat { tried: 4, .. }));
        assert!(engine.configured().is_empty());
    }

    #[test]
    fn test_empty_width_list_is_reported() {
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        let candidates = CandidateList::from(vec![
            CandidateCaps::raw_int().with_width(CapsValue::List(vec![])),
            CandidateCaps::new("video/x-raw"),
        ]);

        let err = negotiate(&stereo_44k(), &candidates, &mut engine).unwrap_err();
        match err {
            NegotiationError::NoCompatibleFormat {
                tried, explanation, ..
            } => {
                assert_eq!(tried, 2);
                assert!(explanation.contains("candidate 0: width not specified"));
                assert!(explanation.contains("candidate 1: unsupported media type video/x-raw"));
            }
            other => panic!("expected NoCompatibleFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_media_type_skipped() {
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        let candidates = CandidateList::from(vec![
            CandidateCaps::new("video/x-raw").with_width(CapsValue::Fixed(16)),
            CandidateCaps::integer(32, false),
        ]);

        let result = negotiate(&stereo_44k(), &candidates, &mut engine).unwrap();
        assert_eq!(result.encoding, SampleEncoding::U32);
        assert_eq!(result.caps.signed, Some(false));
    }

    #[test]
    fn test_signed_defaults_to_true() {
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        let candidates =
            CandidateList::from(vec![CandidateCaps::raw_int().with_width(CapsValue::Fixed(24))]);

        let result = negotiate(&stereo_44k(), &candidates, &mut engine).unwrap();
        assert_eq!(result.encoding, SampleEncoding::S24);
    }

    #[test]
    fn test_no_table_entry_is_a_non_match() {
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        let candidates = CandidateList::from(vec![
            CandidateCaps::integer(8, true),
            CandidateCaps::float(64),
            CandidateCaps::float(32),
        ]);

        let result = negotiate(&stereo_44k(), &candidates, &mut engine).unwrap();
        assert_eq!(result.encoding, SampleEncoding::F32);
        assert_eq!(result.candidate_index, 2);
    }

    #[test]
    fn test_engine_rejection_rolls_back_and_continues() {
        let mut engine =
            ScriptedEngine::new(EngineCapabilities::all()).rejecting(SampleEncoding::S32);
        let candidates = CandidateList::from(vec![
            CandidateCaps::integer(32, true),
            CandidateCaps::integer(16, true),
        ]);

        let result = negotiate(&stereo_44k(), &candidates, &mut engine).unwrap();
        assert_eq!(result.encoding, SampleEncoding::S16);
        assert_eq!(
            engine.calls(),
            &[
                EngineCall::ResetFormat,
                EngineCall::Configure(EngineFormat::new(44100, 2, SampleEncoding::S32)),
                EngineCall::ResetFormat,
                EngineCall::ResetFormat,
                EngineCall::Configure(EngineFormat::new(44100, 2, SampleEncoding::S16)),
            ]
        );
        assert_eq!(
            engine.committed_format(),
            Some(EngineFormat::new(44100, 2, SampleEncoding::S16))
        );
    }

    #[test]
    fn test_failure_restores_previous_format() {
        let previous = EngineFormat::new(48000, 1, SampleEncoding::F32);
        let mut engine =
            ScriptedEngine::new(EngineCapabilities::all()).rejecting(SampleEncoding::S16);
        engine.configure(48000, 1, SampleEncoding::F32).unwrap();
        engine.clear_calls();

        let candidates = CandidateList::from(vec![CandidateCaps::integer(16, true)]);
        let err = negotiate(&stereo_44k(), &candidates, &mut engine).unwrap_err();

        let NegotiationError::NoCompatibleFormat { explanation, .. } = err else {
            panic!("expected NoCompatibleFormat");
        };
        assert!(explanation.contains("rejected by the engine"));
        assert_eq!(engine.committed_format(), Some(previous));
    }

    #[test]
    fn test_failure_without_previous_leaves_engine_empty() {
        let mut engine = ScriptedEngine::supporting(&[SampleEncoding::S16]);
        let candidates = CandidateList::from(vec![CandidateCaps::float(32)]);

        assert!(negotiate(&stereo_44k(), &candidates, &mut engine).is_err());
        assert_eq!(engine.committed_format(), None);
    }

    #[test]
    fn test_capability_set_is_consulted_not_assumed() {
        let capabilities = EngineCapabilities::none().with(SampleEncoding::U16);
        // the engine itself could do more; the negotiator only trusts the set it was given
        let mut engine = ScriptedEngine::new(EngineCapabilities::all());
        let negotiator = FormatNegotiator::new(&capabilities);
        let candidates = CandidateList::from(vec![
            CandidateCaps::integer(16, true),
            CandidateCaps::integer(16, false),
        ]);

        let result = negotiator
            .negotiate(&stereo_44k(), &candidates, &mut engine)
            .unwrap();
        assert_eq!(result.encoding, SampleEncoding::U16);
    }

    #[test]
    fn test_list_fields_are_normalized_in_order() {
        let mut engine = ScriptedEngine::supporting(&[SampleEncoding::S16, SampleEncoding::S32]);
        let candidates = CandidateList::from(vec![
            CandidateCaps::raw_int()
                .with_width(CapsValue::List(vec![24, 32, 16]))
                .with_signed(CapsValue::Fixed(true)),
        ]);

        let result = negotiate(&stereo_44k(), &candidates, &mut engine).unwrap();
        assert_eq!(result.encoding, SampleEncoding::S32);
        assert_eq!(result.candidate_index, 1);
    }

    #[test]
    fn test_idempotent_against_fresh_engine() {
        let candidates = CandidateList::from(vec![
            CandidateCaps::integer(24, false),
            CandidateCaps::float(32),
        ]);
        let run = || {
            let mut engine = ScriptedEngine::supporting(&[SampleEncoding::F32, SampleEncoding::S16]);
            negotiate(&stereo_44k(), &candidates, &mut engine).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(Rejection::WidthUnspecified.to_string(), "width not specified");
        let rejection = Rejection::EngineRejected(EngineError::NoFormat);
        assert!(rejection.to_string().contains("no output format configured"));
    }
}
