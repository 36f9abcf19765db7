//! Integration tests for the decode session.

use parallax_mpg123::config::DecoderConfig;
use parallax_mpg123::decoder::{FlowStatus, Mpg123Decoder};
use parallax_mpg123::engine::{DecodeStatus, EngineError, EngineFormat, FormatControl};
use parallax_mpg123::error::Error;
use parallax_mpg123::format::{CandidateCaps, CandidateList, SampleEncoding, UpstreamCaps};
use parallax_mpg123::testing::{CollectingSink, EngineCall, ScriptedEngine};
use std::time::Duration;

fn stereo_44k() -> UpstreamCaps {
    UpstreamCaps::new().with_rate(44100).with_channels(2)
}

fn preferred() -> CandidateList {
    CandidateList::from(vec![
        CandidateCaps::integer(24, true),
        CandidateCaps::integer(16, true),
    ])
}

// ============================================================================
// Scripted engine
// ============================================================================

#[test]
fn test_session_lifecycle() {
    let engine = ScriptedEngine::supporting(&[SampleEncoding::S16]);
    let config = DecoderConfig::default()
        .with_name("mpg123-test")
        .with_resync_limit(Some(2048));
    let mut decoder = Mpg123Decoder::start(engine, config).unwrap();
    let mut sink = CollectingSink::new();

    let caps = decoder.set_format(&stereo_44k(), &preferred()).unwrap();
    assert_eq!(caps.width, 16);

    decoder.engine_mut().push_new_format();
    decoder.engine_mut().push_frame(4608);
    decoder.engine_mut().push_frame(4608);
    assert_eq!(
        decoder.handle_frame(&[0xFF; 834], &mut sink).unwrap(),
        FlowStatus::Ok
    );
    decoder.engine_mut().push_status(DecodeStatus::Done);
    assert_eq!(
        decoder.handle_frame(&[], &mut sink).unwrap(),
        FlowStatus::Eos
    );

    assert_eq!(sink.caps, vec![caps]);
    assert_eq!(sink.total_bytes(), 9216);

    let stats = decoder.stats();
    assert_eq!(stats.buffers_in, 2);
    assert_eq!(stats.frames_out, 2);
    assert_eq!(stats.negotiations_ok, 1);

    let engine = decoder.stop();
    assert_eq!(engine.fed().len(), 834);
    let params = engine
        .calls()
        .iter()
        .find_map(|c| match c {
            EngineCall::ApplyParams(p) => Some(*p),
            _ => None,
        })
        .unwrap();
    assert_eq!(params.resync_limit, Some(2048));
}

#[test]
fn test_sink_sees_caps_before_buffers() {
    let engine = ScriptedEngine::supporting(&[SampleEncoding::S16, SampleEncoding::F32]);
    let mut decoder = Mpg123Decoder::start(engine, DecoderConfig::default()).unwrap();
    let mut sink = CollectingSink::new();

    decoder.set_format(&stereo_44k(), &preferred()).unwrap();
    decoder.engine_mut().push_new_format();
    decoder.engine_mut().push_frame(16);
    decoder.handle_frame(&[0; 4], &mut sink).unwrap();

    let float = CandidateList::from(vec![CandidateCaps::float(32)]);
    decoder.set_format(&stereo_44k(), &float).unwrap();
    decoder.engine_mut().push_new_format();
    decoder.engine_mut().push_frame(32);
    decoder.handle_frame(&[0; 4], &mut sink).unwrap();

    assert_eq!(sink.caps.len(), 2);
    for buffer in &sink.buffers {
        assert!(sink.caps.contains(buffer.caps()));
    }
    assert_eq!(sink.current_caps().map(|c| c.width), Some(32));
}

#[test]
fn test_flush_then_continue() {
    let engine = ScriptedEngine::supporting(&[SampleEncoding::S16]);
    let mut decoder = Mpg123Decoder::start(engine, DecoderConfig::default()).unwrap();
    let mut sink = CollectingSink::new();

    decoder.set_format(&stereo_44k(), &preferred()).unwrap();
    decoder.engine_mut().push_new_format();
    decoder.engine_mut().push_frame(4608);
    decoder.handle_frame(&[0; 100], &mut sink).unwrap();

    decoder.flush().unwrap();
    assert!(decoder.engine().fed().is_empty());
    assert_eq!(
        decoder.engine().committed_format(),
        Some(EngineFormat::new(44100, 2, SampleEncoding::S16))
    );

    decoder.engine_mut().push_new_format();
    decoder.engine_mut().push_frame(4608);
    decoder
        .handle_frame_with_pts(&[0; 100], Some(Duration::from_secs(10)), &mut sink)
        .unwrap();

    assert_eq!(sink.caps.len(), 1);
    let after = &sink.buffers[1];
    assert!(after.discont);
    assert_eq!(after.pts, Duration::from_secs(10));
    assert_eq!(after.sequence, 1);
}

#[test]
fn test_negotiation_failure_blocks_data() {
    let engine = ScriptedEngine::supporting(&[SampleEncoding::F32]);
    let mut decoder = Mpg123Decoder::start(engine, DecoderConfig::default()).unwrap();
    let mut sink = CollectingSink::new();

    assert!(matches!(
        decoder.set_format(&stereo_44k(), &preferred()),
        Err(Error::Negotiation(_))
    ));
    assert!(matches!(
        decoder.handle_frame(&[0; 4], &mut sink),
        Err(Error::NotNegotiated)
    ));
    assert_eq!(decoder.stats().buffers_in, 0);
}

// ============================================================================
// Symphonia engine
// ============================================================================

#[cfg(feature = "audio-mp3")]
mod symphonia_tests {
    use super::*;
    use parallax_mpg123::engine::SymphoniaEngine;
    use parallax_mpg123::testing::{
        MPEG1_L3_STEREO_32000, MPEG1_L3_STEREO_44100, MPEG2_L3_MONO_22050, info_frame,
        silent_frame,
    };

    fn stream(header: [u8; 4], frames: usize) -> Vec<u8> {
        (0..frames).flat_map(|_| silent_frame(header)).collect()
    }

    #[test]
    fn test_decode_in_arbitrary_chunks() {
        let mut decoder =
            Mpg123Decoder::start(SymphoniaEngine::new(), DecoderConfig::default()).unwrap();
        let mut sink = CollectingSink::new();
        decoder.set_format(&stereo_44k(), &preferred()).unwrap();

        let data = stream(MPEG1_L3_STEREO_44100, 5);
        for chunk in data.chunks(100) {
            decoder.handle_frame(chunk, &mut sink).unwrap();
        }

        assert_eq!(sink.caps.len(), 1);
        assert_eq!(sink.caps[0].width, 24);
        assert_eq!(sink.buffers.len(), 5);
        assert!(sink.buffers.iter().all(|b| b.len() == 1152 * 2 * 3));
        // silence
        assert!(
            sink.buffers
                .iter()
                .all(|b| b.as_bytes().iter().all(|x| *x == 0))
        );
    }

    #[test]
    fn test_mpeg2_mono_float() {
        let mut decoder =
            Mpg123Decoder::start(SymphoniaEngine::new(), DecoderConfig::default()).unwrap();
        let mut sink = CollectingSink::new();
        let upstream = UpstreamCaps::new().with_rate(22050).with_channels(1);
        let float = CandidateList::from(vec![CandidateCaps::float(32)]);
        decoder.set_format(&upstream, &float).unwrap();

        decoder
            .handle_frame(&stream(MPEG2_L3_MONO_22050, 2), &mut sink)
            .unwrap();

        assert_eq!(sink.buffers.len(), 2);
        assert_eq!(sink.buffers[0].sample_frames(), 576);
        assert_eq!(sink.buffers[1].pts, sink.buffers[0].duration);
    }

    #[test]
    fn test_gapless_stream_start() {
        let mut decoder =
            Mpg123Decoder::start(SymphoniaEngine::new(), DecoderConfig::default()).unwrap();
        let mut sink = CollectingSink::new();
        decoder
            .set_format(
                &stereo_44k(),
                &CandidateList::from(vec![CandidateCaps::integer(16, true)]),
            )
            .unwrap();

        let mut data = info_frame(MPEG1_L3_STEREO_44100, 576);
        data.extend(stream(MPEG1_L3_STEREO_44100, 2));
        decoder.handle_frame(&data, &mut sink).unwrap();

        let frames: Vec<usize> = sink.buffers.iter().map(|b| b.sample_frames()).collect();
        assert_eq!(frames, vec![1152 - 576 - 529, 1152]);
    }

    #[test]
    fn test_gapless_disabled_keeps_info_frame() {
        let config = DecoderConfig::default().with_gapless(false);
        let mut decoder = Mpg123Decoder::start(SymphoniaEngine::new(), config).unwrap();
        let mut sink = CollectingSink::new();
        decoder
            .set_format(
                &stereo_44k(),
                &CandidateList::from(vec![CandidateCaps::integer(16, true)]),
            )
            .unwrap();

        let mut data = info_frame(MPEG1_L3_STEREO_44100, 576);
        data.extend(stream(MPEG1_L3_STEREO_44100, 1));
        decoder.handle_frame(&data, &mut sink).unwrap();

        assert_eq!(sink.buffers.len(), 2);
    }

    #[test]
    fn test_stream_not_matching_negotiated_rate() {
        let mut decoder =
            Mpg123Decoder::start(SymphoniaEngine::new(), DecoderConfig::default()).unwrap();
        let mut sink = CollectingSink::new();
        decoder.set_format(&stereo_44k(), &preferred()).unwrap();

        let result = decoder.handle_frame(&stream(MPEG1_L3_STEREO_32000, 1), &mut sink);
        assert!(matches!(
            result,
            Err(Error::Decode(EngineError::FormatMismatch {
                rate: 32000,
                channels: 2
            }))
        ));
    }

    #[test]
    fn test_decoding_continues_after_id3v1_tag() {
        let mut decoder =
            Mpg123Decoder::start(SymphoniaEngine::new(), DecoderConfig::default()).unwrap();
        let mut sink = CollectingSink::new();
        decoder.set_format(&stereo_44k(), &preferred()).unwrap();

        let mut tag = vec![0u8; 128];
        tag[..3].copy_from_slice(b"TAG");
        let mut data = stream(MPEG1_L3_STEREO_44100, 1);
        data.extend(tag);
        data.extend(stream(MPEG1_L3_STEREO_44100, 3));

        assert_eq!(
            decoder.handle_frame(&data, &mut sink).unwrap(),
            FlowStatus::Ok
        );
        assert_eq!(
            decoder
                .handle_frame(&stream(MPEG1_L3_STEREO_44100, 1), &mut sink)
                .unwrap(),
            FlowStatus::Ok
        );
        assert!(!decoder.is_eos());
        assert_eq!(sink.buffers.len(), 5);
        assert_eq!(sink.caps.len(), 1);
    }

    #[test]
    fn test_flush_discards_partial_frame() {
        let mut decoder =
            Mpg123Decoder::start(SymphoniaEngine::new(), DecoderConfig::default()).unwrap();
        let mut sink = CollectingSink::new();
        decoder.set_format(&stereo_44k(), &preferred()).unwrap();

        let frame = silent_frame(MPEG1_L3_STEREO_44100);
        decoder.handle_frame(&frame[..200], &mut sink).unwrap();
        assert!(sink.buffers.is_empty());

        decoder.flush().unwrap();
        assert_eq!(decoder.engine().buffered(), 0);
        decoder.handle_frame(&frame, &mut sink).unwrap();
        assert_eq!(sink.buffers.len(), 1);
        assert_eq!(sink.caps.len(), 1);
    }
}
