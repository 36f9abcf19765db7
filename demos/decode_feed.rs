//! # Feed-Mode Decoding
//!
//! Decodes an MP3 file (or a synthesized silent stream) in small chunks and
//! reports the caps and buffers that reach the sink.
//!
//! Run: `cargo run --example decode_feed -- [file.mp3] [rate] [channels]`

use parallax_mpg123::prelude::*;
use parallax_mpg123::testing::{MPEG1_L3_STEREO_44100, silent_frame};

struct PrintSink {
    buffers: u64,
    bytes: usize,
}

impl OutputSink for PrintSink {
    fn set_caps(&mut self, caps: &OutputCaps) -> Result<()> {
        println!("caps: {}", caps);
        Ok(())
    }

    fn push(&mut self, buffer: PcmBuffer) -> Result<()> {
        self.buffers += 1;
        self.bytes += buffer.len();
        if buffer.discont {
            println!("discont at {:?}", buffer.pts);
        }
        Ok(())
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("parallax_mpg123=info")
        .init();

    let mut args = std::env::args().skip(1);
    let (data, rate, channels) = match args.next() {
        Some(path) => {
            let data = std::fs::read(&path)?;
            let rate = args.next().and_then(|r| r.parse().ok()).unwrap_or(44100);
            let channels = args.next().and_then(|c| c.parse().ok()).unwrap_or(2);
            (data, rate, channels)
        }
        None => {
            let data = (0..100).flat_map(|_| silent_frame(MPEG1_L3_STEREO_44100)).collect();
            (data, 44100, 2)
        }
    };

    let mut decoder = Mpg123Decoder::start(SymphoniaEngine::new(), DecoderConfig::default())?;
    let upstream = UpstreamCaps::new().with_rate(rate).with_channels(channels);
    let candidates = CandidateList::from(vec![
        CandidateCaps::integer(16, true),
        CandidateCaps::float(32),
    ]);
    decoder.set_format(&upstream, &candidates)?;

    let mut sink = PrintSink {
        buffers: 0,
        bytes: 0,
    };
    for chunk in data.chunks(4096) {
        if decoder.handle_frame(chunk, &mut sink)? == FlowStatus::Eos {
            break;
        }
    }

    println!("{} buffers, {} bytes", sink.buffers, sink.bytes);
    println!("{:?}", decoder.stats());
    decoder.stop();
    Ok(())
}
