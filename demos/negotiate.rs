//! # Format Negotiation
//!
//! Negotiates an output format for a 44.1 kHz stereo stream against an
//! engine build that lacks 24-bit output, and prints what was tried.
//!
//! Run: `RUST_LOG=debug cargo run --example negotiate`

use parallax_mpg123::engine::EngineCapabilities;
use parallax_mpg123::format::{
    CandidateCaps, CandidateList, CapsValue, SampleEncoding, UpstreamCaps,
};
use parallax_mpg123::negotiation::FormatNegotiator;
use parallax_mpg123::testing::ScriptedEngine;

fn main() -> parallax_mpg123::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("parallax_mpg123=debug")
        .init();

    let capabilities: EngineCapabilities =
        [SampleEncoding::S16, SampleEncoding::S32, SampleEncoding::F32]
            .into_iter()
            .collect();
    let mut engine = ScriptedEngine::new(capabilities.clone());

    let upstream = UpstreamCaps::new().with_rate(44100).with_channels(2);
    let candidates = CandidateList::from(vec![
        CandidateCaps::raw_int(),
        CandidateCaps::integer(24, true),
        CandidateCaps::raw_int().with_width(CapsValue::List(vec![32, 16])),
        CandidateCaps::float(32),
    ]);

    println!("Upstream: {:?}", upstream);
    for (i, c) in candidates.normalize().iter().enumerate() {
        println!("  candidate {}: {}", i, c);
    }

    let result =
        FormatNegotiator::new(&capabilities).negotiate(&upstream, &candidates, &mut engine)?;
    println!(
        "Chosen: {} (candidate {})",
        result.encoding, result.candidate_index
    );
    println!("Caps:   {}", result.caps);

    Ok(())
}
