//! Fuzz target: `SseDecoder::feed`
//!
//! Drives arbitrary byte sequences into the event-stream decoder, split
//! at a fuzzer-chosen point, and checks that every emitted update names
//! a path under the subscription root.
//!
//! cargo fuzz run fuzz_sse_decoder

#![no_main]

use greenhouse::paths;
use greenhouse::stream::sse::{SseDecoder, SseEvent};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let cut = usize::from(split).min(rest.len());

    let mut decoder = SseDecoder::new(paths::CONTROLS);
    let mut check = |event: SseEvent| {
        if let SseEvent::Update { path, .. } = event {
            assert!(path.starts_with(paths::CONTROLS), "update escaped root: {path}");
        }
    };
    decoder.feed(&rest[..cut], &mut check);
    decoder.feed(&rest[cut..], &mut check);

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    decoder.feed(rest, &mut check);
});
