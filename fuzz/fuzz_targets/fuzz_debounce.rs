//! Fuzz the debouncer with arbitrary sample streams: edges must strictly
//! alternate and the poll must never panic, whatever the input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use moodpanel::drivers::button::{Debouncer, Edge};

fuzz_target!(|data: &[u8]| {
    let mut d = Debouncer::new(50);
    let mut now = 0u64;
    let mut last = None;

    for byte in data {
        // Low bit = raw level; the rest is a time step (0-127 ms).
        let raw = byte & 1 != 0;
        now += u64::from(byte >> 1);

        if let Some(edge) = d.poll(raw, now) {
            match (last, edge) {
                (None, Edge::Rising)
                | (Some(Edge::Rising), Edge::Falling)
                | (Some(Edge::Falling), Edge::Rising) => {}
                other => panic!("edge order violated: {:?}", other),
            }
            last = Some(edge);
        }
    }
});
