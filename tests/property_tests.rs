//! Property and fuzz-style tests for robustness of the core state machines.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use moodpanel::app::events::{ButtonId, format_utc};
use moodpanel::drivers::button::{Debouncer, Edge};
use moodpanel::pins;
use moodpanel::power::{SleepDeadline, WakeReason, decode_wake};
use proptest::prelude::*;

// ── Debouncer invariants ──────────────────────────────────────

proptest! {
    /// For any raw sample sequence, committed edges strictly alternate:
    /// Rising, Falling, Rising, ... — a press can never be reported twice
    /// without an intervening release.
    #[test]
    fn debounce_edges_alternate(samples in proptest::collection::vec(any::<bool>(), 1..400)) {
        let mut d = Debouncer::new(50);
        let mut now = 0u64;
        let mut last_edge = None;

        for raw in samples {
            now += 10;
            if let Some(edge) = d.poll(raw, now) {
                match (last_edge, edge) {
                    (None, Edge::Rising)
                    | (Some(Edge::Rising), Edge::Falling)
                    | (Some(Edge::Falling), Edge::Rising) => {}
                    other => prop_assert!(false, "edge order violated: {:?}", other),
                }
                last_edge = Some(edge);
            }
        }
    }

    /// Noise bursts shorter than the debounce window never commit an edge.
    #[test]
    fn debounce_filters_short_noise(burst_len in 1u64..5) {
        let mut d = Debouncer::new(50);
        let mut now = 0u64;

        // Settle low for a while.
        for _ in 0..20 {
            now += 10;
            prop_assert!(d.poll(false, now).is_none());
        }
        // A high burst shorter than 50 ms, then back low.
        for _ in 0..burst_len {
            now += 10;
            prop_assert!(d.poll(true, now).is_none());
        }
        for _ in 0..20 {
            now += 10;
            prop_assert!(d.poll(false, now).is_none());
        }
    }
}

// ── Wake decode invariants ────────────────────────────────────

proptest! {
    /// Decode is a pure function: same inputs, same output, never a panic,
    /// and any decoded button actually has its bit set in the status mask.
    #[test]
    fn wake_decode_is_pure_and_sound(status in any::<u64>()) {
        let a = decode_wake(WakeReason::Ext1Button, status);
        let b = decode_wake(WakeReason::Ext1Button, status);
        prop_assert_eq!(a, b);

        if let Some(id) = a {
            prop_assert_ne!(status & pins::channel_for(id).wake_bit(), 0);
            // Priority: no higher-priority channel can also have its bit set.
            for higher in ButtonId::ALL.iter().take(id.index()) {
                prop_assert_eq!(status & pins::channel_for(*higher).wake_bit(), 0);
            }
        }
    }

    /// Non-EXT1 wake causes never synthesize a press, whatever the mask.
    #[test]
    fn non_button_wakes_never_decode(status in any::<u64>()) {
        for reason in [
            WakeReason::PowerOn,
            WakeReason::Timer,
            WakeReason::Touchpad,
            WakeReason::Ulp,
            WakeReason::Unknown,
        ] {
            prop_assert_eq!(decode_wake(reason, status), None);
        }
    }
}

// ── Countdown invariants ──────────────────────────────────────

proptest! {
    /// However many resets happen, the remaining time is always measured
    /// from the last one.
    #[test]
    fn countdown_measures_from_last_reset(
        offsets in proptest::collection::vec(1u64..5_000, 1..50),
    ) {
        let mut deadline = SleepDeadline::new(15_000, 0);
        let mut now = 0u64;

        for off in offsets {
            now += off;
            deadline.reset(now);
            prop_assert_eq!(deadline.remaining_ms(now), 15_000);
        }

        prop_assert!(!deadline.expired(now + 14_999));
        prop_assert!(deadline.expired(now + 15_000));
    }
}

// ── Timestamp formatting ──────────────────────────────────────

proptest! {
    /// Output always matches the fixed ISO-8601 UTC shape with in-range
    /// fields.
    #[test]
    fn timestamps_are_well_formed(secs in 0u64..4_102_444_800) { // through 2099
        let s = format_utc(secs);
        prop_assert_eq!(s.len(), 20);
        let bytes = s.as_bytes();
        prop_assert_eq!(bytes[4], b'-');
        prop_assert_eq!(bytes[7], b'-');
        prop_assert_eq!(bytes[10], b'T');
        prop_assert_eq!(bytes[13], b':');
        prop_assert_eq!(bytes[16], b':');
        prop_assert_eq!(bytes[19], b'Z');

        let month: u32 = s[5..7].parse().unwrap();
        let day: u32 = s[8..10].parse().unwrap();
        let hour: u32 = s[11..13].parse().unwrap();
        prop_assert!((1..=12).contains(&month));
        prop_assert!((1..=31).contains(&day));
        prop_assert!(hour < 24);
    }
}
