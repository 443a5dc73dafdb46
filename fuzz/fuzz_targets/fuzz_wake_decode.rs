//! Fuzz the wake-cause decoder: must be total over any status mask and any
//! wake reason, and any decoded button must have its bit in the mask.

#![no_main]

use libfuzzer_sys::fuzz_target;
use moodpanel::pins;
use moodpanel::power::{WakeReason, decode_wake};

fuzz_target!(|data: [u8; 9]| {
    let status = u64::from_le_bytes([
        data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
    ]);
    let reason = match data[8] % 6 {
        0 => WakeReason::PowerOn,
        1 => WakeReason::Ext1Button,
        2 => WakeReason::Timer,
        3 => WakeReason::Touchpad,
        4 => WakeReason::Ulp,
        _ => WakeReason::Unknown,
    };

    if let Some(id) = decode_wake(reason, status) {
        assert_eq!(reason, WakeReason::Ext1Button);
        assert_ne!(status & pins::channel_for(id).wake_bit(), 0);
    }
});
