//! Power lifecycle: wake-cause decoding, the inactivity countdown, and
//! deep-sleep entry.
//!
//! Execution restarts from the top of `main` on every wake, so the lifecycle
//! is two-phase: decode the boot's wake cause once (possibly synthesizing a
//! press for the button that woke us), then run the tick loop until the
//! countdown elapses and [`enter_deep_sleep`] ends the session.
//!
//! The wake condition is "any configured pin driven HIGH", so before
//! sleeping every button pin gets its pulldown enabled and pull-up disabled;
//! a floating pin would otherwise wake the device on electrical noise.

use log::{info, warn};

use crate::app::events::ButtonId;
use crate::pins;

// ---------------------------------------------------------------------------
// Wake cause
// ---------------------------------------------------------------------------

/// Why this boot happened, as reported by the SoC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Power-on or external reset — not a deep-sleep wake.
    PowerOn,
    /// Deep-sleep wake via the EXT1 (multi-pin) wake source.
    Ext1Button,
    /// Deep-sleep wake via the backup timer.
    Timer,
    /// Deep-sleep wake via the touch controller.
    Touchpad,
    /// Deep-sleep wake via the ULP coprocessor.
    Ulp,
    /// Anything the SoC reports that we do not recognise.
    Unknown,
}

/// Decode which button caused an EXT1 wake.
///
/// Pure function of the wake cause and the EXT1 status bitmask. Channels are
/// scanned in [`ButtonId`] declaration order, so when several wake bits are
/// latched simultaneously the highest-priority button wins (the ambiguity is
/// logged). Non-EXT1 causes never synthesize a press.
pub fn decode_wake(reason: WakeReason, ext1_status: u64) -> Option<ButtonId> {
    match reason {
        WakeReason::Ext1Button => {}
        WakeReason::PowerOn => return None,
        other => {
            info!("wake cause {:?} — no press to synthesize", other);
            return None;
        }
    }

    let latched = pins::CHANNELS
        .iter()
        .filter(|ch| ext1_status & ch.wake_bit() != 0)
        .count();

    match latched {
        0 => {
            warn!(
                "EXT1 wake with empty status register (0x{:x}) — no button decoded",
                ext1_status
            );
            None
        }
        1 => pins::CHANNELS
            .iter()
            .find(|ch| ext1_status & ch.wake_bit() != 0)
            .map(|ch| ch.id),
        n => {
            let winner = pins::CHANNELS
                .iter()
                .find(|ch| ext1_status & ch.wake_bit() != 0)
                .map(|ch| ch.id);
            warn!(
                "EXT1 wake with {} bits latched (0x{:x}) — resolving to {:?} by priority",
                n, ext1_status, winner
            );
            winner
        }
    }
}

/// Fallback when the EXT1 status register reads empty on a genuine
/// deep-sleep wake: check the live pin levels in the same priority order.
/// The press that woke us is usually still held at this point.
pub fn probe_live_levels(levels: &[bool; ButtonId::COUNT]) -> Option<ButtonId> {
    let hit = ButtonId::ALL.into_iter().find(|id| levels[id.index()]);
    if let Some(id) = hit {
        info!("wake button recovered from live pin level: {:?}", id);
    }
    hit
}

// ---------------------------------------------------------------------------
// Inactivity countdown
// ---------------------------------------------------------------------------

/// A relative deadline that is reset to its full value on every accepted
/// button event and fires once when it reaches zero.
#[derive(Debug, Clone, Copy)]
pub struct SleepDeadline {
    started_at_ms: u64,
    duration_ms: u32,
}

impl SleepDeadline {
    pub fn new(duration_ms: u32, now_ms: u64) -> Self {
        Self {
            started_at_ms: now_ms,
            duration_ms,
        }
    }

    /// Restart the countdown from `now_ms`.
    pub fn reset(&mut self, now_ms: u64) {
        self.started_at_ms = now_ms;
    }

    /// Milliseconds left before the countdown elapses (0 when expired).
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        u64::from(self.duration_ms).saturating_sub(now_ms.wrapping_sub(self.started_at_ms))
    }

    pub fn expired(&self, now_ms: u64) -> bool {
        self.remaining_ms(now_ms) == 0
    }
}

/// Handed from the service to the main loop when the countdown elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRequest {
    /// Combined EXT1 wake mask over all four channels.
    pub wake_mask: u64,
}

// ---------------------------------------------------------------------------
// ESP-IDF backend
// ---------------------------------------------------------------------------

/// Read the SoC's wake cause for this boot.
#[cfg(target_os = "espidf")]
pub fn read_wake_reason() -> WakeReason {
    use esp_idf_svc::sys::*;

    // SAFETY: plain register query, no preconditions.
    let cause = unsafe { esp_sleep_get_wakeup_cause() };
    match cause {
        x if x == esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED => WakeReason::PowerOn,
        x if x == esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT1 => WakeReason::Ext1Button,
        x if x == esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => WakeReason::Timer,
        x if x == esp_sleep_source_t_ESP_SLEEP_WAKEUP_TOUCHPAD => WakeReason::Touchpad,
        x if x == esp_sleep_source_t_ESP_SLEEP_WAKEUP_ULP => WakeReason::Ulp,
        _ => WakeReason::Unknown,
    }
}

/// Read the EXT1 wake status bitmask (which GPIOs were HIGH at wake).
#[cfg(target_os = "espidf")]
pub fn read_ext1_status() -> u64 {
    // SAFETY: plain register query, valid until the next sleep configuration.
    unsafe { esp_idf_svc::sys::esp_sleep_get_ext1_wakeup_status() }
}

/// Arm all four wake sources and enter deep sleep. Does not return;
/// execution resumes at the top of `main` on the next wake.
#[cfg(target_os = "espidf")]
pub fn enter_deep_sleep(channels: &[pins::Channel; ButtonId::COUNT]) -> ! {
    use esp_idf_svc::sys::*;

    let mask = channels.iter().fold(0u64, |m, ch| m | ch.wake_bit());
    info!("entering deep sleep, EXT1 mask=0x{:x}", mask);

    // SAFETY: sleep configuration calls from the single main task, with the
    // tick loop already stopped; nothing else touches the RTC domain.
    unsafe {
        for ch in channels {
            // Defined LOW rest level so only a real press wakes us.
            rtc_gpio_pulldown_en(ch.button_gpio);
            rtc_gpio_pullup_dis(ch.button_gpio);
        }
        esp_sleep_enable_ext1_wakeup(mask, esp_sleep_ext1_wakeup_mode_t_ESP_EXT1_WAKEUP_ANY_HIGH);
        esp_deep_sleep_start();
    }
    unreachable!("esp_deep_sleep_start returned");
}
