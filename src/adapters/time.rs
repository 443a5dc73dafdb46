//! ESP32 time adapter.
//!
//! Implements [`ClockPort`] for the panel.
//!
//! - **`target_os = "espidf"`** — monotonic time wraps `esp_timer_get_time()`
//!   (microsecond precision); wall-clock time comes from `gettimeofday`,
//!   populated by SNTP once the network is up.
//! - **`not(target_os = "espidf")`** — uses `std::time::Instant` for
//!   host-side testing and simulation; the wall clock is never synced.

use crate::app::ports::ClockPort;

/// Time adapter for the ESP32 platform.
pub struct PanelClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for PanelClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl ClockPort for PanelClock {
    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        // SAFETY: esp_timer_get_time has no preconditions after esp_timer
        // init, which binstart performs before main.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Unix seconds from the system clock. `None` before SNTP sync.
    #[cfg(target_os = "espidf")]
    fn wall_unix_secs(&self) -> Option<u64> {
        use core::ptr;

        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: tv is a valid out-pointer; the timezone argument is unused.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        // Reject obviously unsynced time (e.g. before 2020-01-01).
        const EPOCH_2020: i64 = 1_577_836_800;
        if tv.tv_sec < EPOCH_2020 {
            return None;
        }
        Some(tv.tv_sec as u64)
    }

    /// On non-ESP targets (simulation) the wall clock is never synced.
    #[cfg(not(target_os = "espidf"))]
    fn wall_unix_secs(&self) -> Option<u64> {
        None
    }
}

/// Kick off background SNTP synchronization. The returned handle must stay
/// alive for sync to complete; `wall_unix_secs` starts returning `Some`
/// once the system clock has been set.
#[cfg(target_os = "espidf")]
pub fn start_time_sync() -> Result<esp_idf_svc::sntp::EspSntp<'static>, esp_idf_svc::sys::EspError>
{
    esp_idf_svc::sntp::EspSntp::new_default()
}
