//! System configuration parameters.
//!
//! All tunable parameters for the panel. Values can be overridden via NVS;
//! the defaults below match the shipped hardware.

use serde::{Deserialize, Serialize};

/// Core panel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    // --- Input timing ---
    /// Debounce window per button (milliseconds).
    pub debounce_ms: u32,
    /// Poll loop interval (milliseconds).
    pub poll_interval_ms: u32,

    // --- Feedback latch ---
    /// How long a confirmation LED stays latched on after a press
    /// (milliseconds). New presses are ignored while latched.
    pub led_hold_ms: u32,

    // --- Power ---
    /// Inactivity window before deep sleep (milliseconds). Must be strictly
    /// greater than `led_hold_ms` or the device could sleep with an LED
    /// latched on.
    pub sleep_timeout_ms: u32,

    // --- Reporting ---
    /// Device identity used in the publish topic.
    pub device_id: heapless::String<32>,
    /// Broker URL handed to the MQTT client.
    pub broker_url: heapless::String<64>,

    // --- Network ---
    /// WiFi SSID (empty = unprovisioned; publishes will fail but the
    /// interaction core still runs).
    pub wifi_ssid: heapless::String<32>,
    /// WiFi password (empty = open network).
    pub wifi_password: heapless::String<64>,
}

fn fixed<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    // Truncate rather than fail; defaults below all fit.
    let _ = out.push_str(&s[..s.len().min(N)]);
    out
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            poll_interval_ms: 10,
            led_hold_ms: 7_000,
            sleep_timeout_ms: 15_000,
            device_id: fixed("panel-01"),
            broker_url: fixed("mqtt://broker.local:1883"),
            wifi_ssid: fixed(""),
            wifi_password: fixed(""),
        }
    }
}
