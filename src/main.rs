//! Feedback Panel Firmware — Main Entry Point
//!
//! Hexagonal architecture around a single polling loop and a deep-sleep
//! power lifecycle.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  PanelHardware     LogEventSink    NvsAdapter   PanelClock   │
//! │  (Input+Led)       (EventSink)     (ConfigPort) (ClockPort)  │
//! │  WifiAdapter       MqttPublisher   rtc_store                 │
//! │  (Connectivity)    (PublishPort)   (boot counter)            │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │             PanelService (pure logic)                  │  │
//! │  │  debounce · feedback latch · sleep countdown           │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  power (wake decode + deep-sleep entry)                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every wake from deep sleep re-enters `main` from the top: decode the
//! wake cause once (synthesizing a press for the button that woke us), run
//! the poll loop, and end the session by going back to sleep.
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{info, warn};

use moodpanel::adapters::hardware::PanelHardware;
use moodpanel::adapters::log_sink::LogEventSink;
use moodpanel::adapters::mqtt::MqttPublisher;
use moodpanel::adapters::nvs::NvsAdapter;
use moodpanel::adapters::rtc_store;
use moodpanel::adapters::time::{self, PanelClock};
use moodpanel::adapters::wifi::{ConnectivityPort, WifiAdapter};
use moodpanel::app::events::ButtonId;
use moodpanel::app::ports::{ClockPort, ConfigPort, InputPort, LedPort};
use moodpanel::app::service::PanelService;
use moodpanel::config::PanelConfig;
use moodpanel::drivers::feedback_led::FeedbackLeds;
use moodpanel::drivers::watchdog::Watchdog;
use moodpanel::drivers;
use moodpanel::pins;
use moodpanel::power::{self, WakeReason};

// WiFi credentials baked in at compile time; NVS-stored credentials win
// when present.
const WIFI_SSID: Option<&str> = option_env!("WIFI_SSID");
const WIFI_PASSWORD: Option<&str> = option_env!("WIFI_PASSWORD");

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    // Wake bookkeeping first: the EXT1 status is only meaningful before the
    // next sleep configuration touches it.
    let wake_reason = power::read_wake_reason();
    let ext1_status = power::read_ext1_status();
    let boot_count = rtc_store::increment_boot_count();

    info!("=== moodpanel v{} ===", env!("CARGO_PKG_VERSION"));
    info!("boot number: {}", boot_count);
    info!("wake reason: {:?} (EXT1 status 0x{:x})", wake_reason, ext1_status);

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // GPIO init failure is critical — log and halt; the TWDT resets us.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = Watchdog::new();
    let mut hw = PanelHardware::new(FeedbackLeds::new());
    let clock = PanelClock::new();

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            None
        }
    };
    let config = nvs
        .as_ref()
        .map(|n| match n.load() {
            Ok(cfg) => {
                info!("config loaded from NVS");
                cfg
            }
            Err(e) => {
                warn!("NVS config load failed ({}), using defaults", e);
                PanelConfig::default()
            }
        })
        .unwrap_or_default();

    // ── 4. Network bring-up (blocking startup phase) ──────────
    let peripherals = esp_idf_hal::peripherals::Peripherals::take()?;
    let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;
    let nvs_partition = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;

    let mut wifi = WifiAdapter::new();
    wifi.attach(esp_idf_svc::wifi::BlockingWifi::wrap(
        esp_idf_svc::wifi::EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?,
        sysloop,
    )?);

    let ssid = if config.wifi_ssid.is_empty() {
        WIFI_SSID.unwrap_or("")
    } else {
        config.wifi_ssid.as_str()
    };
    let password = if config.wifi_password.is_empty() {
        WIFI_PASSWORD.unwrap_or("")
    } else {
        config.wifi_password.as_str()
    };

    match wifi
        .set_credentials(ssid, password)
        .and_then(|()| wifi.connect())
    {
        Ok(()) => info!("network up"),
        // The interaction core runs regardless; publishes will just fail.
        Err(e) => warn!("network unavailable ({}), continuing offline", e),
    }

    // SNTP handle must stay alive for the wall clock to sync.
    let _sntp = match time::start_time_sync() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("SNTP start failed ({}), timestamps will be omitted", e);
            None
        }
    };

    // Client creation only fails on a malformed URL; an unreachable broker
    // surfaces later as per-publish failures, which the core tolerates.
    let mut mqtt = MqttPublisher::new(config.broker_url.as_str(), config.device_id.as_str())?;

    // ── 5. Wake decode + panel service ────────────────────────
    let mut sink = LogEventSink::new();
    let mut service = PanelService::new(config.clone());
    service.start(clock.now_ms(), &mut sink);

    if wake_reason == WakeReason::PowerOn {
        led_self_test(&mut hw);
    }

    let wake_button = power::decode_wake(wake_reason, ext1_status).or_else(|| {
        if wake_reason == WakeReason::Ext1Button {
            // Status register can read empty if the press was very short;
            // fall back to the live pin levels.
            power::probe_live_levels(&hw.read_levels())
        } else {
            None
        }
    });

    if let Some(id) = wake_button {
        info!("wake press decoded: {:?}", id);
        service.inject_wake_press(id, &mut hw, &clock, &mut mqtt, &mut sink);
    }

    info!(
        "buttons armed on GPIOs {:?}, active HIGH",
        pins::CHANNELS.map(|ch| ch.button_gpio)
    );

    // ── 6. Poll loop ──────────────────────────────────────────
    loop {
        if let Some(request) = service.tick(&mut hw, &clock, &mut mqtt, &mut sink) {
            info!(
                "inactivity timeout — sleeping (wake mask 0x{:x})",
                request.wake_mask
            );
            // Best-effort teardown; sleep follows regardless.
            wifi.disconnect();
            hw.all_leds_off();
            power::enter_deep_sleep(&pins::CHANNELS);
        }

        watchdog.feed();
        FreeRtos::delay_ms(config.poll_interval_ms);
    }
}

/// Power-on LED sweep: visual confirmation that every channel works.
fn led_self_test(hw: &mut PanelHardware) {
    info!("power-on reset — running LED self-test");
    for id in ButtonId::ALL {
        hw.set_led(id, true);
        FreeRtos::delay_ms(200);
        hw.set_led(id, false);
    }
    info!("LED self-test complete");
}
