//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the LED driver and the button GPIOs, exposing them through
//! [`InputPort`] and [`LedPort`]. This is the only module in the system that
//! touches actual pins. On non-espidf targets the underlying driver calls
//! are cfg-gated simulation stubs.

use crate::app::events::ButtonId;
use crate::app::ports::{InputPort, LedPort};
use crate::drivers::feedback_led::FeedbackLeds;
use crate::drivers::hw_init;
use crate::pins;

/// Concrete adapter that combines all panel hardware behind port traits.
pub struct PanelHardware {
    leds: FeedbackLeds,
}

impl Default for PanelHardware {
    fn default() -> Self {
        Self::new(FeedbackLeds::new())
    }
}

impl PanelHardware {
    pub fn new(leds: FeedbackLeds) -> Self {
        Self { leds }
    }

    pub fn leds(&self) -> &FeedbackLeds {
        &self.leds
    }
}

// ── InputPort implementation ──────────────────────────────────

impl InputPort for PanelHardware {
    fn read_levels(&mut self) -> [bool; ButtonId::COUNT] {
        let mut levels = [false; ButtonId::COUNT];
        for ch in &pins::CHANNELS {
            levels[ch.id.index()] = hw_init::gpio_read(ch.button_gpio);
        }
        levels
    }
}

// ── LedPort implementation ────────────────────────────────────

impl LedPort for PanelHardware {
    fn set_led(&mut self, id: ButtonId, on: bool) {
        self.leds.set(id, on);
    }

    fn all_leds_off(&mut self) {
        self.leds.all_off();
    }
}
