//! Confirmation LED driver — four discrete active-high LEDs, one per
//! feedback button.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LED GPIOs via hw_init.
//! On host/test: tracks state in-memory only.

use crate::app::events::ButtonId;
use crate::drivers::hw_init;
use crate::pins;

pub struct FeedbackLeds {
    lit: [bool; ButtonId::COUNT],
}

impl Default for FeedbackLeds {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackLeds {
    /// All LEDs start off.
    pub fn new() -> Self {
        Self {
            lit: [false; ButtonId::COUNT],
        }
    }

    pub fn set(&mut self, id: ButtonId, on: bool) {
        hw_init::gpio_write(pins::channel_for(id).led_gpio, on);
        self.lit[id.index()] = on;
    }

    pub fn all_off(&mut self) {
        for id in ButtonId::ALL {
            self.set(id, false);
        }
    }

    pub fn is_lit(&self, id: ButtonId) -> bool {
        self.lit[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_track_state() {
        let mut leds = FeedbackLeds::new();
        assert!(!leds.is_lit(ButtonId::Good));
        leds.set(ButtonId::Good, true);
        assert!(leds.is_lit(ButtonId::Good));
        leds.all_off();
        for id in ButtonId::ALL {
            assert!(!leds.is_lit(id));
        }
    }
}
