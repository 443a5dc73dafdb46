//! One-shot hardware peripheral initialization.
//!
//! Configures the four button inputs (pulldown bias, active HIGH) and the
//! four LED outputs using raw ESP-IDF sys calls. Called once from `main()`
//! before the poll loop starts. On non-espidf targets every function is a
//! simulation stub so the library compiles and tests on the host.

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    use esp_idf_svc::sys::*;

    // SAFETY: called once from main() before the poll loop; single-threaded.
    unsafe {
        for ch in &pins::CHANNELS {
            // Button: input, pulldown so the idle level is a defined LOW.
            check(gpio_set_direction(
                ch.button_gpio,
                gpio_mode_t_GPIO_MODE_INPUT,
            ))?;
            check(gpio_set_pull_mode(
                ch.button_gpio,
                gpio_pull_mode_t_GPIO_PULLDOWN_ONLY,
            ))?;

            // LED: plain push-pull output, starting off.
            check(gpio_set_direction(
                ch.led_gpio,
                gpio_mode_t_GPIO_MODE_OUTPUT,
            ))?;
            check(gpio_set_level(ch.led_gpio, 0))?;
        }
    }
    log::info!("hw_init: {} channels configured", pins::CHANNELS.len());
    Ok(())
}

#[cfg(target_os = "espidf")]
fn check(rc: i32) -> Result<(), HwInitError> {
    if rc == esp_idf_svc::sys::ESP_OK {
        Ok(())
    } else {
        Err(HwInitError::GpioConfigFailed(rc))
    }
}

/// Read a GPIO level (true = HIGH).
#[cfg(target_os = "espidf")]
pub fn gpio_read(gpio: i32) -> bool {
    // SAFETY: plain register read on a configured input pin.
    unsafe { esp_idf_svc::sys::gpio_get_level(gpio) != 0 }
}

/// Drive a GPIO level.
#[cfg(target_os = "espidf")]
pub fn gpio_write(gpio: i32, high: bool) {
    // SAFETY: plain register write on a configured output pin.
    unsafe {
        esp_idf_svc::sys::gpio_set_level(gpio, u32::from(high));
    }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): no-op");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_gpio: i32) -> bool {
    false
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_gpio: i32, _high: bool) {}
