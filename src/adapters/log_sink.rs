//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to the
//! logger (UART / USB-CDC in production). A future MQTT or display adapter
//! would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::ButtonPressed { id, synthetic } => {
                info!(
                    "PRESS | {:?}{}",
                    id,
                    if *synthetic { " (wake)" } else { "" }
                );
            }
            AppEvent::PressIgnored { id } => {
                info!("PRESS | {:?} ignored (feedback latched)", id);
            }
            AppEvent::Published { id } => {
                info!("PUBLISH | {:?} delivered", id);
            }
            AppEvent::PublishFailed { id, error } => {
                warn!("PUBLISH | {:?} failed: {}", id, error);
            }
            AppEvent::LatchReleased { id } => {
                info!("LATCH | {:?} released", id);
            }
            AppEvent::SleepPending { wake_mask } => {
                info!("SLEEP | countdown elapsed, wake_mask=0x{:x}", wake_mask);
            }
        }
    }
}
