//! Port traits — the hexagonal boundary between domain logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PanelService (domain)
//! ```
//!
//! Driven adapters (GPIO, clock, broker client, storage, log sink) implement
//! these traits. The [`PanelService`](super::service::PanelService) consumes
//! them via generics, so the domain core never touches hardware directly.

use crate::app::events::{AppEvent, ButtonId};
use crate::config::PanelConfig;
use crate::error::PublishError;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: timers → domain)
// ───────────────────────────────────────────────────────────────

/// Time queries. The monotonic clock drives every countdown and debounce
/// window; the wall clock is best-effort and only stamps publish payloads.
pub trait ClockPort {
    /// Milliseconds since boot (monotonic).
    fn now_ms(&self) -> u64;

    /// Unix seconds, or `None` until the time service has synchronized.
    /// Callers must tolerate `None` without skipping LED/countdown work.
    fn wall_unix_secs(&self) -> Option<u64>;
}

// ───────────────────────────────────────────────────────────────
// Input / LED ports (driven adapters: hardware ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: raw button levels, one sample per poll tick.
pub trait InputPort {
    /// Raw pin levels in [`ButtonId`] order (true = HIGH = pressed).
    fn read_levels(&mut self) -> [bool; ButtonId::COUNT];
}

/// Write-side port: the four confirmation LEDs.
pub trait LedPort {
    /// Drive one channel's LED.
    fn set_led(&mut self, id: ButtonId, on: bool);

    /// Kill every LED — safe shutdown before sleep.
    fn all_leds_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Publish port (driven adapter: domain → broker)
// ───────────────────────────────────────────────────────────────

/// Hands one serialized feedback event to the broker. At-most-once: a
/// failure is reported to the caller and never retried here.
pub trait PublishPort {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port. Adapters
/// decide where they go (serial log today).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists panel configuration.
///
/// Implementations MUST validate config values before persisting. Invalid
/// ranges are rejected with [`ConfigError::ValidationFailed`], not silently
/// clamped — a hold window longer than the sleep countdown would leave an
/// LED latched on into deep sleep.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    fn load(&self) -> Result<PanelConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &PanelConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
