//! Outbound application events and the broker wire format.
//!
//! The [`PanelService`](super::service::PanelService) emits [`AppEvent`]s
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on the
//! other side decide what to do with them — log to serial today, mirror to a
//! display or second broker tomorrow.
//!
//! [`FeedbackEvent`] is the message that actually goes over the wire, one per
//! accepted button press.

use serde::{Deserialize, Serialize};

use crate::error::PublishError;

// ---------------------------------------------------------------------------
// Button identity
// ---------------------------------------------------------------------------

/// The four feedback ratings on the panel face.
///
/// Declaration order doubles as the wake-decode priority order: when more
/// than one wake bit is latched, the first variant whose bit is set wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ButtonId {
    VeryGood = 0,
    Good = 1,
    Bad = 2,
    VeryBad = 3,
}

impl ButtonId {
    /// Total number of buttons — used to size per-channel arrays.
    pub const COUNT: usize = 4;

    /// Every button, in priority order.
    pub const ALL: [ButtonId; Self::COUNT] = [
        ButtonId::VeryGood,
        ButtonId::Good,
        ButtonId::Bad,
        ButtonId::VeryBad,
    ];

    /// Array index for this button (0-3).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The label published to the broker and written to the log.
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryGood => "Very Good button pressed",
            Self::Good => "Good button pressed",
            Self::Bad => "Bad button pressed",
            Self::VeryBad => "Very Bad button pressed",
        }
    }

    /// Inverse of [`label`](Self::label), for consumers parsing payloads.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.label() == label)
    }
}

// ---------------------------------------------------------------------------
// Wire payload
// ---------------------------------------------------------------------------

/// The payload published per accepted press: the button label and a UTC
/// timestamp. When the wall clock has not synchronized yet the timestamp
/// field is omitted entirely rather than sent as a bogus value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub button: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl FeedbackEvent {
    /// Build the payload for `id`, timestamping from `wall_unix_secs` when
    /// the wall clock is available.
    pub fn new(id: ButtonId, wall_unix_secs: Option<u64>) -> Self {
        Self {
            button: id.label().to_owned(),
            timestamp: wall_unix_secs.map(format_utc),
        }
    }

    /// Serialize to the JSON bytes that go over the wire.
    pub fn to_json(&self) -> Result<Vec<u8>, PublishError> {
        serde_json::to_vec(self).map_err(|_| PublishError::Encode)
    }
}

/// Format unix seconds as ISO-8601 UTC: `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_utc(unix_secs: u64) -> String {
    let secs_of_day = unix_secs % 86_400;
    let mut days = unix_secs / 86_400;

    let mut year: u32 = 1970;
    loop {
        let year_days = if is_leap_year(year) { 366 } else { 365 };
        if days < year_days {
            break;
        }
        days -= year_days;
        year += 1;
    }
    let (month, day) = month_day_from_ordinal(days as u32 + 1, is_leap_year(year));

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        secs_of_day / 3600,
        (secs_of_day / 60) % 60,
        secs_of_day % 60,
    )
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Convert a 1-based day-of-year into (month, day-of-month).
fn month_day_from_ordinal(day_of_year: u32, leap: bool) -> (u8, u8) {
    let lengths: [u32; 12] = [
        31,
        if leap { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut remaining = day_of_year;
    for (i, len) in lengths.iter().enumerate() {
        if remaining <= *len {
            return (i as u8 + 1, remaining as u8);
        }
        remaining -= len;
    }
    // Out-of-range ordinal clamps to Dec 31; callers always pass 1-366.
    (12, 31)
}

// ---------------------------------------------------------------------------
// Application events
// ---------------------------------------------------------------------------

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The panel service has started (carries the initial latch state).
    Started(crate::fsm::StateId),

    /// A debounced (or wake-synthesized) press was accepted.
    ButtonPressed { id: ButtonId, synthetic: bool },

    /// A press arrived while feedback was still latched; dropped for
    /// LED/publish purposes (the sleep countdown was still reset).
    PressIgnored { id: ButtonId },

    /// The feedback event was handed to the broker.
    Published { id: ButtonId },

    /// The broker publish failed; the event is not retried.
    PublishFailed { id: ButtonId, error: PublishError },

    /// The feedback latch auto-released after the hold window.
    LatchReleased { id: ButtonId },

    /// The inactivity countdown elapsed; deep sleep is next.
    SleepPending { wake_mask: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_distinct_and_reversible() {
        for id in ButtonId::ALL {
            assert_eq!(ButtonId::from_label(id.label()), Some(id));
        }
        assert_eq!(ButtonId::from_label("Mediocre button pressed"), None);
    }

    #[test]
    fn index_matches_declaration_order() {
        for (i, id) in ButtonId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn payload_is_bit_exact() {
        // 2024-01-05 14:22:31 UTC
        let event = FeedbackEvent::new(ButtonId::VeryGood, Some(1_704_464_551));
        let json = String::from_utf8(event.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"button":"Very Good button pressed","timestamp":"2024-01-05T14:22:31Z"}"#
        );
    }

    #[test]
    fn payload_omits_timestamp_when_clock_unsynced() {
        let event = FeedbackEvent::new(ButtonId::Bad, None);
        let json = String::from_utf8(event.to_json().unwrap()).unwrap();
        assert_eq!(json, r#"{"button":"Bad button pressed"}"#);
    }

    #[test]
    fn payload_round_trips() {
        let original = FeedbackEvent::new(ButtonId::VeryBad, Some(1_700_000_000));
        let parsed: FeedbackEvent = serde_json::from_slice(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(ButtonId::from_label(&parsed.button), Some(ButtonId::VeryBad));
    }

    #[test]
    fn format_utc_epoch() {
        assert_eq!(format_utc(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn format_utc_leap_day() {
        // 2024-02-29 12:00:00 UTC
        assert_eq!(format_utc(1_709_208_000), "2024-02-29T12:00:00Z");
    }

    #[test]
    fn format_utc_year_boundary() {
        // 2023-12-31 23:59:59 UTC
        assert_eq!(format_utc(1_704_067_199), "2023-12-31T23:59:59Z");
    }
}
