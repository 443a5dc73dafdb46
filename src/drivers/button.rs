//! Level-polling debouncer, one instance per panel button.
//!
//! ## Hardware
//!
//! Active-high momentary switch with RTC pulldown bias: idle LOW, pressed
//! HIGH. The main loop samples the raw pin level every poll tick and feeds
//! it into [`Debouncer::poll`].
//!
//! ## Algorithm
//!
//! A raw-level change only starts a timer; nothing is reported until the new
//! level has held steady for the full debounce window AND differs from the
//! last committed stable level. Press commits emit [`Edge::Rising`]; release
//! commits emit [`Edge::Falling`], which the dispatcher ignores — only rising
//! edges drive application logic.

/// A committed stable-level transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// LOW → HIGH: the button was pressed.
    Rising,
    /// HIGH → LOW: the button was released.
    Falling,
}

/// Per-button debounce state.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    debounce_ms: u32,
    /// Raw level currently being observed.
    raw: bool,
    /// Last committed stable level.
    stable: bool,
    /// Timestamp (ms) when the current raw level first appeared.
    changed_at_ms: u64,
}

impl Debouncer {
    /// Buttons start LOW (pulled down, not pressed).
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            raw: false,
            stable: false,
            changed_at_ms: 0,
        }
    }

    /// Feed one raw sample. Returns a committed edge, if any.
    ///
    /// Called once per button per poll tick; `now_ms` is monotonic.
    pub fn poll(&mut self, raw_high: bool, now_ms: u64) -> Option<Edge> {
        if raw_high != self.raw {
            // Level changed — restart the settle timer, report nothing yet.
            self.raw = raw_high;
            self.changed_at_ms = now_ms;
            return None;
        }

        if raw_high != self.stable
            && now_ms.wrapping_sub(self.changed_at_ms) >= u64::from(self.debounce_ms)
        {
            self.stable = raw_high;
            return Some(if raw_high { Edge::Rising } else { Edge::Falling });
        }

        None
    }

    /// Last committed stable level (true = pressed).
    pub fn is_pressed(&self) -> bool {
        self.stable
    }
}
