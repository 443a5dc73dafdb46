//! Shared mutable context threaded through every latch handler.
//!
//! `LatchContext` is the single struct that state handlers read from and
//! write to: the current tick's monotonic time, the press pending dispatch,
//! the latched channel, and the LED command output the service applies after
//! each tick.

use crate::app::events::ButtonId;

// ---------------------------------------------------------------------------
// LED commands (written by state handlers; applied by the service)
// ---------------------------------------------------------------------------

/// Which confirmation LED, if any, should currently be lit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedCommand {
    pub lit: Option<ButtonId>,
}

// ---------------------------------------------------------------------------
// LatchContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct LatchContext {
    // -- Timing --
    /// Monotonic time of the current tick (ms). Updated before each FSM tick.
    pub now_ms: u64,
    /// When the current hold began (ms). Valid only while holding.
    pub held_since_ms: u64,
    /// How long a hold lasts before auto-release (ms).
    pub hold_ms: u32,

    // -- Dispatch --
    /// Press accepted by the dispatcher this tick, awaiting latch pickup.
    pub pending: Option<ButtonId>,
    /// Channel currently latched. `Some` iff the latch state is `Hold`.
    pub active: Option<ButtonId>,

    // -- Outputs --
    /// LED command applied by the service after the FSM tick.
    pub command: LedCommand,

    // -- Engine bookkeeping --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
}

impl LatchContext {
    pub fn new(hold_ms: u32) -> Self {
        Self {
            now_ms: 0,
            held_since_ms: 0,
            hold_ms,
            pending: None,
            active: None,
            command: LedCommand::default(),
            ticks_in_state: 0,
            total_ticks: 0,
        }
    }

    /// Milliseconds the latch has been holding at the current tick.
    pub fn held_elapsed_ms(&self) -> u64 {
        self.now_ms.wrapping_sub(self.held_since_ms)
    }
}
