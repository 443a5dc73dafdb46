//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers — no closures, no dynamic
//! dispatch, no heap. The latch has exactly two states:
//!
//! ```text
//!  WATCH ──[press dispatched]──▶ HOLD
//!    ▲                             │
//!    └──────[hold window up]───────┘
//! ```
//!
//! While HOLD, the dispatcher drops further presses before they ever reach
//! the context, so `pending` can only be set while watching.

use super::context::LatchContext;
use super::{StateDescriptor, StateId};
use log::info;

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Watch
        StateDescriptor {
            id: StateId::Watch,
            name: "Watch",
            on_enter: None,
            on_exit: None,
            on_update: watch_update,
        },
        // Index 1 — Hold
        StateDescriptor {
            id: StateId::Hold,
            name: "Hold",
            on_enter: Some(hold_enter),
            on_exit: Some(hold_exit),
            on_update: hold_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  WATCH state — idle, waiting for a dispatched press
// ═══════════════════════════════════════════════════════════════════════════

fn watch_update(ctx: &mut LatchContext) -> Option<StateId> {
    if ctx.pending.is_some() {
        return Some(StateId::Hold);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  HOLD state — confirmation LED latched on
// ═══════════════════════════════════════════════════════════════════════════

fn hold_enter(ctx: &mut LatchContext) {
    if let Some(id) = ctx.pending.take() {
        ctx.active = Some(id);
        ctx.held_since_ms = ctx.now_ms;
        ctx.command.lit = Some(id);
        info!("HOLD: latched {:?} for {} ms", id, ctx.hold_ms);
    }
}

fn hold_update(ctx: &mut LatchContext) -> Option<StateId> {
    if ctx.held_elapsed_ms() >= u64::from(ctx.hold_ms) {
        return Some(StateId::Watch);
    }
    None
}

fn hold_exit(ctx: &mut LatchContext) {
    if let Some(id) = ctx.active.take() {
        info!("HOLD: released {:?} after {} ms", id, ctx.held_elapsed_ms());
    }
    ctx.command.lit = None;
}
