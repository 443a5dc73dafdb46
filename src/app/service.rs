//! Panel service — the hexagonal core.
//!
//! [`PanelService`] owns the per-button debouncers, the feedback latch FSM,
//! and the inactivity countdown. It exposes a clean, hardware-agnostic API;
//! all I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!   InputPort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!   ClockPort ──▶ │        PanelService          │ ──▶ PublishPort
//!                 │  debounce · latch · countdown │
//!     LedPort ◀── └─────────────────────────────┘
//! ```
//!
//! Per tick: sample raw levels → debounce → dispatch accepted presses →
//! advance the latch → apply LED commands → check the sleep countdown.

use core::fmt::Write as _;

use log::{info, warn};

use crate::config::PanelConfig;
use crate::drivers::button::{Debouncer, Edge};
use crate::fsm::context::LatchContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::pins;
use crate::power::{SleepDeadline, SleepRequest};

use super::events::{AppEvent, ButtonId, FeedbackEvent};
use super::ports::{ClockPort, EventSink, InputPort, LedPort, PublishPort};

// ───────────────────────────────────────────────────────────────
// PanelService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct PanelService {
    fsm: Fsm,
    ctx: LatchContext,
    debouncers: [Debouncer; ButtonId::COUNT],
    deadline: SleepDeadline,
    /// Set once the countdown has fired; cleared by the next accepted press.
    /// Guarantees a single sleep request per countdown cycle even when the
    /// loop ticks faster than the countdown resolution.
    sleep_armed: bool,
    /// LED state last applied to hardware, to avoid redundant port calls.
    last_lit: Option<ButtonId>,
    config: PanelConfig,
    tick_count: u64,
}

impl PanelService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the latch — call [`start`](Self::start) next.
    pub fn new(config: PanelConfig) -> Self {
        let ctx = LatchContext::new(config.led_hold_ms);
        let fsm = Fsm::new(build_state_table(), StateId::Watch);
        let debouncers = [Debouncer::new(config.debounce_ms); ButtonId::COUNT];
        let deadline = SleepDeadline::new(config.sleep_timeout_ms, 0);

        Self {
            fsm,
            ctx,
            debouncers,
            deadline,
            sleep_armed: false,
            last_lit: None,
            config,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the latch and the inactivity countdown.
    ///
    /// The countdown starts at full duration so an untouched device still
    /// goes back to sleep.
    pub fn start(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        self.ctx.now_ms = now_ms;
        self.deadline.reset(now_ms);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("panel service started in {:?}", self.fsm.current_state());
    }

    /// Feed the press synthesized by the wake-cause decoder through the
    /// exact same path as a live debounced press: LED latch, publish, and
    /// countdown reset. Call once, between [`start`](Self::start) and the
    /// first [`tick`](Self::tick).
    pub fn inject_wake_press(
        &mut self,
        id: ButtonId,
        hw: &mut impl LedPort,
        clock: &impl ClockPort,
        publisher: &mut impl PublishPort,
        sink: &mut impl EventSink,
    ) {
        self.ctx.now_ms = clock.now_ms();
        self.dispatch(id, true, clock, publisher, sink);
        self.fsm.tick(&mut self.ctx);
        self.apply_leds(hw);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full poll cycle. Returns `Some(SleepRequest)` exactly once
    /// per elapsed countdown; the caller then tears down the link and enters
    /// deep sleep.
    pub fn tick(
        &mut self,
        hw: &mut (impl InputPort + LedPort),
        clock: &impl ClockPort,
        publisher: &mut impl PublishPort,
        sink: &mut impl EventSink,
    ) -> Option<SleepRequest> {
        self.tick_count += 1;
        let now = clock.now_ms();
        self.ctx.now_ms = now;

        // 1. Sample and debounce every channel; dispatch rising edges in
        //    priority order.
        let levels = hw.read_levels();
        for id in ButtonId::ALL {
            if let Some(Edge::Rising) = self.debouncers[id.index()].poll(levels[id.index()], now) {
                self.dispatch(id, false, clock, publisher, sink);
            }
        }

        // 2. Advance the latch (auto-release is time-driven).
        let held_before = self.ctx.active;
        let state_before = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);

        if state_before == StateId::Hold && self.fsm.current_state() == StateId::Watch {
            if let Some(id) = held_before {
                sink.emit(&AppEvent::LatchReleased { id });
            }
        }

        // 3. Apply LED commands.
        self.apply_leds(hw);

        // 4. Inactivity countdown.
        if !self.sleep_armed && self.deadline.expired(now) {
            self.sleep_armed = true;
            let request = SleepRequest {
                wake_mask: pins::wake_mask(),
            };
            sink.emit(&AppEvent::SleepPending {
                wake_mask: request.wake_mask,
            });
            return Some(request);
        }

        None
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current latch state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// True while feedback is latched and new presses are gated off.
    pub fn is_held(&self) -> bool {
        self.fsm.current_state() == StateId::Hold
    }

    /// Milliseconds left on the inactivity countdown.
    pub fn sleep_remaining_ms(&self, now_ms: u64) -> u64 {
        self.deadline.remaining_ms(now_ms)
    }

    /// Total poll ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    /// Route one accepted button identity: reset the countdown, and — unless
    /// feedback is still latched — light the LED and publish the event.
    fn dispatch(
        &mut self,
        id: ButtonId,
        synthetic: bool,
        clock: &impl ClockPort,
        publisher: &mut impl PublishPort,
        sink: &mut impl EventSink,
    ) {
        // Every press restarts the countdown, even ones the latch drops.
        self.deadline.reset(self.ctx.now_ms);
        self.sleep_armed = false;

        if self.fsm.current_state() == StateId::Hold {
            info!("{:?} press ignored while feedback latched", id);
            sink.emit(&AppEvent::PressIgnored { id });
            return;
        }

        info!(
            "{}{}",
            id.label(),
            if synthetic { " (wake press)" } else { "" }
        );
        sink.emit(&AppEvent::ButtonPressed { id, synthetic });

        // Latch pickup happens on this tick's FSM advance.
        self.ctx.pending = Some(id);

        self.publish(id, clock, publisher, sink);
    }

    /// Serialize and hand the event to the broker. At-most-once: failures
    /// are reported and dropped.
    fn publish(
        &mut self,
        id: ButtonId,
        clock: &impl ClockPort,
        publisher: &mut impl PublishPort,
        sink: &mut impl EventSink,
    ) {
        let event = FeedbackEvent::new(id, clock.wall_unix_secs());
        if event.timestamp.is_none() {
            info!("wall clock not synced — publishing without timestamp");
        }

        let mut topic: heapless::String<64> = heapless::String::new();
        let outcome = write!(&mut topic, "feedback/{}", self.config.device_id)
            .map_err(|_| crate::error::PublishError::Encode)
            .and_then(|_| event.to_json())
            .and_then(|payload| publisher.publish(topic.as_str(), &payload));

        match outcome {
            Ok(()) => sink.emit(&AppEvent::Published { id }),
            Err(error) => {
                warn!("publish failed for {:?}: {}", id, error);
                sink.emit(&AppEvent::PublishFailed { id, error });
            }
        }
    }

    /// Translate the latch's LED command into port calls, touching hardware
    /// only on change.
    fn apply_leds(&mut self, hw: &mut impl LedPort) {
        let want = self.ctx.command.lit;
        if want != self.last_lit {
            if let Some(old) = self.last_lit {
                hw.set_led(old, false);
            }
            if let Some(new) = want {
                hw.set_led(new, true);
            }
            self.last_lit = want;
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublishError;
    use std::cell::Cell;

    struct FakeClock {
        now: Cell<u64>,
        wall: Option<u64>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                now: Cell::new(0),
                wall: Some(1_704_464_551),
            }
        }

        fn advance(&self, ms: u64) {
            self.now.set(self.now.get() + ms);
        }
    }

    impl ClockPort for FakeClock {
        fn now_ms(&self) -> u64 {
            self.now.get()
        }
        fn wall_unix_secs(&self) -> Option<u64> {
            self.wall
        }
    }

    #[derive(Default)]
    struct FakeHw {
        levels: [bool; ButtonId::COUNT],
        leds: [bool; ButtonId::COUNT],
    }

    impl InputPort for FakeHw {
        fn read_levels(&mut self) -> [bool; ButtonId::COUNT] {
            self.levels
        }
    }

    impl LedPort for FakeHw {
        fn set_led(&mut self, id: ButtonId, on: bool) {
            self.leds[id.index()] = on;
        }
        fn all_leds_off(&mut self) {
            self.leds = [false; ButtonId::COUNT];
        }
    }

    #[derive(Default)]
    struct FakeBroker {
        published: Vec<(String, Vec<u8>)>,
        fail: bool,
    }

    impl PublishPort for FakeBroker {
        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
            if self.fail {
                return Err(PublishError::Broker);
            }
            self.published.push((topic.to_owned(), payload.to_vec()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        events: Vec<AppEvent>,
    }

    impl EventSink for FakeSink {
        fn emit(&mut self, event: &AppEvent) {
            self.events.push(event.clone());
        }
    }

    struct Rig {
        svc: PanelService,
        hw: FakeHw,
        clock: FakeClock,
        broker: FakeBroker,
        sink: FakeSink,
    }

    fn rig() -> Rig {
        let mut svc = PanelService::new(PanelConfig::default());
        let mut sink = FakeSink::default();
        svc.start(0, &mut sink);
        Rig {
            svc,
            hw: FakeHw::default(),
            clock: FakeClock::new(),
            broker: FakeBroker::default(),
            sink,
        }
    }

    impl Rig {
        fn tick(&mut self) -> Option<SleepRequest> {
            self.svc
                .tick(&mut self.hw, &self.clock, &mut self.broker, &mut self.sink)
        }

        /// Advance in poll-interval steps, ticking each step.
        fn run_ms(&mut self, ms: u64) -> Option<SleepRequest> {
            let step = 10;
            let mut request = None;
            let mut elapsed = 0;
            while elapsed < ms {
                self.clock.advance(step);
                elapsed += step;
                request = self.tick().or(request);
            }
            request
        }

        /// Hold a button down for `ms`, then release and settle.
        fn press(&mut self, id: ButtonId) {
            self.hw.levels[id.index()] = true;
            self.run_ms(100);
            self.hw.levels[id.index()] = false;
            self.run_ms(100);
        }
    }

    #[test]
    fn press_lights_led_and_publishes() {
        let mut r = rig();
        r.press(ButtonId::Bad);

        assert!(r.svc.is_held());
        assert!(r.hw.leds[ButtonId::Bad.index()]);
        assert_eq!(r.broker.published.len(), 1);
        assert_eq!(r.broker.published[0].0, "feedback/panel-01");
        let payload = String::from_utf8(r.broker.published[0].1.clone()).unwrap();
        assert!(payload.contains("Bad button pressed"));
    }

    #[test]
    fn second_press_while_held_is_gated() {
        let mut r = rig();
        r.press(ButtonId::VeryGood);
        r.press(ButtonId::Good);

        // Only the first press published; only its LED lit.
        assert_eq!(r.broker.published.len(), 1);
        assert!(r.hw.leds[ButtonId::VeryGood.index()]);
        assert!(!r.hw.leds[ButtonId::Good.index()]);
        assert!(r
            .sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::PressIgnored { id: ButtonId::Good })));
    }

    #[test]
    fn latch_releases_after_hold_window() {
        let mut r = rig();
        r.press(ButtonId::Good);
        assert!(r.svc.is_held());

        // press() already consumed 200 ms of the 7 s hold.
        r.run_ms(7_000);
        assert!(!r.svc.is_held());
        assert!(!r.hw.leds[ButtonId::Good.index()]);
        assert!(r
            .sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::LatchReleased { id: ButtonId::Good })));
    }

    #[test]
    fn gated_press_still_resets_countdown() {
        let mut r = rig();
        r.press(ButtonId::VeryBad);
        let before = r.svc.sleep_remaining_ms(r.clock.now_ms());

        r.run_ms(3_000);
        r.press(ButtonId::Bad); // gated, but countdown restarts
        let after = r.svc.sleep_remaining_ms(r.clock.now_ms());
        assert!(after > before - 3_000);
        assert_eq!(r.broker.published.len(), 1);
    }

    #[test]
    fn sleep_fires_once_after_timeout() {
        let mut r = rig();
        let request = r.run_ms(15_000).expect("countdown should elapse");
        assert_eq!(request.wake_mask, pins::wake_mask());

        // The loop keeps ticking (e.g. teardown takes a moment) — no re-arm.
        assert_eq!(r.run_ms(1_000), None);
    }

    #[test]
    fn press_after_arm_restarts_cycle() {
        let mut r = rig();
        assert!(r.run_ms(15_000).is_some());
        r.press(ButtonId::Good);
        // Fresh full countdown from the press.
        assert!(r.run_ms(14_000).is_none());
        assert!(r.run_ms(2_000).is_some());
    }

    #[test]
    fn publish_failure_does_not_stop_the_loop() {
        let mut r = rig();
        r.broker.fail = true;
        r.press(ButtonId::VeryGood);

        assert!(r.svc.is_held(), "LED feedback proceeds despite broker error");
        assert!(r.sink.events.iter().any(|e| matches!(
            e,
            AppEvent::PublishFailed {
                id: ButtonId::VeryGood,
                error: PublishError::Broker
            }
        )));
        // Not retried.
        r.run_ms(1_000);
        assert!(r.broker.published.is_empty());
    }

    #[test]
    fn wake_press_follows_live_press_path() {
        let mut r = rig();
        r.svc.inject_wake_press(
            ButtonId::VeryBad,
            &mut r.hw,
            &r.clock,
            &mut r.broker,
            &mut r.sink,
        );

        assert!(r.svc.is_held());
        assert!(r.hw.leds[ButtonId::VeryBad.index()]);
        assert_eq!(r.broker.published.len(), 1);
        assert!(r
            .sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::ButtonPressed { synthetic: true, .. })));
    }

    #[test]
    fn absent_wall_clock_omits_timestamp() {
        let mut r = rig();
        r.clock.wall = None;
        r.press(ButtonId::Bad);
        let payload = String::from_utf8(r.broker.published[0].1.clone()).unwrap();
        assert!(!payload.contains("timestamp"));
    }
}
