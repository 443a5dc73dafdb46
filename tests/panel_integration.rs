//! Integration tests: PanelService → latch → LEDs/publish against mock
//! adapters. All tests run on the host with no real hardware required.

use std::cell::Cell;

use moodpanel::app::events::{AppEvent, ButtonId, FeedbackEvent};
use moodpanel::app::ports::{ClockPort, EventSink, InputPort, LedPort, PublishPort};
use moodpanel::app::service::PanelService;
use moodpanel::config::PanelConfig;
use moodpanel::error::PublishError;
use moodpanel::fsm::StateId;
use moodpanel::pins;
use moodpanel::power::{self, WakeReason};

// ── Mock implementations ──────────────────────────────────────

struct MockClock {
    now: Cell<u64>,
    wall: Cell<Option<u64>>,
}

impl MockClock {
    fn new() -> Self {
        Self {
            now: Cell::new(0),
            wall: Cell::new(Some(1_704_464_551)), // 2024-01-05T14:22:31Z
        }
    }
}

impl ClockPort for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
    fn wall_unix_secs(&self) -> Option<u64> {
        self.wall.get()
    }
}

#[derive(Default)]
struct MockHw {
    levels: [bool; ButtonId::COUNT],
    leds: [bool; ButtonId::COUNT],
}

impl InputPort for MockHw {
    fn read_levels(&mut self) -> [bool; ButtonId::COUNT] {
        self.levels
    }
}

impl LedPort for MockHw {
    fn set_led(&mut self, id: ButtonId, on: bool) {
        self.leds[id.index()] = on;
    }
    fn all_leds_off(&mut self) {
        self.leds = [false; ButtonId::COUNT];
    }
}

#[derive(Default)]
struct MockBroker {
    published: Vec<(String, String)>,
    fail_next: bool,
}

impl PublishPort for MockBroker {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(PublishError::NotConnected);
        }
        self.published.push((
            topic.to_owned(),
            String::from_utf8(payload.to_vec()).expect("payload is UTF-8 JSON"),
        ));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Test rig ──────────────────────────────────────────────────

const POLL_MS: u64 = 10;

struct Panel {
    svc: PanelService,
    hw: MockHw,
    clock: MockClock,
    broker: MockBroker,
    sink: RecordingSink,
    slept: Option<u64>,
}

impl Panel {
    fn boot() -> Self {
        let mut svc = PanelService::new(PanelConfig::default());
        let mut sink = RecordingSink::default();
        svc.start(0, &mut sink);
        Self {
            svc,
            hw: MockHw::default(),
            clock: MockClock::new(),
            broker: MockBroker::default(),
            sink,
            slept: None,
        }
    }

    /// Run the poll loop for `ms`, stopping the clock if sleep fires
    /// (deep sleep never returns on hardware).
    fn run_ms(&mut self, ms: u64) {
        let end = self.clock.now.get() + ms;
        while self.clock.now.get() < end && self.slept.is_none() {
            self.clock.now.set(self.clock.now.get() + POLL_MS);
            if let Some(req) = self.svc.tick(
                &mut self.hw,
                &self.clock,
                &mut self.broker,
                &mut self.sink,
            ) {
                self.slept = Some(req.wake_mask);
            }
        }
    }

    fn press_and_release(&mut self, id: ButtonId) {
        self.hw.levels[id.index()] = true;
        self.run_ms(100);
        self.hw.levels[id.index()] = false;
        self.run_ms(100);
    }
}

// ── End-to-end scenario: cold boot → press → release → sleep ──

#[test]
fn cold_boot_press_latch_release_sleep() {
    let mut panel = Panel::boot();

    // Cold boot: no synthetic press, nothing published, countdown running.
    assert_eq!(power::decode_wake(WakeReason::PowerOn, 0), None);
    assert_eq!(panel.svc.state(), StateId::Watch);

    // Quiet until t = 2 s.
    panel.run_ms(2_000);
    assert!(panel.broker.published.is_empty());

    // Press "Bad" at t = 2 s: LED on, payload published, countdown reset.
    panel.press_and_release(ButtonId::Bad);
    assert!(panel.hw.leds[ButtonId::Bad.index()]);
    assert_eq!(panel.broker.published.len(), 1);
    let (topic, payload) = &panel.broker.published[0];
    assert_eq!(topic, "feedback/panel-01");
    assert_eq!(
        payload,
        r#"{"button":"Bad button pressed","timestamp":"2024-01-05T14:22:31Z"}"#
    );

    // Latch auto-releases ~7 s after the press; LED goes off.
    panel.run_ms(7_000);
    assert!(!panel.hw.leds[ButtonId::Bad.index()]);
    assert_eq!(panel.svc.state(), StateId::Watch);

    // No further input: the device sleeps ~15 s after the press, with all
    // four wake sources armed.
    panel.run_ms(8_000);
    let mask = panel.slept.expect("device should have gone to sleep");
    assert_eq!(mask, pins::wake_mask());
    assert_eq!(mask.count_ones() as usize, ButtonId::COUNT);
    assert!(panel
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::SleepPending { .. })));
}

// ── Latch gating ──────────────────────────────────────────────

#[test]
fn only_active_channel_lights_and_publishes_while_held() {
    let mut panel = Panel::boot();
    panel.press_and_release(ButtonId::VeryGood);

    // Hammer every other button while the latch is held.
    for id in [ButtonId::Good, ButtonId::Bad, ButtonId::VeryBad] {
        panel.press_and_release(id);
    }

    assert_eq!(panel.broker.published.len(), 1);
    assert!(panel.hw.leds[ButtonId::VeryGood.index()]);
    for id in [ButtonId::Good, ButtonId::Bad, ButtonId::VeryBad] {
        assert!(!panel.hw.leds[id.index()], "{:?} LED must stay off", id);
        assert!(panel
            .sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::PressIgnored { id: ignored } if *ignored == id)));
    }
}

#[test]
fn gated_presses_still_reset_the_countdown() {
    let mut panel = Panel::boot();
    panel.press_and_release(ButtonId::VeryGood);

    // Keep pressing (gated) every 3 s; the device must stay awake.
    for _ in 0..4 {
        panel.run_ms(3_000);
        panel.press_and_release(ButtonId::Bad);
    }
    assert!(panel.slept.is_none());

    // Silence after the last (gated) press: sleep ~15 s later.
    panel.run_ms(15_200);
    assert!(panel.slept.is_some());
}

// ── Countdown reset idempotence ───────────────────────────────

#[test]
fn n_presses_always_measure_countdown_from_the_last() {
    let mut panel = Panel::boot();

    for _ in 0..5 {
        panel.run_ms(8_000); // release the latch, stay short of 15 s
        panel.press_and_release(ButtonId::Good);
        assert!(panel.slept.is_none(), "countdown must restart on each press");
    }

    panel.run_ms(15_200);
    assert!(panel.slept.is_some());
}

// ── Publish failure handling ──────────────────────────────────

#[test]
fn publish_failure_is_logged_not_retried() {
    let mut panel = Panel::boot();
    panel.broker.fail_next = true;
    panel.press_and_release(ButtonId::VeryBad);

    assert!(panel.broker.published.is_empty());
    assert!(panel.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::PublishFailed {
            id: ButtonId::VeryBad,
            error: PublishError::NotConnected
        }
    )));
    // The LED feedback happened anyway, and the loop keeps running.
    assert!(panel.hw.leds[ButtonId::VeryBad.index()]);
    panel.run_ms(1_000);
    assert!(panel.broker.published.is_empty(), "no retry");
}

// ── Degraded wall clock ───────────────────────────────────────

#[test]
fn unsynced_wall_clock_omits_timestamp_field() {
    let mut panel = Panel::boot();
    panel.clock.wall.set(None);
    panel.press_and_release(ButtonId::Good);

    let (_, payload) = &panel.broker.published[0];
    assert_eq!(payload, r#"{"button":"Good button pressed"}"#);
    let parsed: FeedbackEvent = serde_json::from_str(payload).unwrap();
    assert_eq!(parsed.timestamp, None);
    assert_eq!(ButtonId::from_label(&parsed.button), Some(ButtonId::Good));
}

// ── Wake-from-sleep path ──────────────────────────────────────

#[test]
fn wake_press_behaves_like_a_live_press() {
    let mut panel = Panel::boot();

    let decoded = power::decode_wake(
        WakeReason::Ext1Button,
        pins::channel_for(ButtonId::Good).wake_bit(),
    )
    .expect("single wake bit must decode");
    panel.svc.inject_wake_press(
        decoded,
        &mut panel.hw,
        &panel.clock,
        &mut panel.broker,
        &mut panel.sink,
    );

    assert!(panel.hw.leds[ButtonId::Good.index()]);
    assert_eq!(panel.broker.published.len(), 1);
    assert!(panel
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::ButtonPressed { synthetic: true, .. })));

    // Wake press participates in the normal lifecycle: release then sleep.
    panel.run_ms(7_100);
    assert!(!panel.hw.leds[ButtonId::Good.index()]);
    panel.run_ms(8_000);
    assert!(panel.slept.is_some());
}

#[test]
fn ambiguous_wake_resolves_to_priority_order() {
    let status = pins::channel_for(ButtonId::VeryGood).wake_bit()
        | pins::channel_for(ButtonId::Bad).wake_bit();
    assert_eq!(
        power::decode_wake(WakeReason::Ext1Button, status),
        Some(ButtonId::VeryGood)
    );
}

// ── Sleep arming boundary ─────────────────────────────────────

#[test]
fn sleep_request_fires_exactly_once_per_cycle() {
    let mut svc = PanelService::new(PanelConfig::default());
    let mut sink = RecordingSink::default();
    let mut hw = MockHw::default();
    let clock = MockClock::new();
    let mut broker = MockBroker::default();
    svc.start(0, &mut sink);

    let mut requests = 0;
    for _ in 0..3_000 {
        clock.now.set(clock.now.get() + POLL_MS);
        if svc.tick(&mut hw, &clock, &mut broker, &mut sink).is_some() {
            requests += 1;
        }
    }
    // 30 s of ticking past the 15 s deadline: still a single request.
    assert_eq!(requests, 1);
}
