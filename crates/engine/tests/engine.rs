//! Integration tests for the automation engine.
//!
//! All tests run on tokio's paused clock, so timer behavior is exact and
//! the suite finishes in milliseconds of real time. The platform seams are
//! replaced with recording fakes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tappet_engine::{AutomationEngine, ClickSettings, Phase};
use tappet_input::{InjectedPoint, NativePoint, PermissionGate, PointerDevice, PointerError};
use tokio::time::{self, Instant};

// =============================================================================
// Fakes
// =============================================================================

struct FakeGate {
    denied: AtomicBool,
    requests: AtomicUsize,
}

impl FakeGate {
    fn granted() -> Arc<Self> {
        Arc::new(Self {
            denied: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        })
    }

    fn denied() -> Arc<Self> {
        Arc::new(Self {
            denied: AtomicBool::new(true),
            requests: AtomicUsize::new(0),
        })
    }

    fn revoke(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionGate for FakeGate {
    fn is_authorized(&self) -> bool {
        !self.denied.load(Ordering::SeqCst)
    }

    fn request_authorization(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy)]
struct Recorded {
    action: Action,
    at: InjectedPoint,
    /// Offset from pointer creation, on the virtual clock.
    offset: Duration,
}

struct FakePointer {
    origin: Instant,
    cursor: Mutex<NativePoint>,
    cursor_available: AtomicBool,
    display_height: f64,
    recorded: Mutex<Vec<Recorded>>,
}

impl FakePointer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            cursor: Mutex::new(NativePoint::new(640.0, 360.0)),
            cursor_available: AtomicBool::new(true),
            display_height: 900.0,
            recorded: Mutex::new(Vec::new()),
        })
    }

    fn set_cursor(&self, position: NativePoint) {
        *self.cursor.lock().unwrap() = position;
    }

    fn set_cursor_available(&self, available: bool) {
        self.cursor_available.store(available, Ordering::SeqCst);
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    fn record(&self, action: Action, at: InjectedPoint) {
        self.recorded.lock().unwrap().push(Recorded {
            action,
            at,
            offset: Instant::now().duration_since(self.origin),
        });
    }

    /// Recorded events grouped as (press, release) pairs, asserting the
    /// recording alternates.
    fn pairs(&self) -> Vec<(Recorded, Recorded)> {
        let recorded = self.recorded();
        assert!(recorded.len() % 2 == 0, "unpaired press/release: {recorded:?}");
        recorded
            .chunks(2)
            .map(|pair| {
                assert_eq!(pair[0].action, Action::Press);
                assert_eq!(pair[1].action, Action::Release);
                (pair[0], pair[1])
            })
            .collect()
    }
}

impl PointerDevice for FakePointer {
    fn cursor_position(&self) -> Option<NativePoint> {
        self.cursor_available
            .load(Ordering::SeqCst)
            .then(|| *self.cursor.lock().unwrap())
    }

    fn display_height(&self) -> Option<f64> {
        Some(self.display_height)
    }

    fn press(&self, at: InjectedPoint) -> Result<(), PointerError> {
        self.record(Action::Press, at);
        Ok(())
    }

    fn release(&self, at: InjectedPoint) -> Result<(), PointerError> {
        self.record(Action::Release, at);
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Delay-free settings: 3 click pairs at 0/100/200 ms, completion at the
/// first budget check past 250 ms.
fn fast_settings() -> ClickSettings {
    ClickSettings {
        start_delay: Duration::ZERO,
        total_duration: ms(250),
        click_interval: ms(100),
        click_dwell: ms(10),
    }
}

fn spawn_engine(gate: &Arc<FakeGate>, pointer: &Arc<FakePointer>) -> AutomationEngine {
    AutomationEngine::spawn(gate.clone(), pointer.clone())
}

// =============================================================================
// Arming
// =============================================================================

mod arming {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_a_no_op() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.stop();
        time::sleep(ms(10)).await;

        let status = engine.status();
        assert_eq!(status.phase, Phase::Idle);
        assert_eq!(status.remaining, Duration::ZERO);
        assert!(pointer.recorded().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_gate_never_arms_and_requests_once() {
        let (gate, pointer) = (FakeGate::denied(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(fast_settings());
        time::sleep(ms(500)).await;

        assert_eq!(engine.status().phase, Phase::Idle);
        assert_eq!(gate.requests(), 1);
        assert!(pointer.recorded().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_keeps_the_armed_run() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(ClickSettings {
            start_delay: ms(500),
            total_duration: ms(2000),
            ..fast_settings()
        });
        time::sleep(ms(10)).await;
        assert_eq!(engine.status().phase, Phase::Waiting);
        assert_eq!(engine.status().remaining, ms(2000));

        // A second start while armed must not reschedule anything.
        engine.start(ClickSettings {
            start_delay: Duration::ZERO,
            total_duration: ms(9000),
            ..fast_settings()
        });
        time::sleep(ms(10)).await;
        assert_eq!(engine.status().phase, Phase::Waiting);
        assert_eq!(engine.status().remaining, ms(2000));

        // No delay-free first click from the rejected second start.
        time::sleep(ms(100)).await;
        assert!(pointer.recorded().is_empty());

        // The original delay still governs the first click.
        time::sleep(ms(400)).await;
        assert_eq!(pointer.pairs().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_click_before_the_start_delay() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(ClickSettings {
            start_delay: ms(300),
            ..fast_settings()
        });

        time::sleep(ms(200)).await;
        assert_eq!(engine.status().phase, Phase::Waiting);
        assert!(pointer.recorded().is_empty());

        time::sleep(ms(150)).await;
        assert_eq!(engine.status().phase, Phase::Running);
        assert_eq!(pointer.pairs().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_the_delay_cancels_the_run() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(ClickSettings {
            start_delay: ms(300),
            ..fast_settings()
        });
        time::sleep(ms(100)).await;
        engine.stop();
        time::sleep(ms(500)).await;

        assert_eq!(engine.status().phase, Phase::Idle);
        assert_eq!(engine.status().remaining, Duration::ZERO);
        assert!(pointer.recorded().is_empty());
    }
}

// =============================================================================
// Clicking
// =============================================================================

mod clicking {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cadence_emits_exact_click_pairs() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(fast_settings());
        time::sleep(ms(320)).await;

        assert_eq!(engine.status().phase, Phase::Completed);

        let pairs = pointer.pairs();
        assert_eq!(pairs.len(), 3);
        let expected = NativePoint::new(640.0, 360.0).to_injected(900.0);
        for (index, (press, release)) in pairs.iter().enumerate() {
            let base = ms(100 * index as u64);
            assert_eq!(press.offset, base);
            assert_eq!(release.offset, base + ms(10));
            assert_eq!(press.at, expected);
            assert_eq!(release.at, expected);
        }

        // Grace period expires and the engine parks itself back in idle.
        time::sleep(ms(600)).await;
        assert_eq!(engine.status().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_pins_the_point_sampled_at_press() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(fast_settings());

        // Move the cursor between pairs: the second pair must re-sample.
        time::sleep(ms(50)).await;
        pointer.set_cursor(NativePoint::new(100.0, 100.0));

        // Move it again mid-dwell of the second pair: its release must
        // still carry the coordinates sampled at its press.
        time::sleep(ms(55)).await;
        pointer.set_cursor(NativePoint::new(999.0, 999.0));

        time::sleep(ms(215)).await;

        let pairs = pointer.pairs();
        assert_eq!(pairs.len(), 3);

        let first = NativePoint::new(640.0, 360.0).to_injected(900.0);
        let second = NativePoint::new(100.0, 100.0).to_injected(900.0);
        let third = NativePoint::new(999.0, 999.0).to_injected(900.0);
        assert_eq!((pairs[0].0.at, pairs[0].1.at), (first, first));
        assert_eq!((pairs[1].0.at, pairs[1].1.at), (second, second));
        assert_eq!((pairs[2].0.at, pairs[2].1.at), (third, third));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_failure_skips_the_tick_but_run_continues() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(fast_settings());

        time::sleep(ms(30)).await;
        pointer.set_cursor_available(false);
        time::sleep(ms(100)).await;
        pointer.set_cursor_available(true);

        // Still running: a missed sample is a skipped tick, not a stop.
        assert_eq!(engine.status().phase, Phase::Running);

        time::sleep(ms(190)).await;
        assert_eq!(engine.status().phase, Phase::Completed);

        let pairs = pointer.pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.offset, ms(0));
        assert_eq!(pairs[1].0.offset, ms(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_shorter_than_one_interval_clicks_once() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(ClickSettings {
            total_duration: ms(50),
            ..fast_settings()
        });
        time::sleep(ms(200)).await;

        // Only the immediate entry click fits in the budget; the first
        // countdown poll past 50 ms completes the run.
        assert_eq!(pointer.pairs().len(), 1);
        assert_eq!(engine.status().phase, Phase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_completes_without_clicking() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(ClickSettings {
            total_duration: Duration::ZERO,
            ..fast_settings()
        });
        time::sleep(ms(10)).await;

        // The entry click's budget check trips immediately.
        assert!(pointer.recorded().is_empty());
        assert_eq!(engine.status().phase, Phase::Completed);

        time::sleep(ms(600)).await;
        assert_eq!(engine.status().phase, Phase::Idle);
    }
}

// =============================================================================
// Permission loss
// =============================================================================

mod permissions {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_revocation_mid_run_halts_and_requests_once() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(ClickSettings {
            total_duration: ms(10_000),
            ..fast_settings()
        });

        time::sleep(ms(50)).await;
        assert_eq!(pointer.pairs().len(), 1);
        gate.revoke();

        time::sleep(ms(100)).await;

        // No second click, immediate idle, exactly one re-request.
        assert_eq!(pointer.pairs().len(), 1);
        assert_eq!(engine.status().phase, Phase::Idle);
        assert_eq!(engine.status().remaining, Duration::ZERO);
        assert_eq!(gate.requests(), 1);

        // All timers are down: the published state never moves again.
        let settled = engine.status();
        time::sleep(ms(1000)).await;
        assert_eq!(engine.status(), settled);
        assert_eq!(gate.requests(), 1);
    }
}

// =============================================================================
// Completion
// =============================================================================

mod completion {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completed_auto_resets_after_grace() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(fast_settings());
        time::sleep(ms(400)).await;
        assert_eq!(engine.status().phase, Phase::Completed);

        time::sleep(ms(500)).await;
        assert_eq!(engine.status().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_during_grace_survives_the_pending_reset() {
        let (gate, pointer) = (FakeGate::granted(), FakePointer::new());
        let engine = spawn_engine(&gate, &pointer);

        engine.start(ClickSettings {
            total_duration: ms(50),
            ..fast_settings()
        });
        time::sleep(ms(150)).await;
        assert_eq!(engine.status().phase, Phase::Completed);

        // Re-arm inside the grace window; the pending reset must not
        // clobber the fresh run.
        engine.start(ClickSettings {
            start_delay: ms(5000),
            ..fast_settings()
        });
        time::sleep(ms(10)).await;
        assert_eq!(engine.status().phase, Phase::Waiting);

        time::sleep(ms(600)).await;
        assert_eq!(engine.status().phase, Phase::Waiting);
    }
}
