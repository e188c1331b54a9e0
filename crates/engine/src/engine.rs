//! The automation engine: state machine and timer orchestration.
//!
//! All run state lives inside a single spawned task that consumes one
//! message stream; commands from the public handle and ticks from the
//! timer tasks land in the same queue, so every phase transition happens
//! on one logical execution context and observers see it atomically.
//! Timers are independently cancelable tasks held in one [`Timers`] set
//! whose shared teardown runs on every exit transition (stop, completion,
//! permission loss).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use tappet_input::{PermissionGate, PointerDevice};

use crate::settings::ClickSettings;
use crate::state::{EngineStatus, Phase};

/// Period of the countdown poll while a run is active. Fixed and
/// independent of the configured cadence.
const DURATION_POLL_PERIOD: Duration = Duration::from_millis(100);

/// How long `Completed` is shown before the engine resets itself to idle.
const COMPLETION_GRACE: Duration = Duration::from_millis(500);

/// Messages consumed by the engine task. `Start`/`Stop`/`Shutdown` come
/// from the public handle, the rest from the timer tasks.
enum Event {
    Start(ClickSettings),
    Stop,
    StartDelayElapsed,
    CadenceTick,
    DurationTick,
    GraceElapsed,
    Shutdown,
}

/// Handle to a running automation engine.
///
/// `start` and `stop` are non-blocking sends; the engine task applies them
/// in order. Dropping the handle shuts the engine down.
pub struct AutomationEngine {
    commands: mpsc::UnboundedSender<Event>,
    status: watch::Receiver<EngineStatus>,
}

impl AutomationEngine {
    /// Spawn the engine task on the current tokio runtime.
    pub fn spawn(gate: Arc<dyn PermissionGate>, pointer: Arc<dyn PointerDevice>) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(EngineStatus::idle());

        let task = EngineTask {
            gate,
            pointer,
            events: commands.clone(),
            status: status_tx,
            state: RunState::new(),
            timers: Timers::default(),
        };
        tokio::spawn(task.run(inbox));

        Self {
            commands,
            status: status_rx,
        }
    }

    /// Arm a run with the given configuration snapshot.
    ///
    /// Accepted only while idle or completed; otherwise ignored. If input
    /// injection is not authorized the run is not armed and the platform
    /// authorization flow is triggered instead; call `start` again once
    /// access has been granted.
    pub fn start(&self, settings: ClickSettings) {
        let _ = self.commands.send(Event::Start(settings));
    }

    /// Cancel the current run, if any. Idempotent.
    pub fn stop(&self) {
        let _ = self.commands.send(Event::Stop);
    }

    /// Subscribe to the published `(phase, remaining)` stream.
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status.clone()
    }

    /// Read the most recently published status.
    pub fn status(&self) -> EngineStatus {
        *self.status.borrow()
    }
}

impl Drop for AutomationEngine {
    fn drop(&mut self) {
        let _ = self.commands.send(Event::Shutdown);
    }
}

/// Mutable run state, owned exclusively by the engine task. Reset in place
/// on every stop/start/complete; observers only ever see the published
/// snapshot.
struct RunState {
    phase: Phase,
    remaining: Duration,
    started_at: Option<Instant>,
    settings: Option<ClickSettings>,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            remaining: Duration::ZERO,
            started_at: None,
            settings: None,
        }
    }
}

/// The three cancelable timers of an active run. A tick that was already
/// queued when its timer was aborted is defended by the phase re-check in
/// the handlers.
#[derive(Default)]
struct Timers {
    start_delay: Option<JoinHandle<()>>,
    cadence: Option<JoinHandle<()>>,
    duration_poll: Option<JoinHandle<()>>,
}

impl Timers {
    fn cancel_all(&mut self) {
        for handle in [
            self.start_delay.take(),
            self.cadence.take(),
            self.duration_poll.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

struct EngineTask {
    gate: Arc<dyn PermissionGate>,
    pointer: Arc<dyn PointerDevice>,
    events: mpsc::UnboundedSender<Event>,
    status: watch::Sender<EngineStatus>,
    state: RunState,
    timers: Timers,
}

impl EngineTask {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = inbox.recv().await {
            match event {
                Event::Start(settings) => self.handle_start(settings),
                Event::Stop => self.stop_run(),
                Event::StartDelayElapsed => self.begin_clicking(),
                Event::CadenceTick => self.perform_click(),
                Event::DurationTick => self.poll_duration(),
                Event::GraceElapsed => self.reset_after_grace(),
                Event::Shutdown => {
                    self.stop_run();
                    break;
                }
            }
        }
    }

    fn publish(&self) {
        self.status.send_replace(EngineStatus {
            phase: self.state.phase,
            remaining: self.state.remaining,
        });
    }

    fn handle_start(&mut self, settings: ClickSettings) {
        if !matches!(self.state.phase, Phase::Idle | Phase::Completed) {
            tracing::debug!(phase = ?self.state.phase, "start ignored, run already armed");
            return;
        }

        if !self.gate.is_authorized() {
            tracing::warn!("input injection not authorized, run not armed");
            self.gate.request_authorization();
            return;
        }

        let settings = settings.normalized();
        self.state.settings = Some(settings);
        self.state.phase = Phase::Waiting;
        self.state.remaining = settings.total_duration;
        self.publish();

        tracing::info!(
            delay_ms = settings.start_delay.as_millis() as u64,
            duration_ms = settings.total_duration.as_millis() as u64,
            interval_ms = settings.click_interval.as_millis() as u64,
            "run armed"
        );

        let events = self.events.clone();
        let delay = settings.start_delay;
        self.timers.start_delay = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = events.send(Event::StartDelayElapsed);
        }));
    }

    fn begin_clicking(&mut self) {
        // A stop between arming and the delay firing clears the settings;
        // a stale tick can also arrive after re-arming.
        let Some(settings) = self.state.settings else {
            return;
        };
        if self.state.phase != Phase::Waiting {
            return;
        }

        self.timers.start_delay.take();
        let started_at = Instant::now();
        self.state.phase = Phase::Running;
        self.state.started_at = Some(started_at);
        self.publish();
        tracing::info!("run started, clicking");

        // First click fires immediately, outside the cadence timer.
        self.perform_click();
        if self.state.phase != Phase::Running {
            return;
        }

        // Both tickers are anchored at the run start so their deadlines
        // don't drift with message-processing latency.
        let events = self.events.clone();
        let period = settings.click_interval;
        self.timers.cadence = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(started_at + period, period);
            loop {
                ticker.tick().await;
                if events.send(Event::CadenceTick).is_err() {
                    break;
                }
            }
        }));

        let events = self.events.clone();
        self.timers.duration_poll = Some(tokio::spawn(async move {
            let mut ticker =
                time::interval_at(started_at + DURATION_POLL_PERIOD, DURATION_POLL_PERIOD);
            loop {
                ticker.tick().await;
                if events.send(Event::DurationTick).is_err() {
                    break;
                }
            }
        }));
    }

    /// One click pair: permission re-check, single cursor sample, press,
    /// dwell, release.
    fn perform_click(&mut self) {
        if self.state.phase != Phase::Running {
            return;
        }

        // Authorization can be revoked mid-run; halt instead of erroring.
        if !self.gate.is_authorized() {
            tracing::warn!("input authorization revoked mid-run, stopping");
            self.stop_run();
            self.gate.request_authorization();
            return;
        }

        let (Some(settings), Some(started_at)) = (self.state.settings, self.state.started_at)
        else {
            return;
        };

        // The budget check also runs here so a cadence tick and a countdown
        // poll landing on the same deadline agree on the outcome.
        if started_at.elapsed() >= settings.total_duration {
            self.complete_run();
            return;
        }

        // Sample once; press and release share this converted point even if
        // the cursor drifts during the dwell.
        let Some(native) = self.pointer.cursor_position() else {
            tracing::warn!("cursor position unavailable, skipping click");
            return;
        };
        let Some(display_height) = self.pointer.display_height() else {
            tracing::warn!("primary display metrics unavailable, skipping click");
            return;
        };
        let at = native.to_injected(display_height);

        if let Err(err) = self.pointer.press(at) {
            tracing::warn!(%err, "press failed, skipping release");
            return;
        }

        // The dwell suspends in its own task so the cadence and countdown
        // timers stay serviced. No cancellation token: if the run ends
        // before the dwell elapses, the release is suppressed by the phase
        // re-check.
        let pointer = Arc::clone(&self.pointer);
        let status = self.status.subscribe();
        let dwell = settings.click_dwell;
        tokio::spawn(async move {
            time::sleep(dwell).await;
            if status.borrow().phase != Phase::Running {
                tracing::debug!("run ended during dwell, release suppressed");
                return;
            }
            if let Err(err) = pointer.release(at) {
                tracing::warn!(%err, "release failed");
            }
        });
    }

    fn poll_duration(&mut self) {
        if self.state.phase != Phase::Running {
            return;
        }
        let (Some(settings), Some(started_at)) = (self.state.settings, self.state.started_at)
        else {
            return;
        };

        let elapsed = started_at.elapsed();
        if elapsed >= settings.total_duration {
            self.complete_run();
        } else {
            self.state.remaining = settings.total_duration - elapsed;
            self.publish();
        }
    }

    /// Tear everything down and return to idle. Valid from any phase.
    fn stop_run(&mut self) {
        self.timers.cancel_all();
        self.state.settings = None;
        self.state.started_at = None;
        self.state.phase = Phase::Idle;
        self.state.remaining = Duration::ZERO;
        self.publish();
    }

    /// Same teardown as stop, but parks in `Completed` for a grace period
    /// so observers can render the finished state.
    fn complete_run(&mut self) {
        self.timers.cancel_all();
        self.state.settings = None;
        self.state.started_at = None;
        self.state.phase = Phase::Completed;
        self.state.remaining = Duration::ZERO;
        self.publish();
        tracing::info!("run complete");

        let events = self.events.clone();
        tokio::spawn(async move {
            time::sleep(COMPLETION_GRACE).await;
            let _ = events.send(Event::GraceElapsed);
        });
    }

    fn reset_after_grace(&mut self) {
        // A start accepted during the grace window must not be clobbered.
        if self.state.phase == Phase::Completed {
            self.state.phase = Phase::Idle;
            self.publish();
        }
    }
}
