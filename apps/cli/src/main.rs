//! Command-line front end for the tappet automation engine.
//!
//! This is a thin presentation layer: it turns flags into a settings
//! snapshot, renders the engine's published status stream as log lines,
//! and decides what to do when authorization is missing (here: point the
//! user at the Accessibility pane). All timing and clicking logic lives in
//! `tappet-engine`.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tappet_engine::{AutomationEngine, ClickSettings, Phase};
use tappet_input::{open_accessibility_settings, SystemPermissionGate, SystemPointer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tappet", version, about = "Clicks for you, where the cursor is")]
struct Args {
    /// Seconds to wait before the first click.
    #[arg(long, default_value_t = 2.0)]
    start_delay: f64,

    /// Run duration in seconds, measured from the first click.
    #[arg(long, default_value_t = 3.0)]
    duration: f64,

    /// Milliseconds between the start of consecutive clicks.
    #[arg(long, default_value_t = 360)]
    interval: u64,

    /// Milliseconds the button stays pressed within one click.
    #[arg(long, default_value_t = 10)]
    dwell: u64,
}

impl Args {
    fn settings(&self) -> ClickSettings {
        ClickSettings {
            start_delay: Duration::from_secs_f64(self.start_delay.max(0.0)),
            total_duration: Duration::from_secs_f64(self.duration.max(0.0)),
            click_interval: Duration::from_millis(self.interval),
            click_dwell: Duration::from_millis(self.dwell),
        }
        .normalized()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tappet=debug")),
        )
        .init();

    let args = Args::parse();
    let settings = args.settings();

    let engine = AutomationEngine::spawn(Arc::new(SystemPermissionGate), Arc::new(SystemPointer));
    let mut status = engine.subscribe();
    engine.start(settings);

    // An unauthorized start never arms; the engine has already asked the
    // system to prompt, so offer the settings pane and bail out.
    tokio::time::sleep(Duration::from_millis(200)).await;
    if engine.status().phase == Phase::Idle {
        tracing::warn!("accessibility permission missing, run not armed");
        tracing::info!(
            "grant access under System Settings > Privacy & Security > Accessibility, then run again"
        );
        open_accessibility_settings();
        return Ok(());
    }

    let mut last_logged_secs = None;
    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *status.borrow_and_update();
                match snapshot.phase {
                    Phase::Waiting => {
                        tracing::info!(
                            delay_s = settings.start_delay.as_secs_f64(),
                            "waiting for the start delay"
                        );
                    }
                    Phase::Running => {
                        let secs = snapshot.remaining.as_secs_f64().ceil() as u64;
                        if last_logged_secs != Some(secs) {
                            last_logged_secs = Some(secs);
                            tracing::info!(remaining_s = secs, "clicking");
                        }
                    }
                    Phase::Completed => tracing::info!("run complete"),
                    Phase::Idle => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                engine.stop();
                break;
            }
        }
    }

    Ok(())
}
