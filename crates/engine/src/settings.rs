//! Run configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest accepted gap between press and release.
pub const MIN_CLICK_DWELL: Duration = Duration::from_millis(1);

/// Smallest accepted cadence period.
pub const MIN_CLICK_INTERVAL: Duration = Duration::from_millis(2);

/// Configuration snapshot for one automation run.
///
/// Immutable once a run is armed; the engine keeps the copy it received at
/// `start` and ignores later edits. The dwell must stay below the interval
/// so a click pair finishes before the next one begins;
/// [`normalized`](ClickSettings::normalized) enforces that, and the engine
/// applies it to every snapshot it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickSettings {
    /// Wait before the first click.
    pub start_delay: Duration,
    /// Total run budget, measured from the first click.
    pub total_duration: Duration,
    /// Gap between the start of consecutive click pairs.
    pub click_interval: Duration,
    /// Gap between press and release within one click pair.
    pub click_dwell: Duration,
}

impl Default for ClickSettings {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_secs(2),
            total_duration: Duration::from_secs(3),
            click_interval: Duration::from_millis(360),
            click_dwell: Duration::from_millis(10),
        }
    }
}

impl ClickSettings {
    /// Clamp the snapshot into a schedulable shape.
    ///
    /// A zero interval would make the cadence timer spin, and a dwell at or
    /// above the interval would overlap consecutive pairs; both are pulled
    /// back to the nearest valid value instead of rejected.
    pub fn normalized(self) -> Self {
        let mut settings = self;
        if settings.click_interval < MIN_CLICK_INTERVAL {
            settings.click_interval = MIN_CLICK_INTERVAL;
        }
        if settings.click_dwell < MIN_CLICK_DWELL {
            settings.click_dwell = MIN_CLICK_DWELL;
        }
        if settings.click_dwell >= settings.click_interval {
            settings.click_dwell =
                (settings.click_interval - Duration::from_millis(1)).max(MIN_CLICK_DWELL);
        }
        settings
    }
}
