use crate::time::Clock;
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// The venue opens next month's bookings on the 25th at 10:00; submitting a few
// seconds early lands the first request as the window opens.
const DEFAULT_ANCHOR_DAY: u32 = 25;
const DEFAULT_ANCHOR_HOUR: u32 = 9;
const DEFAULT_ANCHOR_MINUTE: u32 = 59;
const DEFAULT_ANCHOR_SECOND: u32 = 55;

/// Wall-clock window that releases the gate: the given day of month, hour and
/// minute, from `second` up to the end of that minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineAnchor {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DeadlineAnchor {
    pub fn new(day: u32, hour: u32, minute: u32, second: u32) -> anyhow::Result<Self> {
        anyhow::ensure!((1..=31).contains(&day), "anchor day must be 1..=31 (got {day})");
        anyhow::ensure!(hour < 24, "anchor hour must be 0..=23 (got {hour})");
        anyhow::ensure!(minute < 60, "anchor minute must be 0..=59 (got {minute})");
        anyhow::ensure!(second < 60, "anchor second must be 0..=59 (got {second})");
        Ok(Self {
            day,
            hour,
            minute,
            second,
        })
    }

    pub fn is_open_at(&self, now: NaiveDateTime) -> bool {
        now.day() == self.day
            && now.hour() == self.hour
            && now.minute() == self.minute
            && now.second() >= self.second
    }
}

impl Default for DeadlineAnchor {
    fn default() -> Self {
        Self {
            day: DEFAULT_ANCHOR_DAY,
            hour: DEFAULT_ANCHOR_HOUR,
            minute: DEFAULT_ANCHOR_MINUTE,
            second: DEFAULT_ANCHOR_SECOND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Reached,
    Aborted,
}

/// Polls the clock until the anchor window opens.
#[derive(Clone)]
pub struct DeadlineGate {
    anchor: DeadlineAnchor,
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl DeadlineGate {
    pub fn new(anchor: DeadlineAnchor, poll_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            anchor,
            poll_interval,
            clock,
        }
    }

    pub fn anchor(&self) -> DeadlineAnchor {
        self.anchor
    }

    /// Returns once the window is open, or `Aborted` as soon as `cancel` fires.
    ///
    /// There is no timeout. If the anchor instant never comes this waits
    /// forever, so callers must keep a way to cancel the token (Ctrl-C in the
    /// worker).
    pub async fn wait(&self, cancel: &CancellationToken) -> GateOutcome {
        let mut polls: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                tracing::info!(polls, "deadline gate cancelled");
                return GateOutcome::Aborted;
            }

            let now = self.clock.now();
            if self.anchor.is_open_at(now) {
                tracing::info!(%now, polls, "deadline gate opened");
                return GateOutcome::Reached;
            }

            polls += 1;
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(polls, "deadline gate cancelled");
                    return GateOutcome::Aborted;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
