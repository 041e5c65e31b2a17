//! Periodic reset tracking for daily and weekly quest cadences.
//!
//! Windows open at fixed UTC boundaries: daily at 00:00 UTC, weekly at
//! Monday 00:00 UTC. The tracker keeps one watermark per cadence and
//! advances it by at most one window per check, so a server that slept
//! through several boundaries catches up gradually instead of firing a
//! burst of resets in one tick.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use log::info;
use serde::{Deserialize, Serialize};

/// Start of the daily window containing `now` (00:00 UTC).
pub fn daily_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &now.date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid"),
    )
}

/// Start of the weekly window containing `now` (Monday 00:00 UTC).
pub fn weekly_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_since_monday = now.weekday().num_days_from_monday() as i64;
    daily_window_start(now) - Duration::days(days_since_monday)
}

/// Resets that became due in one check, carrying their new watermarks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueResets {
    pub daily: Option<DateTime<Utc>>,
    pub weekly: Option<DateTime<Utc>>,
}

impl DueResets {
    pub fn is_empty(&self) -> bool {
        self.daily.is_none() && self.weekly.is_none()
    }
}

/// Watermark pair for the two cadences. Watermarks are always aligned
/// window starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetTracker {
    last_daily: DateTime<Utc>,
    last_weekly: DateTime<Utc>,
}

impl ResetTracker {
    /// Tracker anchored to the windows containing `now`; no reset is due
    /// until the next boundary passes.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_daily: daily_window_start(now),
            last_weekly: weekly_window_start(now),
        }
    }

    /// Restore a tracker from persisted watermarks.
    pub fn from_watermarks(last_daily: DateTime<Utc>, last_weekly: DateTime<Utc>) -> Self {
        Self {
            last_daily: daily_window_start(last_daily),
            last_weekly: weekly_window_start(last_weekly),
        }
    }

    pub fn daily_watermark(&self) -> DateTime<Utc> {
        self.last_daily
    }

    pub fn weekly_watermark(&self) -> DateTime<Utc> {
        self.last_weekly
    }

    /// Advance each cadence by at most one window if its next boundary has
    /// passed, returning the new watermarks for the cadences that moved.
    pub fn check(&mut self, now: DateTime<Utc>) -> DueResets {
        let mut due = DueResets::default();

        let next_daily = self.last_daily + Duration::days(1);
        if next_daily <= now {
            self.last_daily = next_daily;
            due.daily = Some(next_daily);
            info!("daily reset due, watermark now {}", next_daily);
        }

        let next_weekly = self.last_weekly + Duration::weeks(1);
        if next_weekly <= now {
            self.last_weekly = next_weekly;
            due.weekly = Some(next_weekly);
            info!("weekly reset due, watermark now {}", next_weekly);
        }

        due
    }
}
