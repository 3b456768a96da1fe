//! Day-boundary notification.

use chrono::NaiveDate;
use tracing::info;

/// Notified once each time the poller sees the calendar date change.
///
/// Implementations reset any text data kept per day.
#[cfg_attr(test, mockall::automock)]
pub trait DayRolloverHook: Send + Sync {
    fn on_day_change(&self, date: NaiveDate);
}

/// Rollover hook that only records the event in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggedRollover;

impl DayRolloverHook for LoggedRollover {
    fn on_day_change(&self, date: NaiveDate) {
        info!(%date, "Calendar day rolled over, resetting periodic text data");
    }
}
