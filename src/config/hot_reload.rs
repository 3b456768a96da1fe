//! Change detection for configuration hot-reload.
//!
//! A reload attempt passes two gates: the rate gate (at most one attempt per
//! [`RELOAD_INTERVAL`] unless forced) and the change gate (the file's
//! modification time differs from the one seen at the last reload).

use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use chrono::{Local, NaiveDate, Utc};

/// Minimum spacing between unforced reload attempts, and the poller cadence.
pub const RELOAD_INTERVAL: Duration = Duration::from_secs(3);

const RELOAD_INTERVAL_MS: i64 = RELOAD_INTERVAL.as_millis() as i64;

/// Source of wall-clock time for the reload gates and the poller.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;

    /// Today's local calendar date.
    fn today(&self) -> NaiveDate;
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Result of a reload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The file was re-read and new state published.
    Reloaded,
    /// Skipped: the previous attempt was too recent.
    RateLimited,
    /// Skipped: the file's modification time has not moved.
    Unchanged,
}

impl ReloadOutcome {
    pub fn is_reloaded(self) -> bool {
        self == Self::Reloaded
    }
}

/// True when an attempt at `now_ms` may proceed.
pub fn rate_gate_open(now_ms: i64, last_check_ms: Option<i64>, force: bool) -> bool {
    force || last_check_ms.map_or(true, |last| now_ms >= last + RELOAD_INTERVAL_MS)
}

/// True when the file's modification time differs from the last loaded one.
pub fn file_changed(mtime_ms: i64, last_loaded_ms: Option<i64>) -> bool {
    last_loaded_ms != Some(mtime_ms)
}

/// Modification time in epoch milliseconds, or 0 when the file is missing.
pub fn file_mtime_millis(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Bookkeeping for both gates. Lives behind the store's reload lock.
#[derive(Debug, Default)]
pub struct ReloadGate {
    last_check_ms: Option<i64>,
    last_load_mtime: Option<i64>,
}

impl ReloadGate {
    /// Runs both gates, recording the attempt and the new mtime as it goes.
    ///
    /// `mtime` is only read once the rate gate has passed.
    pub fn begin(
        &mut self,
        now_ms: i64,
        force: bool,
        mtime: impl FnOnce() -> i64,
    ) -> ReloadOutcome {
        if !rate_gate_open(now_ms, self.last_check_ms, force) {
            return ReloadOutcome::RateLimited;
        }
        self.last_check_ms = Some(now_ms);

        let current = mtime();
        if !file_changed(current, self.last_load_mtime) {
            return ReloadOutcome::Unchanged;
        }
        self.last_load_mtime = Some(current);

        ReloadOutcome::Reloaded
    }

    pub fn last_load_mtime(&self) -> Option<i64> {
        self.last_load_mtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn rate_gate_blocks_within_interval() {
        assert!(rate_gate_open(0, None, false));
        assert!(!rate_gate_open(2_999, Some(0), false));
        assert!(rate_gate_open(3_000, Some(0), false));
    }

    #[test]
    fn force_bypasses_rate_gate() {
        assert!(rate_gate_open(1, Some(0), true));
    }

    #[test]
    fn change_gate_compares_mtimes() {
        assert!(file_changed(0, None));
        assert!(!file_changed(500, Some(500)));
        assert!(file_changed(501, Some(500)));
    }

    #[test]
    fn first_attempt_always_reloads() {
        let mut gate = ReloadGate::default();
        assert_eq!(gate.begin(0, false, || 0), ReloadOutcome::Reloaded);
        assert_eq!(gate.last_load_mtime(), Some(0));
    }

    #[test]
    fn rate_limited_attempt_does_not_stat_the_file() {
        let mut gate = ReloadGate::default();
        gate.begin(10_000, false, || 1);

        let outcome = gate.begin(11_000, false, || panic!("mtime read while rate limited"));
        assert_eq!(outcome, ReloadOutcome::RateLimited);
    }

    #[test]
    fn unchanged_file_is_skipped_but_counts_as_attempt() {
        let mut gate = ReloadGate::default();
        gate.begin(0, false, || 42);

        assert_eq!(gate.begin(5_000, false, || 42), ReloadOutcome::Unchanged);
        // The unchanged attempt at 5s moved the rate window.
        assert_eq!(gate.begin(7_000, false, || 43), ReloadOutcome::RateLimited);
        assert_eq!(gate.begin(8_000, false, || 43), ReloadOutcome::Reloaded);
        assert_eq!(gate.last_load_mtime(), Some(43));
    }

    #[test]
    fn forced_reload_still_needs_a_change() {
        let mut gate = ReloadGate::default();
        gate.begin(0, false, || 42);

        assert_eq!(gate.begin(1, true, || 42), ReloadOutcome::Unchanged);
        assert_eq!(gate.begin(2, true, || 99), ReloadOutcome::Reloaded);
    }

    #[test]
    fn missing_file_has_zero_mtime() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(file_mtime_millis(&dir.path().join("absent.conf")), 0);

        let file = NamedTempFile::new().unwrap();
        assert!(file_mtime_millis(file.path()) > 0);
    }

    #[test]
    fn system_clock_is_sane() {
        assert!(SystemClock.now_millis() > 1_600_000_000_000);
    }
}
