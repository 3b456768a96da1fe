//! Background loop that keeps the store in sync with its file.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::hot_reload::RELOAD_INTERVAL;
use super::store::ConfigStore;
use crate::notify::DayRolloverHook;

/// Periodically reloads the store and reports calendar-day rollovers.
pub struct ConfigPoller {
    store: Arc<ConfigStore>,
    rollover: Arc<dyn DayRolloverHook>,
    interval: Duration,
}

impl ConfigPoller {
    pub fn new(store: Arc<ConfigStore>, rollover: Arc<dyn DayRolloverHook>) -> Self {
        Self {
            store,
            rollover,
            interval: RELOAD_INTERVAL,
        }
    }

    /// Changes the sleep between iterations.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the loop on the tokio runtime.
    ///
    /// Returns `None` if a poller was already started for this store. The
    /// task never holds the runtime open: it ends with the process or once
    /// [`ConfigStore::stop`] is observed.
    pub fn start(self) -> Option<JoinHandle<()>> {
        if !self.store.claim_poller() {
            debug!("Config poller already running");
            return None;
        }

        Some(tokio::spawn(self.run()))
    }

    /// Starts the loop without handing back a handle.
    ///
    /// Runs on the current tokio runtime when called inside one, otherwise on
    /// a background thread. Returns `false` if a poller was already started
    /// or the thread could not be spawned.
    pub fn start_detached(self) -> bool {
        if !self.store.claim_poller() {
            debug!("Config poller already running");
            return false;
        }

        if let Ok(handle) = Handle::try_current() {
            handle.spawn(self.run());
            return true;
        }

        match std::thread::Builder::new()
            .name("scouter-conf-poller".to_string())
            .spawn(move || self.run_blocking())
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Failed to spawn config poller thread");
                false
            }
        }
    }

    async fn run(self) {
        let mut date = self.started();

        while self.store.is_running() {
            self.tick(&mut date);
            tokio::time::sleep(self.interval).await;
        }

        info!("Config poller stopped");
    }

    fn run_blocking(self) {
        let mut date = self.started();

        while self.store.is_running() {
            self.tick(&mut date);
            std::thread::sleep(self.interval);
        }

        info!("Config poller stopped");
    }

    fn started(&self) -> NaiveDate {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            path = ?self.store.config_path(),
            interval_ms = self.interval.as_millis() as u64,
            "Config poller started"
        );

        self.store.clock().today()
    }

    /// One iteration: reload if due, then report a date change.
    fn tick(&self, date: &mut NaiveDate) {
        self.store.reload(false);

        let today = self.store.clock().today();
        if today != *date {
            *date = today;
            self.rollover.on_day_change(today);
        }
    }
}
