//! The configuration store: resolved properties, typed settings and identity,
//! republished as one unit on every reload.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};

use super::accessor::PropertyValue;
use super::hot_reload::{file_mtime_millis, Clock, ReloadGate, ReloadOutcome, SystemClock};
use super::identity::{DerivedIdentity, HostEnvironment};
use super::loader;
use super::model::AgentSettings;
use super::poller::ConfigPoller;
use super::resolver::{resolve, OverrideLayer, ResolvedProperties};
use super::snapshot::{self, SnapshotRow};
use crate::error::ConfigError;
use crate::notify::{LoggedRollover, ObserverRegistry, ReloadObserver};

/// Config file used when neither the builder nor `scouter.config` names one.
pub const DEFAULT_CONFIG_PATH: &str = "./conf/scouter.conf";

/// System property that selects the config file.
pub const CONFIG_PATH_PROPERTY: &str = "scouter.config";

/// Everything one reload produces. Published atomically; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigState {
    pub properties: ResolvedProperties,
    pub settings: AgentSettings,
    pub identity: DerivedIdentity,
    /// File modification time (epoch ms, 0 for a missing file) seen by this reload.
    pub loaded_mtime: Option<i64>,
}

impl ConfigState {
    fn derive(
        properties: ResolvedProperties,
        host: &HostEnvironment,
        loaded_mtime: Option<i64>,
    ) -> Self {
        let identity = DerivedIdentity::derive(&properties, host);
        let settings = AgentSettings::from_properties(&properties, &identity);

        Self {
            properties,
            settings,
            identity,
            loaded_mtime,
        }
    }
}

/// Builds a [`ConfigStore`]. The first load runs inside [`ConfigStoreBuilder::build`].
pub struct ConfigStoreBuilder {
    path: Option<PathBuf>,
    overrides: OverrideLayer,
    host: Option<HostEnvironment>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn ReloadObserver>,
}

impl Default for ConfigStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            overrides: OverrideLayer::new(),
            host: None,
            clock: Arc::new(SystemClock),
            observer: Arc::new(ObserverRegistry::new()),
        }
    }
}

impl ConfigStoreBuilder {
    /// Uses an explicit config file path.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the environment/system-property layer applied over the file.
    pub fn overrides(mut self, overrides: OverrideLayer) -> Self {
        self.overrides = overrides;
        self
    }

    /// Overrides host detection.
    pub fn host(mut self, host: HostEnvironment) -> Self {
        self.host = Some(host);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the hook notified after each successful reload.
    pub fn observer(mut self, observer: Arc<dyn ReloadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Creates the store and performs the initial load.
    pub fn build(self) -> Arc<ConfigStore> {
        let path = self.path.unwrap_or_else(|| {
            let configured = self
                .overrides
                .get(CONFIG_PATH_PROPERTY)
                .unwrap_or(DEFAULT_CONFIG_PATH);
            PathBuf::from(configured.trim())
        });
        let host = self.host.unwrap_or_else(HostEnvironment::detect);
        let initial = ConfigState::derive(ResolvedProperties::default(), &host, None);

        let store = Arc::new(ConfigStore {
            path,
            overrides: self.overrides,
            host,
            state: ArcSwap::from_pointee(initial),
            gate: Mutex::new(ReloadGate::default()),
            running: AtomicBool::new(true),
            poller_claimed: AtomicBool::new(false),
            clock: self.clock,
            observer: self.observer,
        });

        store.reload(false);
        store
    }
}

/// Hot-reloading configuration store.
///
/// Readers never lock: they load the currently published [`ConfigState`].
/// Reloads serialize on an internal mutex and publish a complete new state.
pub struct ConfigStore {
    path: PathBuf,
    overrides: OverrideLayer,
    host: HostEnvironment,
    state: ArcSwap<ConfigState>,
    gate: Mutex<ReloadGate>,
    running: AtomicBool,
    poller_claimed: AtomicBool,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn ReloadObserver>,
}

impl ConfigStore {
    pub fn builder() -> ConfigStoreBuilder {
        ConfigStoreBuilder::default()
    }

    /// Path of the backing property file.
    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// The currently published state.
    pub fn current(&self) -> Arc<ConfigState> {
        self.state.load_full()
    }

    /// Typed settings of the current state.
    pub fn settings(&self) -> AgentSettings {
        self.state.load().settings.clone()
    }

    pub fn obj_name(&self) -> String {
        self.state.load().identity.obj_name.clone()
    }

    pub fn obj_hash(&self) -> i32 {
        self.state.load().identity.obj_hash
    }

    /// File mtime recorded by the last successful reload.
    pub fn last_load_time(&self) -> Option<i64> {
        self.state.load().loaded_mtime
    }

    /// Trimmed raw value for `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        self.state.load().properties.get_optional(key)
    }

    pub fn get<T: PropertyValue>(&self, key: &str, default: T) -> T {
        self.state.load().properties.get(key, default)
    }

    pub fn get_or<T: PropertyValue>(&self, key: &str, secondary: &str, default: T) -> T {
        self.state.load().properties.get_or(key, secondary, default)
    }

    pub fn get_int_min(&self, key: &str, default: i32, min: i32) -> i32 {
        self.state.load().properties.get_int_min(key, default, min)
    }

    pub fn get_string_set(&self, key: &str, delimiter: &str) -> BTreeSet<String> {
        self.state.load().properties.get_string_set(key, delimiter)
    }

    /// Reloads the file if both gates allow it. Returns whether it reloaded.
    pub fn reload(&self, force: bool) -> bool {
        self.try_reload(force).is_reloaded()
    }

    /// Like [`ConfigStore::reload`], reporting why a reload was skipped.
    pub fn try_reload(&self, force: bool) -> ReloadOutcome {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now_millis();
        let outcome = gate.begin(now, force, || file_mtime_millis(&self.path));
        if !outcome.is_reloaded() {
            debug!(?outcome, path = ?self.path, "Config reload skipped");
            return outcome;
        }

        let file = loader::load_from_path(&self.path);
        let properties = resolve(file, &self.overrides);
        let state = ConfigState::derive(properties, &self.host, gate.last_load_mtime());

        info!(
            path = ?self.path,
            mtime = ?state.loaded_mtime,
            entries = state.properties.len(),
            fingerprint = %state.properties.fingerprint(),
            obj_name = %state.identity.obj_name,
            obj_hash = state.identity.obj_hash,
            "Configuration reloaded"
        );

        self.state.store(Arc::new(state));
        drop(gate);

        self.observer.on_reload();
        outcome
    }

    /// Full text of the backing file, or `None` when it cannot be read.
    pub fn load_text(&self) -> Option<String> {
        match loader::read_text(&self.path) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(error = %e, "Config text unavailable");
                None
            }
        }
    }

    /// Atomically replaces the backing file. Returns `false` on failure.
    pub fn save_text(&self, text: &str) -> bool {
        match loader::write_text(&self.path, text) {
            Ok(()) => {
                info!(path = ?self.path, bytes = text.len(), "Configuration text saved");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to save configuration text");
                false
            }
        }
    }

    /// Current vs. default value for every declared setting.
    pub fn snapshot(&self) -> Vec<SnapshotRow> {
        snapshot::snapshot(&self.state.load().settings)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Asks the poller to exit after its current iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Claims the single poller slot. True only for the first caller.
    pub(crate) fn claim_poller(&self) -> bool {
        self.poller_claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

static GLOBAL: OnceLock<Arc<ConfigStore>> = OnceLock::new();

/// Process-wide store, created on first use from the process environment.
///
/// The first call also starts the store's background poller.
pub fn global() -> Arc<ConfigStore> {
    GLOBAL
        .get_or_init(|| {
            let store = ConfigStore::builder()
                .overrides(OverrideLayer::from_process(std::iter::empty()))
                .build();
            start_poller(&store);
            store
        })
        .clone()
}

/// Installs a custom-built store as the process-wide instance and starts its poller.
pub fn init_global(builder: ConfigStoreBuilder) -> Result<Arc<ConfigStore>, ConfigError> {
    if GLOBAL.get().is_some() {
        return Err(ConfigError::AlreadyInitialized);
    }

    let store = builder.build();
    GLOBAL
        .set(Arc::clone(&store))
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    start_poller(&store);

    Ok(store)
}

fn start_poller(store: &Arc<ConfigStore>) {
    if !ConfigPoller::new(Arc::clone(store), Arc::new(LoggedRollover)).start_detached() {
        warn!(path = ?store.config_path(), "Config poller not started");
    }
}
