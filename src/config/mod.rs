//! Runtime configuration store with hot reload.
//!
//! # Data Flow
//! ```text
//! conf/scouter.conf
//!     → loader.rs (parse property lines)
//!     → resolver.rs (merge env/system overrides, expand ${key})
//!     → model.rs + identity.rs (typed settings, object identity)
//!     → store.rs (atomic swap of Arc<ConfigState>)
//!
//! poller.rs every 3s:
//!     hot_reload.rs gates (rate, mtime) → reload → observers notified
//! ```

pub mod accessor;
pub mod hot_reload;
pub mod identity;
pub mod loader;
pub mod model;
pub mod poller;
pub mod resolver;
pub mod snapshot;
pub mod store;

pub use accessor::PropertyValue;
pub use hot_reload::{Clock, ReloadOutcome, SystemClock, RELOAD_INTERVAL};
pub use identity::{DerivedIdentity, HostEnvironment};
pub use model::AgentSettings;
pub use poller::ConfigPoller;
pub use resolver::{OverrideLayer, ResolvedProperties};
pub use snapshot::SnapshotRow;
pub use store::{global, init_global, ConfigState, ConfigStore, ConfigStoreBuilder};
