//! Reload observers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};

/// Notified after every successful configuration reload.
#[cfg_attr(test, mockall::automock)]
pub trait ReloadObserver: Send + Sync {
    fn on_reload(&self);
}

type Callback = Box<dyn Fn() + Send + Sync>;

/// Named callbacks that re-evaluate configuration-dependent state.
///
/// Callbacks run in registration order. A panicking callback is logged and
/// does not stop the others.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<(String, Callback)>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback under `name`.
    pub fn register<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.into(), Box::new(callback)));
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReloadObserver for ObserverRegistry {
    fn on_reload(&self) {
        let observers = self.observers.read().unwrap_or_else(PoisonError::into_inner);

        for (name, callback) in observers.iter() {
            debug!(observer = %name, "Running config observer");
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                warn!(observer = %name, "Config observer panicked");
            }
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn runs_callbacks_in_order() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(RwLock::new(Vec::new()));

        for name in ["first", "second"] {
            let log = Arc::clone(&log);
            registry.register(name, move || log.write().unwrap().push(name));
        }
        registry.on_reload();

        assert_eq!(registry.len(), 2);
        assert_eq!(*log.read().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn panicking_callback_does_not_stop_others() {
        let registry = ObserverRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        registry.register("broken", || panic!("observer failure"));
        let counter = Arc::clone(&calls);
        registry.register("counter", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.on_reload();
        registry.on_reload();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_registry_is_a_no_op() {
        let registry = ObserverRegistry::new();
        assert!(registry.is_empty());
        registry.on_reload();
    }
}
