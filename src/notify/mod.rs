//! Notification hooks the configuration store fires at other components.

pub mod observer;
pub mod rollover;

pub use observer::{ObserverRegistry, ReloadObserver};
pub use rollover::{DayRolloverHook, LoggedRollover};
