//! # Input Source Module
//!
//! Analog and button sources that feed the tracker.
//!
//! This module handles:
//! - The [`AnalogSource`] and [`ButtonSource`] collaborator traits
//! - Resolving named sources through a [`SourceRegistry`]
//! - Scripted in-memory sources ([`scripted`])
//! - Linux evdev joysticks ([`joystick`])
//!
//! Sources deliver values through callbacks that run synchronously inside
//! [`AnalogSource::pump`] / [`ButtonSource::pump`]. Nothing is delivered
//! between pumps.

pub mod joystick;
pub mod scripted;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{AnalogFlyError, Result};

/// Callback receiving one analog sample.
pub type AnalogCallback = Box<dyn FnMut(f64)>;

/// Callback receiving a button state (`true` = pressed).
pub type ButtonCallback = Box<dyn FnMut(bool)>;

/// Shared handle to an analog source.
pub type SharedAnalog = Rc<RefCell<dyn AnalogSource>>;

/// Shared handle to a button source.
pub type SharedButton = Rc<RefCell<dyn ButtonSource>>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A device exposing numbered analog channels.
pub trait AnalogSource {
    /// Registers `callback` for value changes on `channel`.
    fn subscribe(&mut self, channel: usize, callback: AnalogCallback) -> SubscriptionId;

    /// Removes a subscription. Returns `false` if it was not registered.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    /// Delivers buffered value changes to subscribers.
    fn pump(&mut self) -> Result<()>;
}

/// A device exposing numbered buttons.
pub trait ButtonSource {
    /// Registers `callback` for press/release events on `button`.
    fn subscribe(&mut self, button: usize, callback: ButtonCallback) -> SubscriptionId;

    /// Removes a subscription. Returns `false` if it was not registered.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    /// Delivers buffered button events to subscribers.
    fn pump(&mut self) -> Result<()>;
}

/// Looks up sources by name.
pub trait SourceResolver {
    fn analog(&mut self, name: &str) -> Result<SharedAnalog>;
    fn button(&mut self, name: &str) -> Result<SharedButton>;
}

/// Subscriber bookkeeping shared by source implementations.
pub struct SubscriberList<F> {
    next_id: u64,
    entries: Vec<(SubscriptionId, usize, F)>,
}

impl<F> Default for SubscriberList<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> SubscriberList<F> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, index: usize, callback: F) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, index, callback));
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Calls `f` for every subscriber registered on `index`.
    pub fn for_index(&mut self, index: usize, mut f: impl FnMut(&mut F)) {
        for (_, _, callback) in self.entries.iter_mut().filter(|(_, i, _)| *i == index) {
            f(callback);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Name → source table used to resolve axis and reset bindings.
#[derive(Default)]
pub struct SourceRegistry {
    analog: HashMap<String, SharedAnalog>,
    buttons: HashMap<String, SharedButton>,
}

impl SourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_analog(&mut self, name: impl Into<String>, source: SharedAnalog) {
        self.analog.insert(name.into(), source);
    }

    pub fn insert_button(&mut self, name: impl Into<String>, source: SharedButton) {
        self.buttons.insert(name.into(), source);
    }

    /// Registers a device that provides both analog channels and buttons.
    pub fn insert_device<D>(&mut self, name: impl Into<String>, device: Rc<RefCell<D>>)
    where
        D: AnalogSource + ButtonSource + 'static,
    {
        let name = name.into();
        self.analog.insert(name.clone(), device.clone());
        self.buttons.insert(name, device);
    }
}

impl SourceResolver for SourceRegistry {
    fn analog(&mut self, name: &str) -> Result<SharedAnalog> {
        self.analog
            .get(name)
            .cloned()
            .ok_or_else(|| AnalogFlyError::SourceUnavailable {
                name: name.to_string(),
                reason: "no analog device registered under this name".to_string(),
            })
    }

    fn button(&mut self, name: &str) -> Result<SharedButton> {
        self.buttons
            .get(name)
            .cloned()
            .ok_or_else(|| AnalogFlyError::SourceUnavailable {
                name: name.to_string(),
                reason: "no button device registered under this name".to_string(),
            })
    }
}

/// Identity of the object behind a shared handle, ignoring vtables.
pub(crate) fn source_addr<T: ?Sized>(source: &Rc<RefCell<T>>) -> *const () {
    Rc::as_ptr(source) as *const ()
}
