//! # Channel Binding Module
//!
//! Live link between one [`AxisMapping`] and its analog source.
//!
//! The binding registers a closure with the source that stores each incoming
//! sample into a shared cell. The closure does nothing else, so pumping a
//! source stays cheap. The tracker reads the cell once per tick.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, warn};

use super::axis::{AxisMapping, Dof};
use crate::error::Result;
use crate::source::{SharedAnalog, SourceResolver, SubscriptionId};

/// A subscription of one axis to one analog channel.
pub struct ChannelBinding {
    dof: Dof,
    mapping: AxisMapping,
    source: SharedAnalog,
    subscription: Option<SubscriptionId>,
    last_raw_value: Rc<Cell<f64>>,
}

impl std::fmt::Debug for ChannelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBinding")
            .field("dof", &self.dof)
            .field("mapping", &self.mapping)
            .field("subscription", &self.subscription)
            .field("last_raw_value", &self.last_raw_value.get())
            .finish_non_exhaustive()
    }
}

impl ChannelBinding {
    /// Binds `mapping` to its analog source.
    ///
    /// Returns `Ok(None)` for a disabled mapping; nothing is subscribed.
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if the named source cannot be resolved.
    pub fn setup(
        dof: Dof,
        mapping: &AxisMapping,
        resolver: &mut dyn SourceResolver,
    ) -> Result<Option<Self>> {
        let Some(name) = mapping.source.as_deref() else {
            return Ok(None);
        };

        let source = resolver.analog(name)?;
        let last_raw_value = Rc::new(Cell::new(0.0));
        let slot = Rc::clone(&last_raw_value);
        let id = source
            .borrow_mut()
            .subscribe(mapping.channel, Box::new(move |value| slot.set(value)));

        debug!("Axis {} bound to {} channel {}", dof, name, mapping.channel);

        Ok(Some(Self {
            dof,
            mapping: mapping.clone(),
            source,
            subscription: Some(id),
            last_raw_value,
        }))
    }

    #[must_use]
    pub fn dof(&self) -> Dof {
        self.dof
    }

    #[must_use]
    pub fn mapping(&self) -> &AxisMapping {
        &self.mapping
    }

    #[must_use]
    pub fn source(&self) -> &SharedAnalog {
        &self.source
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.subscription.is_some()
    }

    /// Most recent sample delivered by the source (0.0 before the first).
    #[must_use]
    pub fn last_raw_value(&self) -> f64 {
        self.last_raw_value.get()
    }

    /// Current rate from the response curve; zero once torn down.
    #[must_use]
    pub fn rate(&self) -> f64 {
        if self.is_bound() {
            self.mapping.rate(self.last_raw_value.get())
        } else {
            0.0
        }
    }

    /// Forgets the last sample, e.g. after the source failed to pump.
    pub fn clear(&self) {
        self.last_raw_value.set(0.0);
    }

    /// Unsubscribes from the source. Safe to call more than once.
    pub fn teardown(&mut self) {
        let Some(id) = self.subscription.take() else {
            return;
        };
        self.clear();

        match self.source.try_borrow_mut() {
            Ok(mut source) => {
                source.unsubscribe(id);
                debug!("Axis {} unbound", self.dof);
            }
            Err(_) => warn!("Axis {} source busy during teardown, subscription leaked", self.dof),
        }
    }
}

impl Drop for ChannelBinding {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalogFlyError;
    use crate::source::scripted::ScriptedDevice;
    use crate::source::{AnalogSource, SourceRegistry};
    use std::cell::RefCell;

    fn registry_with(device: &Rc<RefCell<ScriptedDevice>>) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        registry.insert_device("stick", device.clone());
        registry
    }

    #[test]
    fn test_disabled_mapping_creates_no_binding() {
        let device = Rc::new(RefCell::new(ScriptedDevice::new()));
        let mut registry = registry_with(&device);

        let binding = ChannelBinding::setup(Dof::X, &AxisMapping::disabled(), &mut registry).unwrap();
        assert!(binding.is_none());
        assert_eq!(device.borrow().analog_subscribers(), 0);
    }

    #[test]
    fn test_setup_subscribes_and_stores_samples() {
        let device = Rc::new(RefCell::new(ScriptedDevice::new()));
        let mut registry = registry_with(&device);
        let mapping = AxisMapping::new("stick", 2).with_power(2.0);

        let binding = ChannelBinding::setup(Dof::Y, &mapping, &mut registry)
            .unwrap()
            .expect("enabled mapping should bind");
        assert!(binding.is_bound());
        assert_eq!(binding.dof(), Dof::Y);
        assert_eq!(device.borrow().analog_subscribers(), 1);

        device.borrow_mut().set_analog(2, -0.5);
        AnalogSource::pump(&mut *device.borrow_mut()).unwrap();

        assert_eq!(binding.last_raw_value(), -0.5);
        assert!((binding.rate() + 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_setup_unknown_source_fails() {
        let mut registry = SourceRegistry::new();
        let result = ChannelBinding::setup(Dof::Z, &AxisMapping::new("ghost", 0), &mut registry);
        assert!(matches!(result, Err(AnalogFlyError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let device = Rc::new(RefCell::new(ScriptedDevice::new()));
        let mut registry = registry_with(&device);
        let mut binding = ChannelBinding::setup(Dof::X, &AxisMapping::new("stick", 0), &mut registry)
            .unwrap()
            .unwrap();

        binding.teardown();
        binding.teardown();

        assert!(!binding.is_bound());
        assert_eq!(device.borrow().analog_subscribers(), 0);
    }

    #[test]
    fn test_torn_down_binding_ignores_stale_value() {
        let device = Rc::new(RefCell::new(ScriptedDevice::new()));
        let mut registry = registry_with(&device);
        let mut binding = ChannelBinding::setup(Dof::X, &AxisMapping::new("stick", 0), &mut registry)
            .unwrap()
            .unwrap();

        device.borrow_mut().set_analog(0, 0.8);
        AnalogSource::pump(&mut *device.borrow_mut()).unwrap();
        assert!(binding.rate() > 0.0);

        binding.teardown();
        assert_eq!(binding.rate(), 0.0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let device = Rc::new(RefCell::new(ScriptedDevice::new()));
        let mut registry = registry_with(&device);
        {
            let _binding = ChannelBinding::setup(Dof::RotZ, &AxisMapping::new("stick", 5), &mut registry)
                .unwrap()
                .unwrap();
            assert_eq!(device.borrow().analog_subscribers(), 1);
        }
        assert_eq!(device.borrow().analog_subscribers(), 0);
    }

    #[test]
    fn test_clear_resets_sample() {
        let device = Rc::new(RefCell::new(ScriptedDevice::new()));
        let mut registry = registry_with(&device);
        let binding = ChannelBinding::setup(Dof::X, &AxisMapping::new("stick", 0), &mut registry)
            .unwrap()
            .unwrap();

        device.borrow_mut().set_analog(0, 0.6);
        AnalogSource::pump(&mut *device.borrow_mut()).unwrap();
        binding.clear();
        assert_eq!(binding.last_raw_value(), 0.0);
        assert_eq!(binding.rate(), 0.0);
    }
}
