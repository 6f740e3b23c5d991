//! Scripted in-memory input device.
//!
//! Values are queued with [`ScriptedDevice::set_analog`] /
//! [`ScriptedDevice::set_button`] and delivered on the next pump, the same
//! way a remote device buffers reports until its owner polls it.
//!
//! ```
//! use analog_fly::source::scripted::ScriptedDevice;
//! use analog_fly::source::AnalogSource;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut device = ScriptedDevice::new();
//! let seen = Rc::new(Cell::new(0.0));
//! let sink = seen.clone();
//! AnalogSource::subscribe(&mut device, 2, Box::new(move |v| sink.set(v)));
//!
//! device.set_analog(2, 0.75);
//! assert_eq!(seen.get(), 0.0); // nothing until pumped
//! AnalogSource::pump(&mut device)?;
//! assert_eq!(seen.get(), 0.75);
//! # Ok::<(), analog_fly::error::AnalogFlyError>(())
//! ```

use std::collections::VecDeque;

use super::{
    AnalogCallback, AnalogSource, ButtonCallback, ButtonSource, SubscriberList, SubscriptionId,
};
use crate::error::{AnalogFlyError, Result};

#[derive(Debug, Clone, Copy)]
enum ScriptedEvent {
    Analog { channel: usize, value: f64 },
    Button { button: usize, pressed: bool },
}

/// An input device driven entirely by the caller.
#[derive(Default)]
pub struct ScriptedDevice {
    pending: VecDeque<ScriptedEvent>,
    analog: SubscriberList<AnalogCallback>,
    buttons: SubscriberList<ButtonCallback>,
    fail_next_pump: Option<String>,
    pumps: u64,
}

impl ScriptedDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a new value for `channel`.
    pub fn set_analog(&mut self, channel: usize, value: f64) {
        self.pending.push_back(ScriptedEvent::Analog { channel, value });
    }

    /// Queues a press (`true`) or release (`false`) of `button`.
    pub fn set_button(&mut self, button: usize, pressed: bool) {
        self.pending.push_back(ScriptedEvent::Button { button, pressed });
    }

    /// Makes the next pump fail with a device error, leaving events queued.
    pub fn fail_next_pump(&mut self, reason: impl Into<String>) {
        self.fail_next_pump = Some(reason.into());
    }

    /// Number of pump calls so far, failed ones included.
    #[must_use]
    pub fn pump_count(&self) -> u64 {
        self.pumps
    }

    #[must_use]
    pub fn analog_subscribers(&self) -> usize {
        self.analog.len()
    }

    #[must_use]
    pub fn button_subscribers(&self) -> usize {
        self.buttons.len()
    }

    fn deliver(&mut self) -> Result<()> {
        self.pumps += 1;
        if let Some(reason) = self.fail_next_pump.take() {
            return Err(AnalogFlyError::Device(reason));
        }

        while let Some(event) = self.pending.pop_front() {
            match event {
                ScriptedEvent::Analog { channel, value } => {
                    self.analog.for_index(channel, |cb| cb(value));
                }
                ScriptedEvent::Button { button, pressed } => {
                    self.buttons.for_index(button, |cb| cb(pressed));
                }
            }
        }
        Ok(())
    }
}

impl AnalogSource for ScriptedDevice {
    fn subscribe(&mut self, channel: usize, callback: AnalogCallback) -> SubscriptionId {
        self.analog.add(channel, callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.analog.remove(id)
    }

    fn pump(&mut self) -> Result<()> {
        self.deliver()
    }
}

impl ButtonSource for ScriptedDevice {
    fn subscribe(&mut self, button: usize, callback: ButtonCallback) -> SubscriptionId {
        self.buttons.add(button, callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.buttons.remove(id)
    }

    fn pump(&mut self) -> Result<()> {
        self.deliver()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn test_values_delivered_in_order() {
        let mut device = ScriptedDevice::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        AnalogSource::subscribe(&mut device, 0, Box::new(move |v| sink.borrow_mut().push(v)));

        device.set_analog(0, 0.1);
        device.set_analog(1, 0.9); // other channel
        device.set_analog(0, -0.4);
        AnalogSource::pump(&mut device).unwrap();

        assert_eq!(*seen.borrow(), vec![0.1, -0.4]);
    }

    #[test]
    fn test_buttons_and_analog_share_one_queue() {
        let mut device = ScriptedDevice::new();
        let pressed = Rc::new(Cell::new(false));
        let value = Rc::new(Cell::new(0.0));
        let (p, v) = (pressed.clone(), value.clone());
        ButtonSource::subscribe(&mut device, 4, Box::new(move |s| p.set(s)));
        AnalogSource::subscribe(&mut device, 1, Box::new(move |x| v.set(x)));

        device.set_button(4, true);
        device.set_analog(1, 0.5);
        ButtonSource::pump(&mut device).unwrap();

        assert!(pressed.get());
        assert_eq!(value.get(), 0.5);
    }

    #[test]
    fn test_unsubscribed_callback_not_called() {
        let mut device = ScriptedDevice::new();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let id = AnalogSource::subscribe(&mut device, 0, Box::new(move |_| c.set(c.get() + 1)));

        assert!(AnalogSource::unsubscribe(&mut device, id));
        device.set_analog(0, 1.0);
        AnalogSource::pump(&mut device).unwrap();

        assert_eq!(calls.get(), 0);
        assert_eq!(device.analog_subscribers(), 0);
    }

    #[test]
    fn test_failed_pump_keeps_events() {
        let mut device = ScriptedDevice::new();
        let value = Rc::new(Cell::new(0.0));
        let v = value.clone();
        AnalogSource::subscribe(&mut device, 0, Box::new(move |x| v.set(x)));

        device.set_analog(0, 0.3);
        device.fail_next_pump("unplugged");
        assert!(matches!(AnalogSource::pump(&mut device), Err(AnalogFlyError::Device(_))));
        assert_eq!(value.get(), 0.0);

        AnalogSource::pump(&mut device).unwrap();
        assert_eq!(value.get(), 0.3);
        assert_eq!(device.pump_count(), 2);
    }
}
