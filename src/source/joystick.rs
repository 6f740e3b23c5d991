//! # Evdev Joystick Source
//!
//! Reads a Linux input device (`/dev/input/eventX`) and exposes its absolute
//! axes as analog channels and its keys as buttons.
//!
//! ## Channel Numbering
//!
//! | Kind | Index | Example |
//! |------|-------|---------|
//! | Analog channel | evdev absolute axis code | `ABS_X` = 0, `ABS_Y` = 1, `ABS_RZ` = 5 |
//! | Button | evdev key code | `BTN_SOUTH` = 304, `BTN_TRIGGER` = 288 |
//!
//! Stick axes are normalized from the configured raw range to -1.0..1.0.
//! Hat (D-pad) axes already report -1/0/1 and are passed through.
//!
//! The device is read by a tokio task on the runtime that opened it;
//! [`EvdevJoystick`]'s pump only drains what the task has queued, so it never
//! blocks. Dropping the joystick aborts the task, which closes the device.

use std::path::Path;

use evdev::{AbsoluteAxisType, Device, EventStream, InputEvent, InputEventKind};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    AnalogCallback, AnalogSource, ButtonCallback, ButtonSource, SubscriberList, SubscriptionId,
};
use crate::error::{AnalogFlyError, Result};

/// Raw value range of a device's stick axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    min: i32,
    max: i32,
}

impl Default for AxisRange {
    /// Typical 8-bit gamepad range.
    fn default() -> Self {
        Self { min: 0, max: 255 }
    }
}

impl AxisRange {
    /// Creates a range; `min` and `max` are swapped if given backwards.
    #[must_use]
    pub fn new(min: i32, max: i32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Maps a raw axis value to -1.0..1.0, with the range midpoint at 0.0.
    ///
    /// ```
    /// use analog_fly::source::joystick::AxisRange;
    ///
    /// let range = AxisRange::new(-32768, 32767);
    /// assert!((range.normalize(32767) - 1.0).abs() < 1e-9);
    /// assert!(range.normalize(0).abs() < 1e-4);
    /// ```
    #[must_use]
    pub fn normalize(&self, raw: i32) -> f64 {
        let half = (f64::from(self.max) - f64::from(self.min)) / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        let center = (f64::from(self.max) + f64::from(self.min)) / 2.0;
        ((f64::from(raw) - center) / half).clamp(-1.0, 1.0)
    }
}

/// Event forwarded from the reader task.
#[derive(Debug, Clone, PartialEq)]
enum DeviceEvent {
    Axis { code: u16, value: i32 },
    Key { code: u16, value: i32 },
    Lost(String),
}

/// Converts an evdev event into something the pump dispatches.
fn translate(event: &InputEvent) -> Option<DeviceEvent> {
    match event.kind() {
        InputEventKind::AbsAxis(axis) => Some(DeviceEvent::Axis {
            code: axis.0,
            value: event.value(),
        }),
        InputEventKind::Key(key) => Some(DeviceEvent::Key {
            code: key.code(),
            value: event.value(),
        }),
        // Sync, misc and force-feedback events are not inputs
        _ => None,
    }
}

fn is_hat(code: u16) -> bool {
    (AbsoluteAxisType::ABS_HAT0X.0..=AbsoluteAxisType::ABS_HAT3Y.0).contains(&code)
}

async fn read_events(mut stream: EventStream, tx: UnboundedSender<DeviceEvent>) {
    loop {
        let event = match stream.next_event().await {
            Ok(event) => event,
            Err(e) => {
                let _ = tx.send(DeviceEvent::Lost(e.to_string()));
                return;
            }
        };

        if let Some(event) = translate(&event) {
            if tx.send(event).is_err() {
                // Joystick handle dropped
                return;
            }
        }
    }
}

/// A joystick read through evdev.
pub struct EvdevJoystick {
    device_path: String,
    name: Option<String>,
    range: AxisRange,
    events: UnboundedReceiver<DeviceEvent>,
    reader: Option<JoinHandle<()>>,
    analog: SubscriberList<AnalogCallback>,
    buttons: SubscriberList<ButtonCallback>,
    lost: bool,
}

impl std::fmt::Debug for EvdevJoystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevJoystick")
            .field("device_path", &self.device_path)
            .field("name", &self.name)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

impl EvdevJoystick {
    /// Opens the input device at `path` and starts its reader task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `SourceUnavailable`: the device cannot be opened (missing, permissions),
    ///   or there is no tokio runtime to read it on
    /// - `Io`: the device cannot be switched to non-blocking reads
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use analog_fly::source::joystick::{AxisRange, EvdevJoystick};
    ///
    /// let joystick = EvdevJoystick::open("/dev/input/event5", AxisRange::default())?;
    /// println!("Opened {:?}", joystick.name());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, range: AxisRange) -> Result<Self> {
        let path = path.as_ref();
        let device_path = path.display().to_string();

        let device = Device::open(path).map_err(|e| AnalogFlyError::SourceUnavailable {
            name: device_path.clone(),
            reason: e.to_string(),
        })?;
        let name = device.name().map(str::to_string);

        let runtime = Handle::try_current().map_err(|e| AnalogFlyError::SourceUnavailable {
            name: device_path.clone(),
            reason: e.to_string(),
        })?;
        let stream = {
            let _guard = runtime.enter();
            device.into_event_stream()?
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let reader = runtime.spawn(read_events(stream, tx));

        info!(
            "Opened input device {} ({})",
            device_path,
            name.as_deref().unwrap_or("unnamed")
        );

        let mut joystick = Self::from_receiver(device_path, name, range, rx);
        joystick.reader = Some(reader);
        Ok(joystick)
    }

    fn from_receiver(
        device_path: String,
        name: Option<String>,
        range: AxisRange,
        events: UnboundedReceiver<DeviceEvent>,
    ) -> Self {
        Self {
            device_path,
            name,
            range,
            events,
            reader: None,
            analog: SubscriberList::new(),
            buttons: SubscriberList::new(),
            lost: false,
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Human-readable device name reported by the kernel.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn dispatch(&mut self, event: DeviceEvent) -> Result<()> {
        match event {
            DeviceEvent::Axis { code, value } => {
                let sample = if is_hat(code) {
                    f64::from(value)
                } else {
                    self.range.normalize(value)
                };
                self.analog.for_index(usize::from(code), |cb| cb(sample));
            }
            DeviceEvent::Key { code, value } => {
                // value 2 is key autorepeat; still "pressed"
                let pressed = value != 0;
                self.buttons.for_index(usize::from(code), |cb| cb(pressed));
            }
            DeviceEvent::Lost(reason) => {
                self.lost = true;
                warn!("Input device {} lost: {}", self.device_path, reason);
                return Err(AnalogFlyError::Device(format!(
                    "{}: {}",
                    self.device_path, reason
                )));
            }
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        if self.lost {
            return Ok(());
        }

        let mut delivered = 0usize;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.dispatch(event)?;
                    delivered += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if delivered > 0 {
            debug!("Delivered {} events from {}", delivered, self.device_path);
        }
        Ok(())
    }
}

impl AnalogSource for EvdevJoystick {
    fn subscribe(&mut self, channel: usize, callback: AnalogCallback) -> SubscriptionId {
        self.analog.add(channel, callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.analog.remove(id)
    }

    fn pump(&mut self) -> Result<()> {
        self.drain()
    }
}

impl ButtonSource for EvdevJoystick {
    fn subscribe(&mut self, button: usize, callback: ButtonCallback) -> SubscriptionId {
        self.buttons.add(button, callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.buttons.remove(id)
    }

    fn pump(&mut self) -> Result<()> {
        self.drain()
    }
}

impl Drop for EvdevJoystick {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
            debug!("Stopped reading {}", self.device_path);
        }
    }
}
