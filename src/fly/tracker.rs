//! # Analog Fly Tracker
//!
//! A single-sensor tracker whose pose is flown around by analog inputs.
//!
//! ## Tick
//!
//! [`AnalogFlyTracker::tick`] is the only thing the embedding program has
//! to call, typically a few hundred times per second:
//!
//! 1. Pump every distinct analog/button source once
//! 2. Apply reset-button presses seen during the pump
//! 3. Integrate the axis rates over the time since the previous tick
//!    (zero on the first tick)
//! 4. Ask the publish gate whether to report, and hand the pose to the sink
//!
//! Source and sink failures never abort a tick: the affected axis reads zero
//! or the report is dropped, and the failure is logged.
//!
//! ## Usage
//!
//! ```
//! use analog_fly::fly::axis::{AxisMapping, Dof};
//! use analog_fly::fly::tracker::{AnalogFlyTracker, TrackerParams};
//! use analog_fly::session::jsonl::JsonlSink;
//! use analog_fly::session::SubscriberNotifier;
//! use analog_fly::source::scripted::ScriptedDevice;
//! use analog_fly::source::SourceRegistry;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::{Duration, Instant};
//!
//! let stick = Rc::new(RefCell::new(ScriptedDevice::new()));
//! let mut registry = SourceRegistry::new();
//! registry.insert_device("stick", stick.clone());
//!
//! let mut params = TrackerParams::default();
//! params.axes[Dof::X] = AxisMapping::new("stick", 0);
//!
//! let mut tracker = AnalogFlyTracker::new(
//!     params,
//!     &mut registry,
//!     JsonlSink::new(Vec::new()),
//!     SubscriberNotifier::new(),
//! )?;
//!
//! let start = Instant::now();
//! stick.borrow_mut().set_analog(0, 0.5);
//! tracker.tick(start);
//! tracker.tick(start + Duration::from_secs(2));
//! assert!((tracker.pose().position.x - 1.0).abs() < 1e-9);
//! # Ok::<(), analog_fly::error::AnalogFlyError>(())
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::axis::{AxisMapping, AxisSet, Dof};
use super::binding::ChannelBinding;
use super::gate::{PublishGate, PublishReason};
use super::integrator::PoseIntegrator;
use super::reset::{ResetButton, ResetController};
use crate::error::Result;
use crate::math::Pose;
use crate::session::{ReportSink, SubscriberNotifier, TrackerReport};
use crate::source::{source_addr, SharedAnalog, SharedButton, SourceResolver};

/// Default report interval (60 Hz).
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_micros(16_667);

/// Construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerParams {
    /// One mapping per degree of freedom; disabled axes contribute nothing.
    pub axes: AxisSet<AxisMapping>,
    /// Button that snaps the pose back to `initial_pose`.
    pub reset: Option<ResetButton>,
    /// Minimum time between regular reports.
    pub update_interval: Duration,
    /// Sensor index carried by every report.
    pub sensor: u32,
    /// Starting pose and reset target.
    pub initial_pose: Pose,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            axes: AxisSet::default(),
            reset: None,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            sensor: 0,
            initial_pose: Pose::IDENTITY,
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Time integrated this tick.
    pub dt: Duration,
    /// Reset-button presses applied this tick.
    pub resets: u32,
    /// Set when the gate decided to publish; see
    /// [`AnalogFlyTracker::reports`] for successful deliveries.
    pub published: Option<PublishReason>,
}

enum PumpTarget {
    Analog(SharedAnalog),
    Button(SharedButton),
}

impl PumpTarget {
    fn addr(&self) -> *const () {
        match self {
            PumpTarget::Analog(source) => source_addr(source),
            PumpTarget::Button(source) => source_addr(source),
        }
    }

    fn pump(&self) -> Result<()> {
        match self {
            PumpTarget::Analog(source) => source.borrow_mut().pump(),
            PumpTarget::Button(source) => source.borrow_mut().pump(),
        }
    }
}

/// Emulated tracker driven by analog inputs.
pub struct AnalogFlyTracker<S: ReportSink> {
    sensor: u32,
    bindings: AxisSet<Option<ChannelBinding>>,
    reset: ResetController,
    pump_targets: Vec<PumpTarget>,
    integrator: PoseIntegrator,
    gate: PublishGate,
    sink: S,
    previous_tick: Option<Instant>,
    ticks: u64,
    reports: u64,
}

impl<S: ReportSink> std::fmt::Debug for AnalogFlyTracker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalogFlyTracker")
            .field("sensor", &self.sensor)
            .field("pose", self.integrator.current())
            .field("ticks", &self.ticks)
            .field("reports", &self.reports)
            .finish_non_exhaustive()
    }
}

impl<S: ReportSink> AnalogFlyTracker<S> {
    /// Validates `params`, binds every enabled axis and the reset button.
    ///
    /// An axis or reset button whose source cannot be resolved is logged and
    /// left inert; the tracker still starts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAxis` if any enabled mapping is malformed.
    pub fn new(
        params: TrackerParams,
        resolver: &mut dyn SourceResolver,
        sink: S,
        notifier: SubscriberNotifier,
    ) -> Result<Self> {
        for (dof, mapping) in params.axes.iter() {
            mapping.validate(dof)?;
        }

        let bindings = params.axes.map(|dof, mapping| {
            match ChannelBinding::setup(dof, mapping, &mut *resolver) {
                Ok(binding) => binding,
                Err(e) => {
                    warn!("Axis {} left inert: {}", dof, e);
                    None
                }
            }
        });

        let reset = match ResetController::setup(params.reset.as_ref(), &mut *resolver) {
            Ok(reset) => reset,
            Err(e) => {
                warn!("Reset button left inert: {}", e);
                ResetController::inert()
            }
        };

        let mut pump_targets: Vec<PumpTarget> = Vec::new();
        let candidates = bindings
            .iter()
            .filter_map(|(_, b)| b.as_ref())
            .map(|b| PumpTarget::Analog(b.source().clone()))
            .chain(reset.source().cloned().map(PumpTarget::Button));
        for target in candidates {
            if !pump_targets.iter().any(|t| t.addr() == target.addr()) {
                pump_targets.push(target);
            }
        }

        let bound: Vec<String> = bindings
            .iter()
            .filter(|(_, b)| b.is_some())
            .map(|(dof, _)| dof.to_string())
            .collect();
        info!(
            "Analog fly tracker ready: sensor {}, axes [{}], reset {}, {} sources, update every {:?}",
            params.sensor,
            bound.join(", "),
            if reset.is_active() { "bound" } else { "off" },
            pump_targets.len(),
            params.update_interval
        );

        Ok(Self {
            sensor: params.sensor,
            bindings,
            reset,
            pump_targets,
            integrator: PoseIntegrator::new(params.initial_pose),
            gate: PublishGate::new(params.update_interval, notifier),
            sink,
            previous_tick: None,
            ticks: 0,
            reports: 0,
        })
    }

    /// Runs one pump → integrate → publish cycle at time `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        self.pump_sources();

        let resets = self.reset.take_pending();
        if resets > 0 {
            self.integrator.reset();
            info!("Pose reset by button");
        }

        // First tick, or a clock that went backwards, integrates nothing.
        let dt = self
            .previous_tick
            .map_or(Duration::ZERO, |prev| now.saturating_duration_since(prev));
        self.previous_tick = Some(now);

        let rates = self.rates();
        self.integrator.advance(&rates, dt.as_secs_f64());

        let published = self.gate.poll(dt);
        if let Some(reason) = published {
            self.publish(reason);
        }

        self.ticks += 1;
        TickOutcome {
            dt,
            resets,
            published,
        }
    }

    /// Snaps the pose back to the initial pose; reported on the next publish.
    pub fn reset(&mut self) {
        self.integrator.reset();
        info!("Pose reset");
    }

    /// Unsubscribes every axis and the reset button. Safe to call twice.
    pub fn shutdown(&mut self) {
        for (_, binding) in self.bindings.iter_mut() {
            if let Some(binding) = binding {
                binding.teardown();
            }
        }
        self.reset.teardown();
        self.pump_targets.clear();
        debug!("Analog fly tracker shut down after {} ticks", self.ticks);
    }

    /// Current rate of every axis (zero for unbound axes).
    #[must_use]
    pub fn rates(&self) -> AxisSet<f64> {
        self.bindings
            .map(|_, binding| binding.as_ref().map_or(0.0, ChannelBinding::rate))
    }

    #[must_use]
    pub fn pose(&self) -> &Pose {
        self.integrator.current()
    }

    #[must_use]
    pub fn initial_pose(&self) -> &Pose {
        self.integrator.initial()
    }

    #[must_use]
    pub fn is_axis_bound(&self, dof: Dof) -> bool {
        self.bindings[dof].as_ref().is_some_and(ChannelBinding::is_bound)
    }

    #[must_use]
    pub fn is_reset_bound(&self) -> bool {
        self.reset.is_active()
    }

    #[must_use]
    pub fn sensor(&self) -> u32 {
        self.sensor
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Reports successfully handed to the sink.
    #[must_use]
    pub fn reports(&self) -> u64 {
        self.reports
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn pump_sources(&mut self) {
        for target in &self.pump_targets {
            if let Err(e) = target.pump() {
                warn!("Input source failed, its axes read zero: {}", e);
                let failed = target.addr();
                for (_, binding) in self.bindings.iter() {
                    if let Some(binding) = binding {
                        if source_addr(binding.source()) == failed {
                            binding.clear();
                        }
                    }
                }
            }
        }
    }

    fn publish(&mut self, reason: PublishReason) {
        let report = TrackerReport::from_pose(self.sensor, self.integrator.current());
        match self.sink.publish(&report) {
            Ok(()) => {
                self.reports += 1;
                debug!(
                    "Published pose ({:?}): pos {:?} quat {:?}",
                    reason, report.position, report.orientation
                );
            }
            Err(e) => warn!("Failed to publish pose: {}", e),
        }
    }
}

impl<S: ReportSink> Drop for AnalogFlyTracker<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
