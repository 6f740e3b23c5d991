//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{AnalogFlyError, Result};
use crate::fly::axis::{AxisMapping, AxisSet, Dof};
use crate::fly::reset::ResetButton;
use crate::fly::tracker::{TrackerParams, DEFAULT_UPDATE_INTERVAL};
use crate::math::{Pose, Vec3};
use crate::source::joystick::AxisRange;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    #[serde(default)]
    pub axes: BTreeMap<Dof, AxisConfig>,

    #[serde(default)]
    pub reset: Option<ResetConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracker timing and identity
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// At most this many regular reports per second, rounded up to whole
    /// ticks (250 Hz ticks at 60 Hz give about 50)
    #[serde(default = "default_update_rate_hz")]
    pub update_rate_hz: f64,

    /// Ticks (pump + integrate) per second
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: f64,

    #[serde(default)]
    pub sensor: u32,

    #[serde(default)]
    pub initial_position: [f64; 3],
}

/// Report server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Serve reports over TCP; otherwise they are written to stdout
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,

    #[serde(default = "default_listen")]
    pub listen: String,

    /// Reports buffered per slow client
    #[serde(default = "default_backlog")]
    pub backlog: usize,
}

/// One evdev input device, referenced by name from axes and reset
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DeviceConfig {
    pub name: String,

    pub path: String,

    #[serde(default = "default_axis_min")]
    pub axis_min: i32,

    #[serde(default = "default_axis_max")]
    pub axis_max: i32,
}

/// Mapping of one degree of freedom to a device channel
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AxisConfig {
    pub device: String,

    pub channel: usize,

    #[serde(default)]
    pub threshold: f64,

    #[serde(default = "default_power")]
    pub power: f64,

    #[serde(default = "default_scale")]
    pub scale: f64,
}

/// Reset button configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ResetConfig {
    pub device: String,
    pub button: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write daily rolling log files here
    #[serde(default)]
    pub directory: Option<String>,
}

// Default value functions
fn default_update_rate_hz() -> f64 { 60.0 }
fn default_tick_rate_hz() -> f64 { 250.0 }

fn default_server_enabled() -> bool { true }
fn default_listen() -> String { "127.0.0.1:3883".to_string() }
fn default_backlog() -> usize { 64 }

fn default_axis_min() -> i32 { 0 }
fn default_axis_max() -> i32 { 255 }

fn default_power() -> f64 { 1.0 }
fn default_scale() -> f64 { 1.0 }

fn default_log_level() -> String { "info".to_string() }

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            update_rate_hz: default_update_rate_hz(),
            tick_rate_hz: default_tick_rate_hz(),
            sensor: 0,
            initial_position: [0.0; 3],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            listen: default_listen(),
            backlog: default_backlog(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl AxisConfig {
    /// Mapping handed to the tracker
    pub fn mapping(&self) -> AxisMapping {
        AxisMapping::new(self.device.clone(), self.channel)
            .with_threshold(self.threshold)
            .with_power(self.power)
            .with_scale(self.scale)
    }
}

impl DeviceConfig {
    pub fn axis_range(&self) -> AxisRange {
        AxisRange::new(self.axis_min, self.axis_max)
    }
}

fn config_error(msg: impl std::fmt::Display) -> AnalogFlyError {
    AnalogFlyError::Config(toml::de::Error::custom(msg))
}

fn period(rate_hz: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(1.0 / rate_hz).unwrap_or(fallback)
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use analog_fly::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `Config` for out-of-range settings or unknown device
    /// references, and `InvalidAxis` for a malformed axis mapping.
    pub fn validate(&self) -> Result<()> {
        let rate_ok = |hz: f64| hz.is_finite() && hz > 0.0 && hz <= 10_000.0;
        if !rate_ok(self.tracker.update_rate_hz) {
            return Err(config_error("update_rate_hz must be between 0 and 10000"));
        }
        if !rate_ok(self.tracker.tick_rate_hz) {
            return Err(config_error("tick_rate_hz must be between 0 and 10000"));
        }
        if self.tracker.initial_position.iter().any(|v| !v.is_finite()) {
            return Err(config_error("initial_position must be finite"));
        }

        if self.server.enabled {
            if self.server.listen.parse::<SocketAddr>().is_err() {
                return Err(config_error(format!(
                    "listen address '{}' is not a valid socket address",
                    self.server.listen
                )));
            }
            if self.server.backlog == 0 {
                return Err(config_error("backlog must be greater than 0"));
            }
        }

        for (i, device) in self.devices.iter().enumerate() {
            if device.name.is_empty() {
                return Err(config_error(format!("device #{} has an empty name", i)));
            }
            if device.path.is_empty() {
                return Err(config_error(format!("device '{}' has an empty path", device.name)));
            }
            if device.axis_min == device.axis_max {
                return Err(config_error(format!(
                    "device '{}' axis_min and axis_max must differ",
                    device.name
                )));
            }
            if self.devices[..i].iter().any(|d| d.name == device.name) {
                return Err(config_error(format!("duplicate device name '{}'", device.name)));
            }
        }

        for (dof, axis) in &self.axes {
            if self.device(&axis.device).is_none() {
                return Err(config_error(format!(
                    "axis {} references unknown device '{}'",
                    dof, axis.device
                )));
            }
            axis.mapping().validate(*dof)?;
        }

        if let Some(reset) = &self.reset {
            if self.device(&reset.device).is_none() {
                return Err(config_error(format!(
                    "reset references unknown device '{}'",
                    reset.device
                )));
            }
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(config_error(format!(
                "logging level '{}' must be one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }
        if matches!(&self.logging.directory, Some(dir) if dir.is_empty()) {
            return Err(config_error("logging directory cannot be empty when set"));
        }

        Ok(())
    }

    /// Device entry by name
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Minimum time between regular reports
    pub fn update_interval(&self) -> Duration {
        period(self.tracker.update_rate_hz, DEFAULT_UPDATE_INTERVAL)
    }

    /// Time between ticks
    pub fn tick_period(&self) -> Duration {
        period(self.tracker.tick_rate_hz, Duration::from_millis(4))
    }

    /// Tracker construction parameters; unmapped axes are disabled
    pub fn tracker_params(&self) -> TrackerParams {
        TrackerParams {
            axes: AxisSet::from_fn(|dof| {
                self.axes
                    .get(&dof)
                    .map_or_else(AxisMapping::disabled, AxisConfig::mapping)
            }),
            reset: self
                .reset
                .as_ref()
                .map(|r| ResetButton::new(r.device.clone(), r.button)),
            update_interval: self.update_interval(),
            sensor: self.tracker.sensor,
            initial_pose: Pose::from_position(Vec3::from(self.tracker.initial_position)),
        }
    }
}
