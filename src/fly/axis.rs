//! # Axis Mapping Module
//!
//! Per degree-of-freedom mapping from an analog channel to a motion rate.
//!
//! ## Dead Zone
//!
//! Samples whose magnitude is at or below `threshold` are treated as exactly
//! zero. The dead zone is inclusive and the remaining range is *not*
//! rescaled: a sample just above threshold keeps its full magnitude.
//!
//! ## Response Curve
//!
//! Above threshold the rate is:
//!
//! `rate = sign(raw) * (scale * |raw|) ^ power`
//!
//! - `power = 1.0`: linear response
//! - `power = 2.0`: slow near center, fast at the extremes
//!
//! Translation rates are in distance units per second; rotation rates are in
//! revolutions per second.
//!
//! ## Usage
//!
//! ```
//! use analog_fly::fly::axis::AxisMapping;
//!
//! let mapping = AxisMapping::new("joystick", 0)
//!     .with_threshold(0.1)
//!     .with_power(2.0);
//!
//! assert_eq!(mapping.rate(0.05), 0.0);           // inside dead zone
//! assert!((mapping.rate(0.3) - 0.09).abs() < 1e-12);
//! assert!((mapping.rate(-0.3) + 0.09).abs() < 1e-12);
//! ```

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::Deserialize;

use crate::error::{AnalogFlyError, Result};

/// One of the six degrees of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum Dof {
    /// Translation along local X.
    #[serde(rename = "x")]
    X,
    /// Translation along local Y.
    #[serde(rename = "y")]
    Y,
    /// Translation along local Z.
    #[serde(rename = "z")]
    Z,
    /// Rotation about local X.
    #[serde(rename = "rx")]
    RotX,
    /// Rotation about local Y.
    #[serde(rename = "ry")]
    RotY,
    /// Rotation about local Z.
    #[serde(rename = "rz")]
    RotZ,
}

impl Dof {
    /// All degrees of freedom in storage order.
    pub const ALL: [Dof; 6] = [Dof::X, Dof::Y, Dof::Z, Dof::RotX, Dof::RotY, Dof::RotZ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Dof::X => 0,
            Dof::Y => 1,
            Dof::Z => 2,
            Dof::RotX => 3,
            Dof::RotY => 4,
            Dof::RotZ => 5,
        }
    }

    #[must_use]
    pub const fn is_rotation(self) -> bool {
        matches!(self, Dof::RotX | Dof::RotY | Dof::RotZ)
    }

    /// Config key for this axis (`x`, `y`, `z`, `rx`, `ry`, `rz`).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Dof::X => "x",
            Dof::Y => "y",
            Dof::Z => "z",
            Dof::RotX => "rx",
            Dof::RotY => "ry",
            Dof::RotZ => "rz",
        }
    }
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Six values, one per [`Dof`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisSet<T>([T; 6]);

impl<T> AxisSet<T> {
    /// Builds a set by calling `f` once per axis in [`Dof::ALL`] order.
    pub fn from_fn(mut f: impl FnMut(Dof) -> T) -> Self {
        Self(Dof::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dof, &T)> {
        Dof::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Dof, &mut T)> {
        Dof::ALL.into_iter().zip(self.0.iter_mut())
    }

    pub fn map<U>(&self, mut f: impl FnMut(Dof, &T) -> U) -> AxisSet<U> {
        AxisSet::from_fn(|dof| f(dof, &self.0[dof.index()]))
    }
}

impl<T> Index<Dof> for AxisSet<T> {
    type Output = T;

    fn index(&self, dof: Dof) -> &T {
        &self.0[dof.index()]
    }
}

impl<T> IndexMut<Dof> for AxisSet<T> {
    fn index_mut(&mut self, dof: Dof) -> &mut T {
        &mut self.0[dof.index()]
    }
}

/// Static mapping of one degree of freedom to an analog channel.
///
/// An axis without a source is disabled and always contributes zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisMapping {
    /// Name of the analog device, `None` when the axis is disabled.
    pub source: Option<String>,
    /// Channel index on that device.
    pub channel: usize,
    /// Dead zone half-width (>= 0).
    pub threshold: f64,
    /// Response exponent.
    pub power: f64,
    /// Multiplier applied before the exponent.
    pub scale: f64,
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self::disabled()
    }
}

impl AxisMapping {
    /// An axis with no source.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            source: None,
            channel: 0,
            threshold: 0.0,
            power: 1.0,
            scale: 1.0,
        }
    }

    /// A linear, dead-zone-free mapping of `channel` on `source`.
    #[must_use]
    pub fn new(source: impl Into<String>, channel: usize) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::disabled()
        }
        .with_channel(channel)
    }

    #[must_use]
    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Checks the numeric parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAxis` for a negative or non-finite threshold, or a
    /// non-finite power or scale. Disabled axes are never rejected.
    pub fn validate(&self, dof: Dof) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let invalid = |reason: &str| AnalogFlyError::InvalidAxis {
            axis: dof,
            reason: reason.to_string(),
        };

        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(invalid("threshold must be a finite value >= 0"));
        }
        if !self.power.is_finite() {
            return Err(invalid("power must be finite"));
        }
        if !self.scale.is_finite() {
            return Err(invalid("scale must be finite"));
        }
        if self.source.as_deref().is_some_and(str::is_empty) {
            return Err(invalid("source name cannot be empty"));
        }
        Ok(())
    }

    /// Response curve for this axis. See [`response_rate`].
    #[must_use]
    pub fn rate(&self, raw: f64) -> f64 {
        response_rate(raw, self)
    }
}

/// Maps a raw sample to a signed rate.
///
/// Disabled mappings always yield zero. Samples with `|raw| <= threshold`
/// yield zero, which also avoids evaluating `0 ^ power`.
#[must_use]
pub fn response_rate(raw: f64, mapping: &AxisMapping) -> f64 {
    if !mapping.is_enabled() || !raw.is_finite() {
        return 0.0;
    }

    let abs_raw = raw.abs();
    if abs_raw <= mapping.threshold {
        return 0.0;
    }

    let magnitude = mapping.scale * abs_raw;
    let shaped = if magnitude == 0.0 {
        0.0
    } else if magnitude > 0.0 {
        magnitude.powf(mapping.power)
    } else {
        // Negative scale reverses the axis.
        -(-magnitude).powf(mapping.power)
    };
    raw.signum() * shaped
}
