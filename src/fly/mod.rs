//! # Fly Module
//!
//! Turns analog axes into a flying 6DOF pose.
//!
//! This module handles:
//! - Axis mappings and the dead-zone/power response curve ([`axis`])
//! - Subscribing one axis to one analog channel ([`binding`])
//! - Integrating per-axis rates into a pose ([`integrator`])
//! - Edge-triggered pose reset from a button ([`reset`])
//! - Report rate limiting and new-subscriber resync ([`gate`])
//! - The tracker tying it all together ([`tracker`])
//!
//! ## Axes
//!
//! | Axis | Effect per unit rate per second |
//! |------|---------------------------------|
//! | x, y, z | one unit of translation along the current heading |
//! | rx, ry, rz | one full turn about the local axis |

pub mod axis;
pub mod binding;
pub mod gate;
pub mod integrator;
pub mod reset;
pub mod tracker;

pub use axis::{AxisMapping, AxisSet, Dof};
pub use tracker::{AnalogFlyTracker, TickOutcome, TrackerParams};
