//! # Analog Fly Library
//!
//! Emulates a 6DOF tracker whose pose is flown around with joystick axes.
//!
//! Each tick the tracker reads its analog inputs, turns them into per-axis
//! velocities through a dead-zone/power response curve, integrates those
//! into a position and orientation, and publishes the pose at a bounded
//! rate to whoever is listening.

pub mod config;
pub mod error;
pub mod fly;
pub mod math;
pub mod runner;
pub mod session;
pub mod source;
