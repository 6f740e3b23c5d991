//! # Math Module
//!
//! Minimal rigid-body linear algebra used by the pose integrator.
//!
//! This module provides:
//! - [`Vec3`] for positions and displacements
//! - [`Mat3`] rotation matrices (column-vector convention, `v' = M * v`)
//! - [`Quat`] unit quaternions for tracker reports
//! - [`Pose`] rigid transforms and their composition

pub mod pose;
pub mod quat;
pub mod rotation;
pub mod vector;

pub use pose::Pose;
pub use quat::Quat;
pub use rotation::Mat3;
pub use vector::Vec3;
