//! # Pose Integrator Module
//!
//! Integrates six axis rates over elapsed time into an accumulated pose.
//!
//! ## Flying
//!
//! Rates are applied in the pose's *current* local frame, like flying a
//! craft rather than pushing a cursor around a fixed world:
//!
//! 1. `displacement = (rate_x, rate_y, rate_z) * dt`, along the current heading
//! 2. `angle_i = rate_i * dt * 2π` for each rotation axis (rates are in
//!    revolutions per second), combined as `Rz * Ry * Rx` (X applied first)
//! 3. `current = current ∘ (increment rotation, displacement)`
//!
//! The step translates along the heading the operator had *before* this
//! step's turn is applied, then turns.

use std::f64::consts::TAU;

use super::axis::{AxisSet, Dof};
use crate::math::{Mat3, Pose, Vec3};

/// Owns the accumulated pose and the pose it resets to.
#[derive(Debug, Clone)]
pub struct PoseIntegrator {
    initial: Pose,
    current: Pose,
}

impl Default for PoseIntegrator {
    fn default() -> Self {
        Self::new(Pose::IDENTITY)
    }
}

impl PoseIntegrator {
    /// Starts at `initial`, which is also the reset target.
    #[must_use]
    pub fn new(initial: Pose) -> Self {
        Self {
            initial,
            current: initial,
        }
    }

    #[must_use]
    pub fn current(&self) -> &Pose {
        &self.current
    }

    #[must_use]
    pub fn initial(&self) -> &Pose {
        &self.initial
    }

    /// Advances the pose by `dt` seconds at the given rates.
    ///
    /// A zero, negative or non-finite `dt` leaves the pose untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use analog_fly::fly::axis::{AxisSet, Dof};
    /// use analog_fly::fly::integrator::PoseIntegrator;
    ///
    /// let mut integrator = PoseIntegrator::default();
    /// let mut rates = AxisSet::<f64>::default();
    /// rates[Dof::X] = 0.09;
    ///
    /// integrator.advance(&rates, 1.0);
    /// assert!((integrator.current().position.x - 0.09).abs() < 1e-12);
    /// ```
    pub fn advance(&mut self, rates: &AxisSet<f64>, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let displacement = Vec3::new(rates[Dof::X], rates[Dof::Y], rates[Dof::Z]) * dt;
        let turn = dt * TAU;
        let rotation = Mat3::from_xyz(
            rates[Dof::RotX] * turn,
            rates[Dof::RotY] * turn,
            rates[Dof::RotZ] * turn,
        );

        let next = self.current.compose(&Pose::new(displacement, rotation));
        self.current = Pose::new(next.position, next.orientation.orthonormalized());
    }

    /// Returns to the initial pose, exactly.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn rates(values: &[(Dof, f64)]) -> AxisSet<f64> {
        let mut set = AxisSet::default();
        for &(dof, v) in values {
            set[dof] = v;
        }
        set
    }

    #[test]
    fn test_x_rate_over_one_second() {
        let mut integrator = PoseIntegrator::default();
        integrator.advance(&rates(&[(Dof::X, 0.09)]), 1.0);

        let pos = integrator.current().position;
        assert!((pos.x - 0.09).abs() < EPS);
        assert!(pos.y.abs() < EPS && pos.z.abs() < EPS);
    }

    #[test]
    fn test_zero_rates_do_not_move() {
        let mut integrator = PoseIntegrator::default();
        integrator.advance(&AxisSet::default(), 10.0);
        assert_eq!(*integrator.current(), Pose::IDENTITY);
    }

    #[test]
    fn test_non_positive_dt_is_ignored() {
        let mut integrator = PoseIntegrator::default();
        let r = rates(&[(Dof::X, 1.0), (Dof::RotZ, 0.5)]);

        integrator.advance(&r, 0.0);
        integrator.advance(&r, -1.0);
        integrator.advance(&r, f64::NAN);
        integrator.advance(&r, f64::INFINITY);

        assert_eq!(*integrator.current(), Pose::IDENTITY);
    }

    #[test]
    fn test_rotation_rate_is_revolutions_per_second() {
        let mut integrator = PoseIntegrator::default();
        // A quarter revolution about Z in one second.
        integrator.advance(&rates(&[(Dof::RotZ, 0.25)]), 1.0);
        assert!(integrator
            .current()
            .orientation
            .approx_eq(&Mat3::rotation_z(FRAC_PI_2), EPS));
    }

    #[test]
    fn test_translation_follows_heading() {
        let mut integrator = PoseIntegrator::default();
        integrator.advance(&rates(&[(Dof::RotZ, 0.25)]), 1.0);
        integrator.advance(&rates(&[(Dof::X, 1.0)]), 2.0);

        // Facing +Y after the turn, so "forward along X" moves along world Y.
        assert!(integrator
            .current()
            .position
            .approx_eq(Vec3::new(0.0, 2.0, 0.0), EPS));
    }

    #[test]
    fn test_translation_uses_pre_rotation_heading() {
        let mut integrator = PoseIntegrator::default();
        // Move and turn in the same step: the move uses the old heading.
        integrator.advance(&rates(&[(Dof::X, 1.0), (Dof::RotZ, 0.25)]), 1.0);

        let pose = integrator.current();
        assert!(pose.position.approx_eq(Vec3::new(1.0, 0.0, 0.0), EPS));
        assert!(pose.orientation.approx_eq(&Mat3::rotation_z(FRAC_PI_2), EPS));
    }

    #[test]
    fn test_additivity_translation() {
        let r = rates(&[(Dof::X, 0.3), (Dof::Y, -1.2), (Dof::Z, 0.7)]);

        let mut split = PoseIntegrator::default();
        split.advance(&r, 0.25);
        split.advance(&r, 0.5);

        let mut once = PoseIntegrator::default();
        once.advance(&r, 0.75);

        assert!(split.current().approx_eq(once.current(), EPS));
    }

    #[test]
    fn test_additivity_single_axis_rotation() {
        let r = rates(&[(Dof::RotY, 0.4)]);

        let mut split = PoseIntegrator::default();
        split.advance(&r, 0.1);
        split.advance(&r, 0.3);

        let mut once = PoseIntegrator::default();
        once.advance(&r, 0.4);

        assert!(split.current().approx_eq(once.current(), EPS));
    }

    #[test]
    fn test_additivity_translation_along_rotation_axis() {
        // Climbing along Z while yawing about Z: the move never leaves the axis.
        let r = rates(&[(Dof::Z, 2.0), (Dof::RotZ, 0.3)]);

        let mut split = PoseIntegrator::default();
        split.advance(&r, 0.6);
        split.advance(&r, 0.9);

        let mut once = PoseIntegrator::default();
        once.advance(&r, 1.5);

        assert!(split.current().approx_eq(once.current(), EPS));
    }

    #[test]
    fn test_reset_restores_initial_exactly() {
        let initial = Pose::from_position(Vec3::new(1.0, 2.0, 3.0));
        let mut integrator = PoseIntegrator::new(initial);
        let r = rates(&[
            (Dof::X, 0.7),
            (Dof::Y, 0.1),
            (Dof::RotX, 0.2),
            (Dof::RotY, -0.35),
            (Dof::RotZ, 0.05),
        ]);
        for _ in 0..50 {
            integrator.advance(&r, 0.016);
        }
        assert_ne!(*integrator.current(), initial);

        integrator.reset();
        assert_eq!(*integrator.current(), initial);
        assert_eq!(*integrator.initial(), initial);
    }

    #[test]
    fn test_long_flight_stays_orthonormal() {
        let mut integrator = PoseIntegrator::default();
        let r = rates(&[(Dof::RotX, 0.31), (Dof::RotY, -0.17), (Dof::RotZ, 0.53)]);
        for _ in 0..10_000 {
            integrator.advance(&r, 0.01);
        }
        let m = integrator.current().orientation;
        assert!((m * m.transpose()).approx_eq(&Mat3::IDENTITY, 1e-9));
        assert!((m.determinant() - 1.0).abs() < 1e-9);
    }
}
