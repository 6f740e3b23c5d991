//! Unit quaternions.
//!
//! Tracker reports carry orientation as `(x, y, z, w)`.

use super::rotation::Mat3;

/// A quaternion `w + xi + yj + zk`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Converts a rotation matrix to a unit quaternion (Shepperd's method).
    ///
    /// The result always has `w >= 0`.
    #[must_use]
    pub fn from_rotation(m: &Mat3) -> Self {
        let m = |r, c| m.get(r, c);
        let trace = m(0, 0) + m(1, 1) + m(2, 2);

        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quat::new(
                (m(2, 1) - m(1, 2)) / s,
                (m(0, 2) - m(2, 0)) / s,
                (m(1, 0) - m(0, 1)) / s,
                0.25 * s,
            )
        } else if m(0, 0) > m(1, 1) && m(0, 0) > m(2, 2) {
            let s = (1.0 + m(0, 0) - m(1, 1) - m(2, 2)).sqrt() * 2.0;
            Quat::new(
                0.25 * s,
                (m(0, 1) + m(1, 0)) / s,
                (m(0, 2) + m(2, 0)) / s,
                (m(2, 1) - m(1, 2)) / s,
            )
        } else if m(1, 1) > m(2, 2) {
            let s = (1.0 + m(1, 1) - m(0, 0) - m(2, 2)).sqrt() * 2.0;
            Quat::new(
                (m(0, 1) + m(1, 0)) / s,
                0.25 * s,
                (m(1, 2) + m(2, 1)) / s,
                (m(0, 2) - m(2, 0)) / s,
            )
        } else {
            let s = (1.0 + m(2, 2) - m(0, 0) - m(1, 1)).sqrt() * 2.0;
            Quat::new(
                (m(0, 2) + m(2, 0)) / s,
                (m(1, 2) + m(2, 1)) / s,
                0.25 * s,
                (m(1, 0) - m(0, 1)) / s,
            )
        };

        let q = q.normalized();
        if q.w < 0.0 {
            Quat::new(-q.x, -q.y, -q.z, -q.w)
        } else {
            q
        }
    }

    #[must_use]
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    #[must_use]
    pub fn normalized(&self) -> Self {
        let n = self.norm();
        if n > 0.0 {
            Quat::new(self.x / n, self.y / n, self.z / n, self.w / n)
        } else {
            Quat::IDENTITY
        }
    }

    #[must_use]
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-12;

    fn to_rotation(q: &Quat) -> Mat3 {
        let Quat { x, y, z, w } = *q;
        Mat3::from_rows([
            [1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - z * w), 2.0 * (x * z + y * w)],
            [2.0 * (x * y + z * w), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - x * w)],
            [2.0 * (x * z - y * w), 2.0 * (y * z + x * w), 1.0 - 2.0 * (x * x + y * y)],
        ])
    }

    // q and -q are the same rotation
    fn same_rotation(a: &Quat, b: &Quat, eps: f64) -> bool {
        let dot = a.x * b.x + a.y * b.y + a.z * b.z + a.w * b.w;
        (dot.abs() - 1.0).abs() <= eps
    }

    #[test]
    fn test_identity_matrix_gives_identity_quat() {
        assert_eq!(Quat::from_rotation(&Mat3::IDENTITY), Quat::IDENTITY);
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let q = Quat::from_rotation(&Mat3::rotation_z(FRAC_PI_2));
        let half = FRAC_PI_2 * 0.5;
        assert!((q.z - half.sin()).abs() < EPS);
        assert!((q.w - half.cos()).abs() < EPS);
        assert!(q.x.abs() < EPS && q.y.abs() < EPS);
    }

    #[test]
    fn test_half_turn_takes_non_trace_branch() {
        // trace = -1 for a half turn about X
        let q = Quat::from_rotation(&Mat3::rotation_x(PI));
        assert!(same_rotation(&q, &Quat::new(1.0, 0.0, 0.0, 0.0), 1e-9));

        let q = Quat::from_rotation(&Mat3::rotation_y(PI));
        assert!(same_rotation(&q, &Quat::new(0.0, 1.0, 0.0, 0.0), 1e-9));

        let q = Quat::from_rotation(&Mat3::rotation_z(PI));
        assert!(same_rotation(&q, &Quat::new(0.0, 0.0, 1.0, 0.0), 1e-9));
    }

    #[test]
    fn test_matches_axis_angle_for_compound_rotation() {
        let m = Mat3::from_xyz(0.4, -0.9, 1.7);
        let q = Quat::from_rotation(&m);
        assert!((q.norm() - 1.0).abs() < EPS);
        assert!(q.w >= 0.0);
        assert!(to_rotation(&q).approx_eq(&m, 1e-9));
    }

    #[test]
    fn test_normalized_zero_falls_back_to_identity() {
        assert_eq!(Quat::new(0.0, 0.0, 0.0, 0.0).normalized(), Quat::IDENTITY);
    }
}
