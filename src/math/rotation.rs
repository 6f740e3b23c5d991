//! Rotation matrices.
//!
//! Matrices are stored row-major and act on column vectors, so
//! `a * b` applied to `v` rotates by `b` first and `a` second.

use std::ops::Mul;

use super::vector::Vec3;

/// A 3x3 matrix, used here as a rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    rows: [[f64; 3]; 3],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    #[must_use]
    pub const fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self { rows }
    }

    /// Right-handed rotation of `angle` radians about the X axis.
    #[must_use]
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]])
    }

    /// Right-handed rotation of `angle` radians about the Y axis.
    #[must_use]
    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]])
    }

    /// Right-handed rotation of `angle` radians about the Z axis.
    #[must_use]
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Rotation about X by `rx`, then Y by `ry`, then Z by `rz`.
    ///
    /// Equivalent to `Rz * Ry * Rx`.
    #[must_use]
    pub fn from_xyz(rx: f64, ry: f64, rz: f64) -> Self {
        Self::rotation_z(rz) * Self::rotation_y(ry) * Self::rotation_x(rx)
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    #[must_use]
    pub fn column(&self, col: usize) -> Vec3 {
        Vec3::new(self.rows[0][col], self.rows[1][col], self.rows[2][col])
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let r = &self.rows;
        Self::from_rows([
            [r[0][0], r[1][0], r[2][0]],
            [r[0][1], r[1][1], r[2][1]],
            [r[0][2], r[1][2], r[2][2]],
        ])
    }

    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.column(0).dot(self.column(1).cross(self.column(2)))
    }

    /// Re-orthonormalizes the columns (Gram-Schmidt), keeping the X column's
    /// direction fixed.
    ///
    /// Repeated multiplication slowly drifts away from a pure rotation; this
    /// pulls the matrix back without noticeably changing it.
    #[must_use]
    pub fn orthonormalized(&self) -> Self {
        let x = self.column(0).normalized();
        let y = (self.column(1) - x * x.dot(self.column(1))).normalized();
        let z = x.cross(y);
        Self::from_rows([[x.x, y.x, z.x], [x.y, y.y, z.y], [x.z, y.z, z.z]])
    }

    /// Element-wise comparison within `eps`.
    #[must_use]
    pub fn approx_eq(&self, other: &Mat3, eps: f64) -> bool {
        self.rows
            .iter()
            .flatten()
            .zip(other.rows.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

impl Mul for Mat3 {
    type Output = Mat3;

    fn mul(self, rhs: Mat3) -> Mat3 {
        let mut rows = [[0.0; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.rows[i][k] * rhs.rows[k][j]).sum();
            }
        }
        Mat3::from_rows(rows)
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;

    fn mul(self, v: Vec3) -> Vec3 {
        let r = &self.rows;
        Vec3::new(
            r[0][0] * v.x + r[0][1] * v.y + r[0][2] * v.z,
            r[1][0] * v.x + r[1][1] * v.y + r[1][2] * v.z,
            r[2][0] * v.x + r[2][1] * v.y + r[2][2] * v.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_quarter_turn_about_z_maps_x_to_y() {
        let r = Mat3::rotation_z(FRAC_PI_2);
        assert!((r * Vec3::new(1.0, 0.0, 0.0)).approx_eq(Vec3::new(0.0, 1.0, 0.0), EPS));
    }

    #[test]
    fn test_quarter_turn_about_x_maps_y_to_z() {
        let r = Mat3::rotation_x(FRAC_PI_2);
        assert!((r * Vec3::new(0.0, 1.0, 0.0)).approx_eq(Vec3::new(0.0, 0.0, 1.0), EPS));
    }

    #[test]
    fn test_quarter_turn_about_y_maps_z_to_x() {
        let r = Mat3::rotation_y(FRAC_PI_2);
        assert!((r * Vec3::new(0.0, 0.0, 1.0)).approx_eq(Vec3::new(1.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn test_from_xyz_applies_x_first() {
        // X quarter turn takes Y to Z, then the Z quarter turn leaves Z alone.
        let r = Mat3::from_xyz(FRAC_PI_2, 0.0, FRAC_PI_2);
        assert!((r * Vec3::new(0.0, 1.0, 0.0)).approx_eq(Vec3::new(0.0, 0.0, 1.0), EPS));

        // Applying Z first would have taken Y to -X instead.
        let wrong_order = Mat3::rotation_x(FRAC_PI_2) * Mat3::rotation_z(FRAC_PI_2);
        assert!(!(wrong_order * Vec3::new(0.0, 1.0, 0.0)).approx_eq(Vec3::new(0.0, 0.0, 1.0), EPS));
    }

    #[test]
    fn test_transpose_inverts_rotation() {
        let r = Mat3::from_xyz(0.3, -1.1, 2.0);
        assert!((r * r.transpose()).approx_eq(&Mat3::IDENTITY, EPS));
        assert!((r.determinant() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_orthonormalized_repairs_drift() {
        let drifted = Mat3::from_rows([[1.001, 0.002, 0.0], [0.0, 0.999, 0.001], [0.0, 0.0, 1.002]]);
        let fixed = drifted.orthonormalized();
        assert!((fixed * fixed.transpose()).approx_eq(&Mat3::IDENTITY, EPS));
        assert!((fixed.determinant() - 1.0).abs() < EPS);
        assert!(fixed.approx_eq(&Mat3::IDENTITY, 0.01));
    }

    #[test]
    fn test_orthonormalized_keeps_rotation() {
        let r = Mat3::from_xyz(0.5, 0.25, -0.75);
        assert!(r.orthonormalized().approx_eq(&r, 1e-9));
    }
}
