//! Rigid transforms.

use super::quat::Quat;
use super::rotation::Mat3;
use super::vector::Vec3;

/// A rigid transform: orientation followed by translation.
///
/// A point `p` expressed in the pose's local frame maps to
/// `orientation * p + position` in the parent frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Mat3,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Mat3::IDENTITY,
    };

    #[must_use]
    pub const fn new(position: Vec3, orientation: Mat3) -> Self {
        Self { position, orientation }
    }

    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self::new(position, Mat3::IDENTITY)
    }

    /// Returns `self ∘ local`: `local` is interpreted in this pose's frame.
    ///
    /// The translation of `local` is rotated by this pose's orientation
    /// (not by `local`'s own rotation) before being added.
    #[must_use]
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.position + self.orientation * local.position,
            orientation: self.orientation * local.orientation,
        }
    }

    #[must_use]
    pub fn quaternion(&self) -> Quat {
        Quat::from_rotation(&self.orientation)
    }

    #[must_use]
    pub fn approx_eq(&self, other: &Pose, eps: f64) -> bool {
        self.position.approx_eq(other.position, eps)
            && self.orientation.approx_eq(&other.orientation, eps)
    }
}
