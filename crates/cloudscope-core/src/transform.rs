//! Rigid transform with non-uniform scale for scene entities.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A transformation represented as separate components.
///
/// Volumes are placed by overwriting individual components (translation on
/// drag, scale from camera depth), so they are kept apart instead of baked
/// into a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation component.
    pub translation: Vec3,
    /// Rotation component as a quaternion.
    pub rotation: Quat,
    /// Scale component.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates a new identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Creates a transform from a translation.
    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Converts this transform to a Mat4.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Sets the same scale factor on all three axes.
    pub fn set_uniform_scale(&mut self, factor: f32) {
        self.scale = Vec3::splat(factor);
    }

    /// Returns the world-to-local matrix, or `None` when a scale axis is zero.
    #[must_use]
    pub fn inverse_matrix(&self) -> Option<Mat4> {
        if self.scale.abs().min_element() <= f32::EPSILON {
            return None;
        }
        Some(self.to_matrix().inverse())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_matrix_places_local_points() {
        let mut t = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0));
        t.set_uniform_scale(2.0);
        let p = t.to_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(12.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_uniform_scale() {
        let mut t = Transform::identity();
        t.set_uniform_scale(2.5);
        assert_eq!(t.scale, Vec3::splat(2.5));
    }

    #[test]
    fn test_degenerate_scale_has_no_inverse() {
        let mut t = Transform::identity();
        t.scale = Vec3::new(1.0, 0.0, 1.0);
        assert!(t.inverse_matrix().is_none());
        assert!(Transform::identity().inverse_matrix().is_some());
    }
}
