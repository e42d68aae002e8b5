//! Point-cloud picking under the mouse pointer.

use glam::{UVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;

/// Options forwarded to a [`PointCloudPicker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickOptions {
    /// Whether points hidden by clip volumes may be picked.
    pub pick_clipped: bool,
    /// Radius in pixels around the pointer in which points are considered.
    pub pick_window_size: f32,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            pick_clipped: false,
            pick_window_size: 15.0,
        }
    }
}

/// Finds the point-cloud surface under a pixel.
pub trait PointCloudPicker {
    /// Returns the world position of the picked point, if any.
    fn pick(
        &self,
        pointer: Vec2,
        camera: &Camera,
        viewport: UVec2,
        options: &PickOptions,
    ) -> Option<Vec3>;
}

/// Brute-force picker over an in-memory list of points.
///
/// Among the points projecting within the pick window, the one closest to the
/// camera wins. Points carry no clip state, so `pick_clipped` has no effect.
#[derive(Debug, Clone, Default)]
pub struct PointSetPicker {
    points: Vec<Vec3>,
}

impl PointSetPicker {
    /// Creates a picker over the given points.
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }
}

impl PointCloudPicker for PointSetPicker {
    fn pick(
        &self,
        pointer: Vec2,
        camera: &Camera,
        viewport: UVec2,
        options: &PickOptions,
    ) -> Option<Vec3> {
        let window_sq = options.pick_window_size * options.pick_window_size;
        self.points
            .iter()
            .filter_map(|&point| {
                let (pixel, depth) = camera.project_to_screen(point, viewport)?;
                (pixel.distance_squared(pointer) <= window_sq).then_some((point, depth))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(point, _)| point)
    }
}

/// Any closure with the picker signature is a picker.
impl<F> PointCloudPicker for F
where
    F: Fn(Vec2, &Camera, UVec2, &PickOptions) -> Option<Vec3>,
{
    fn pick(
        &self,
        pointer: Vec2,
        camera: &Camera,
        viewport: UVec2,
        options: &PickOptions,
    ) -> Option<Vec3> {
        self(pointer, camera, viewport, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(1.0).looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO)
    }

    #[test]
    fn test_picks_nearest_point_under_pointer() {
        let picker = PointSetPicker::new(vec![
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(4.0, 4.0, 0.0),
        ]);
        let hit = picker.pick(
            Vec2::new(50.0, 50.0),
            &camera(),
            UVec2::new(100, 100),
            &PickOptions::default(),
        );
        assert_eq!(hit, Some(Vec3::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn test_no_point_in_window() {
        let picker = PointSetPicker::new(vec![Vec3::new(4.0, 4.0, 0.0)]);
        let hit = picker.pick(
            Vec2::new(50.0, 50.0),
            &camera(),
            UVec2::new(100, 100),
            &PickOptions::default(),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_points_behind_camera_are_ignored() {
        let picker = PointSetPicker::new(vec![Vec3::new(0.0, 0.0, 20.0)]);
        let hit = picker.pick(
            Vec2::new(50.0, 50.0),
            &camera(),
            UVec2::new(100, 100),
            &PickOptions::default(),
        );
        assert!(hit.is_none());
    }
}
