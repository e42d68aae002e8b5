//! Camera, screen rays and screen-space sizing.

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// Perspective projection.
    #[default]
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// A half-line in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing the direction.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }
}

/// A 3D camera viewing the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Projection mode.
    pub projection_mode: ProjectionMode,
    /// Half of the visible height (used when `projection_mode` is Orthographic).
    pub ortho_scale: f32,
}

impl Camera {
    /// Creates a new camera with default settings.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
            projection_mode: ProjectionMode::Perspective,
            ortho_scale: 1.0,
        }
    }

    /// Moves the camera to `position`, looking at `target`.
    #[must_use]
    pub fn looking_at(mut self, position: Vec3, target: Vec3) -> Self {
        self.position = position;
        self.target = target;
        self
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection_mode {
            ProjectionMode::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_height = self.ortho_scale;
                let half_width = half_height * self.aspect_ratio;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Transforms a world-space point into camera (view) space.
    #[must_use]
    pub fn to_view_space(&self, world: Vec3) -> Vec3 {
        self.view_matrix().transform_point3(world)
    }

    /// Builds the world-space ray under a pixel position.
    ///
    /// Returns `None` for an empty viewport or a degenerate projection.
    #[must_use]
    pub fn screen_ray(&self, pixel: Vec2, viewport: UVec2) -> Option<Ray> {
        if viewport.x == 0 || viewport.y == 0 {
            return None;
        }

        let half_width = viewport.x as f32 / 2.0;
        let half_height = viewport.y as f32 / 2.0;
        let ndc_x = (pixel.x / half_width) - 1.0;
        let ndc_y = 1.0 - (pixel.y / half_height);

        let inv_view_proj = self.view_projection_matrix().inverse();

        // NDC depth in [0, 1]
        let near = inv_view_proj * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far = inv_view_proj * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        if near.w.abs() < 1e-6 || far.w.abs() < 1e-6 {
            return None;
        }

        let origin = near.truncate() / near.w;
        let direction = (far.truncate() / far.w - origin).normalize_or_zero();
        if direction.length_squared() < 1e-12 {
            return None;
        }

        Some(Ray { origin, direction })
    }

    /// Projects a world-space point to pixel coordinates.
    ///
    /// Returns the pixel position and the view-space distance along the
    /// viewing direction, or `None` for points behind the camera.
    #[must_use]
    pub fn project_to_screen(&self, world: Vec3, viewport: UVec2) -> Option<(Vec2, f32)> {
        let clip = self.view_projection_matrix() * world.extend(1.0);
        if clip.w <= 1e-6 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let pixel = Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.x as f32,
            (1.0 - ndc.y) * 0.5 * viewport.y as f32,
        );
        let depth = -self.to_view_space(world).z;
        Some((pixel, depth))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

/// Returns how many pixels a sphere of `radius` spans at `distance` from the camera.
///
/// Perspective cameras shrink it with distance; orthographic cameras ignore
/// the distance.
#[must_use]
pub fn projected_radius(radius: f32, camera: &Camera, distance: f32, viewport: UVec2) -> f32 {
    match camera.projection_mode {
        ProjectionMode::Perspective => {
            let proj_factor = (1.0 / (camera.fov / 2.0).tan()) / distance;
            radius * proj_factor * viewport.y as f32 / 2.0
        }
        ProjectionMode::Orthographic => {
            let visible_width = 2.0 * camera.ortho_scale * camera.aspect_ratio;
            radius * viewport.x as f32 / visible_width
        }
    }
}
