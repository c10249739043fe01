//! Fixed thumbnail camera.

use glam::{Mat4, Vec3};

/// Direction the camera looks from, relative to the model center.
///
/// A three-quarter view from above-front-right.
const VIEW_DIRECTION: Vec3 = Vec3::new(1.0, 0.8, 1.4);

/// Perspective camera framed around a model.
#[derive(Debug, Clone)]
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
}

impl Camera {
    /// Creates a camera at +Z looking at the origin.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
        }
    }

    /// Creates a camera for a `width` x `height` output.
    #[must_use]
    pub fn for_viewport(width: u32, height: u32) -> Self {
        Self::new(aspect(width, height))
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Frames the given bounding box so its bounding sphere fills the view.
    ///
    /// Degenerate boxes (a point, or an empty model) are treated as a unit
    /// sphere around the box center.
    pub fn look_at_box(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let radius = (max - min).length() * 0.5;
        let radius = if radius.is_finite() && radius > f32::EPSILON {
            radius
        } else {
            1.0
        };

        // Fit against the narrower of the two fields of view.
        let half_fov_y = self.fov * 0.5;
        let half_fov_x = (half_fov_y.tan() * self.aspect_ratio).atan();
        let half_fov = half_fov_y.min(half_fov_x);
        let distance = radius / half_fov.sin() * 1.05;

        self.target = center;
        self.position = center + VIEW_DIRECTION.normalize() * distance;
        self.near = (distance - radius * 1.5).max(distance * 0.01);
        self.far = distance + radius * 1.5;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[allow(clippy::cast_precision_loss)]
fn aspect(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}
