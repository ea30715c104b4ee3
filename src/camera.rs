use glam::{Mat4, Vec3};

/// A perspective viewpoint.
///
/// The projection matrix is cached and rebuilt whenever one of its inputs
/// changes, so it can never lag behind the aspect ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    fov_y: f32, // radians
    aspect: f32,
    near: f32,
    far: f32,
    projection: Mat4,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(75.0, 1.0, 0.1, 1000.0)
    }
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let fov_y = fov_degrees.to_radians();
        Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y,
            aspect,
            near,
            far,
            projection: Mat4::perspective_rh(fov_y, aspect, near, far),
        }
    }

    /// Place the camera, keeping it pointed at the origin.
    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self.target = Vec3::ZERO;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_y.to_degrees()
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// Change the aspect ratio and rebuild the projection.
    pub fn set_aspect(&mut self, aspect: f32) {
        if !aspect.is_finite() || aspect <= 0.0 {
            log::debug!("ignoring degenerate aspect ratio {aspect}");
            return;
        }
        self.aspect = aspect;
        self.update_projection();
    }

    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov_y = fov_degrees.to_radians();
        self.update_projection();
    }

    fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}
