use glam::{Mat4, Vec3};

use crate::error::CameraError;

pub const DEFAULT_FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 1000.0;

/// Look-at camera with a perspective projection
///
/// Mutators only mark the affected matrix stale; `update` recomputes it.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    view: Mat4,
    proj: Mat4,
    view_dirty: bool,
    proj_dirty: bool,
}

fn check_orientation(position: Vec3, target: Vec3, up: Vec3) -> Result<(), CameraError> {
    let forward = target - position;
    if forward.length_squared() <= f32::EPSILON || up.length_squared() <= f32::EPSILON {
        return Err(CameraError::DegenerateUp);
    }
    if forward.normalize().cross(up.normalize()).length_squared() < 1e-8 {
        return Err(CameraError::DegenerateUp);
    }
    Ok(())
}

fn check_clip_planes(near: f32, far: f32) -> Result<(), CameraError> {
    if !(near > 0.0 && near.is_finite()) {
        return Err(CameraError::NearPlane(near));
    }
    if !(far > near) {
        return Err(CameraError::FarPlane { near, far });
    }
    Ok(())
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Result<Self, CameraError> {
        check_orientation(position, target, Vec3::Y)?;

        let mut camera = Self {
            position,
            target,
            up: Vec3::Y,
            fov_y: DEFAULT_FOV_Y,
            aspect: 1.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_dirty: true,
            proj_dirty: true,
        };
        camera.update();
        Ok(camera)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    pub fn set_position(&mut self, position: Vec3) -> Result<(), CameraError> {
        check_orientation(position, self.target, self.up)?;
        self.position = position;
        self.view_dirty = true;
        Ok(())
    }

    pub fn set_target(&mut self, target: Vec3) -> Result<(), CameraError> {
        check_orientation(self.position, target, self.up)?;
        self.target = target;
        self.view_dirty = true;
        Ok(())
    }

    pub fn set_up(&mut self, up: Vec3) -> Result<(), CameraError> {
        check_orientation(self.position, self.target, up)?;
        self.up = up;
        self.view_dirty = true;
        Ok(())
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) -> Result<(), CameraError> {
        if !(aspect > 0.0 && aspect.is_finite()) {
            return Err(CameraError::AspectRatio(aspect));
        }
        self.aspect = aspect;
        self.proj_dirty = true;
        Ok(())
    }

    pub fn set_fov_y(&mut self, fov_y: f32) {
        self.fov_y = fov_y.clamp(0.01, std::f32::consts::PI - 0.01);
        self.proj_dirty = true;
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> Result<(), CameraError> {
        check_clip_planes(near, far)?;
        self.near = near;
        self.far = far;
        self.proj_dirty = true;
        Ok(())
    }

    pub fn is_stale(&self) -> bool {
        self.view_dirty || self.proj_dirty
    }

    /// Recompute whichever matrices are stale
    pub fn update(&mut self) {
        if self.view_dirty {
            self.view = Mat4::look_at_rh(self.position, self.target, self.up);
            self.view_dirty = false;
        }
        self.update_projection_matrix();
    }

    pub fn update_projection_matrix(&mut self) {
        if self.proj_dirty {
            self.proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
            self.proj_dirty = false;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn proj_matrix(&self) -> Mat4 {
        self.proj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_camera() -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO).unwrap()
    }

    #[test]
    fn new_camera_is_up_to_date() {
        let camera = default_camera();
        assert!(!camera.is_stale());
        assert_eq!(camera.view_matrix(), Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y));
    }

    #[test]
    fn view_maps_target_onto_negative_z() {
        let camera = default_camera();
        let eye_space = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!((eye_space - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn aspect_change_is_lazy() {
        let mut camera = default_camera();
        let before = camera.proj_matrix();

        camera.set_aspect_ratio(16.0 / 9.0).unwrap();
        assert!(camera.is_stale());
        assert_eq!(camera.proj_matrix(), before);

        camera.update_projection_matrix();
        assert_ne!(camera.proj_matrix(), before);
        assert_eq!(
            camera.proj_matrix(),
            Mat4::perspective_rh(DEFAULT_FOV_Y, 16.0 / 9.0, DEFAULT_NEAR, DEFAULT_FAR)
        );
    }

    #[test]
    fn position_change_only_touches_view() {
        let mut camera = default_camera();
        let proj = camera.proj_matrix();
        camera.set_position(Vec3::new(0.0, 2.0, 5.0)).unwrap();
        camera.update();
        assert_eq!(camera.proj_matrix(), proj);
        assert_eq!(camera.position(), Vec3::new(0.0, 2.0, 5.0));
    }

    #[test]
    fn rejects_parallel_up() {
        assert_eq!(
            Camera::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO).unwrap_err(),
            CameraError::DegenerateUp
        );

        let mut camera = default_camera();
        assert_eq!(camera.set_up(Vec3::Z), Err(CameraError::DegenerateUp));
        assert_eq!(camera.up(), Vec3::Y);
    }

    #[test]
    fn rejects_bad_clip_planes() {
        let mut camera = default_camera();
        assert_eq!(camera.set_clip_planes(0.0, 10.0), Err(CameraError::NearPlane(0.0)));
        assert_eq!(
            camera.set_clip_planes(5.0, 1.0),
            Err(CameraError::FarPlane { near: 5.0, far: 1.0 })
        );
        assert_eq!(camera.clip_planes(), (DEFAULT_NEAR, DEFAULT_FAR));
    }

    #[test]
    fn rejects_bad_aspect() {
        let mut camera = default_camera();
        assert!(camera.set_aspect_ratio(0.0).is_err());
        assert!(camera.set_aspect_ratio(f32::INFINITY).is_err());
        assert_eq!(camera.aspect(), 1.0);
    }
}
