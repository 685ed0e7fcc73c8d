//! # Fly Camera
//!
//! First-person camera driven by yaw/pitch Euler angles. Movement happens in
//! the camera's own basis; the view matrix is derived on demand and the
//! projection is cached whenever [`Camera::set_projection`] is called.
//!
//! ## Coordinate System
//! Right-handed, Y-up. A yaw of -90° looks down -Z, the OpenGL default.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Default yaw in degrees
pub const DEFAULT_YAW: f32 = -90.0;
/// Default pitch in degrees
pub const DEFAULT_PITCH: f32 = 0.0;
/// Default movement speed in units per second
pub const DEFAULT_SPEED: f32 = 2.5;
/// Default degrees per unit of mouse motion
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
/// Default (and maximum) field of view in degrees
pub const DEFAULT_ZOOM: f32 = 45.0;

const MIN_ZOOM: f32 = 1.0;
const MAX_ZOOM: f32 = 45.0;
const PITCH_LIMIT: f32 = 89.0;

/// Direction for keyboard-driven movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    /// Along the front vector
    Forward,
    /// Against the front vector
    Backward,
    /// Against the right vector
    Left,
    /// Along the right vector
    Right,
}

/// First-person fly camera
///
/// `front`, `right` and `up` always form an orthonormal basis derived from
/// `yaw`, `pitch` and `world_up`.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    movement_speed: f32,
    mouse_sensitivity: f32,
    zoom: f32,
    projection: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Vec3::y(), DEFAULT_YAW, DEFAULT_PITCH)
    }
}

impl Camera {
    /// Create a camera
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `world_up` - World up direction, usually +Y
    /// * `yaw` - Heading in degrees; -90 looks down -Z
    /// * `pitch` - Elevation in degrees
    pub fn new(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::new(0.0, 0.0, -1.0),
            up: world_up,
            right: Vec3::x(),
            world_up,
            yaw,
            pitch,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
            projection: Mat4::identity(),
        };
        camera.update_camera_vectors();
        camera
    }

    /// Create a camera at `position` with default orientation
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::y(), DEFAULT_YAW, DEFAULT_PITCH)
    }

    /// View matrix looking from the position along the front vector
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_gl(&self.position, &(self.position + self.front), &self.up)
    }

    /// Projection cached by the last [`Camera::set_projection`]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Projection times view
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    /// Rebuild and cache the perspective projection
    ///
    /// # Arguments
    /// * `fov` - Vertical field of view in degrees
    /// * `aspect` - Viewport width divided by height
    /// * `near` - Near clip distance
    /// * `far` - Far clip distance
    pub fn set_projection(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Mat4::perspective_gl(utils::deg_to_rad(fov), aspect, near, far);
    }

    /// Move the camera along its basis
    ///
    /// # Arguments
    /// * `direction` - Which way to move
    /// * `delta_time` - Frame time in seconds; distance is `speed * delta_time`
    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        debug_assert!(delta_time >= 0.0, "negative frame delta");
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Turn the camera by a mouse offset
    ///
    /// Offsets are scaled by the sensitivity. Both angles wrap into
    /// `[-360, 360]`; with `constrain_pitch` the pitch is then clamped to
    /// `[-89, 89]` so the view never flips.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw = utils::wrap_degrees(self.yaw + x_offset * self.mouse_sensitivity);
        self.pitch = utils::wrap_degrees(self.pitch + y_offset * self.mouse_sensitivity);

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_camera_vectors();
    }

    /// Zoom by a wheel delta; the field of view stays within `[1, 45]` degrees
    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn update_camera_vectors(&mut self) {
        let yaw = utils::deg_to_rad(self.yaw);
        let pitch = utils::deg_to_rad(self.pitch);
        let front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        self.front = front.normalize();
        // Looking straight along world up leaves no horizontal heading
        self.right = self
            .front
            .cross(&self.world_up)
            .try_normalize(1.0e-6)
            .unwrap_or(self.right);
        self.up = self.right.cross(&self.front).normalize();
    }

    /// Position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Move the camera without changing its orientation
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Unit view direction
    pub fn front(&self) -> Vec3 {
        self.front
    }

    /// Unit camera up
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Unit camera right
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// World up reference
    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    /// Heading in degrees
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Elevation in degrees
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Field of view in degrees
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Units per second
    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    /// Set units per second
    pub fn set_movement_speed(&mut self, speed: f32) {
        self.movement_speed = speed;
    }

    /// Degrees per unit of mouse motion
    pub fn mouse_sensitivity(&self) -> f32 {
        self.mouse_sensitivity
    }

    /// Set degrees per unit of mouse motion
    pub fn set_mouse_sensitivity(&mut self, sensitivity: f32) {
        self.mouse_sensitivity = sensitivity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Point3, Vec4};
    use approx::assert_relative_eq;

    fn assert_orthonormal(camera: &Camera) {
        assert_relative_eq!(camera.front().norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.right().norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.up().norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.front().dot(&camera.right()), 0.0, epsilon = 1e-5);
        assert_relative_eq!(camera.front().dot(&camera.up()), 0.0, epsilon = 1e-5);
        assert_relative_eq!(camera.right().dot(&camera.up()), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_default_orientation() {
        let camera = Camera::default();
        assert_relative_eq!(camera.front(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(camera.right(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(camera.up(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(camera.zoom(), 45.0);
        assert_relative_eq!(camera.movement_speed(), 2.5);
        assert_relative_eq!(camera.mouse_sensitivity(), 0.1);
    }

    #[test]
    fn test_keyboard_moves_along_basis() {
        let mut camera = Camera::default();
        camera.process_keyboard(CameraMovement::Forward, 1.0);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, -2.5), epsilon = 1e-5);
        camera.process_keyboard(CameraMovement::Right, 0.4);
        assert_relative_eq!(camera.position(), Vec3::new(1.0, 0.0, -2.5), epsilon = 1e-5);
        camera.process_keyboard(CameraMovement::Left, 0.4);
        camera.process_keyboard(CameraMovement::Backward, 1.0);
        assert_relative_eq!(camera.position(), Vec3::zeros(), epsilon = 1e-5);
    }

    #[test]
    fn test_zero_delta_does_not_move() {
        let mut camera = Camera::at(Vec3::new(1.0, 2.0, 3.0));
        camera.process_keyboard(CameraMovement::Forward, 0.0);
        assert_relative_eq!(camera.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_pitch_is_clamped_when_constrained() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 10_000.0, true);
        assert!(camera.pitch() <= 89.0 && camera.pitch() >= -89.0);
        camera.process_mouse_movement(0.0, 1_000.0, true);
        assert_relative_eq!(camera.pitch(), 89.0);
        assert_orthonormal(&camera);
        camera.process_mouse_movement(0.0, -2_000.0, true);
        assert_relative_eq!(camera.pitch(), -89.0);
        assert_orthonormal(&camera);
    }

    #[test]
    fn test_yaw_wraps_into_range() {
        let mut camera = Camera::default();
        // 5000 * 0.1 = 500 degrees on top of -90
        camera.process_mouse_movement(5_000.0, 0.0, true);
        assert_relative_eq!(camera.yaw(), 50.0, epsilon = 1e-3);
        assert!(camera.yaw().abs() <= 360.0);
        assert_orthonormal(&camera);
    }

    #[test]
    fn test_huge_mouse_offset_keeps_basis() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(1.0e12, 0.0, true);
        assert!(camera.yaw().is_finite());
        assert!(camera.yaw().abs() <= 360.0);
        assert_relative_eq!(camera.pitch(), 0.0);
        assert_orthonormal(&camera);
    }

    #[test]
    fn test_unconstrained_pitch_stays_finite() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 900.0, false);
        assert_relative_eq!(camera.pitch(), 90.0, epsilon = 1e-3);
        assert!(camera.front().iter().all(|v| v.is_finite()));
        assert!(camera.right().iter().all(|v| v.is_finite()));
        assert!(camera.up().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_scroll_clamps_zoom() {
        let mut camera = Camera::default();
        camera.process_mouse_scroll(10.0);
        assert_relative_eq!(camera.zoom(), 35.0);
        camera.process_mouse_scroll(100.0);
        assert_relative_eq!(camera.zoom(), 1.0);
        camera.process_mouse_scroll(-100.0);
        assert_relative_eq!(camera.zoom(), 45.0);
    }

    #[test]
    fn test_view_matrix_puts_front_on_negative_z() {
        let camera = Camera::at(Vec3::new(0.0, 0.0, 3.0));
        let view = camera.view_matrix();
        let ahead = view.transform_point(&Point3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(ahead.coords, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_set_projection_is_cached() {
        let mut camera = Camera::default();
        assert_relative_eq!(camera.projection(), Mat4::identity());
        camera.set_projection(45.0, 16.0 / 9.0, 0.1, 100.0);
        let clip = camera.projection() * Vec4::new(0.0, 0.0, -0.1, 1.0);
        assert_relative_eq!(clip.z / clip.w, -1.0, epsilon = 1e-4);
        assert_relative_eq!(
            camera.projection(),
            Mat4::perspective_gl(utils::deg_to_rad(45.0), 16.0 / 9.0, 0.1, 100.0)
        );
    }
}
