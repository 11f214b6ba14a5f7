use glam::{Mat4, Vec3};
use std::f32::consts::{PI, TAU};

const MIN_POLAR: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32, position: Vec3) -> Self {
        let mut camera = Self {
            fov_deg,
            aspect,
            near,
            far,
            position,
            target: Vec3::ZERO,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
        self.update_projection();
    }

    pub fn update_projection(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }
}

/// Orbit camera controls with inertia: pointer input accumulates a spherical
/// delta that each `update` applies a fraction of and then decays.
#[derive(Debug, Clone, Copy)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3, damping_factor: f32) -> Self {
        Self {
            target,
            enable_damping: true,
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Pointer drag in physical pixels; a full viewport height is one turn.
    pub fn drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        self.rotate_left(TAU * dx / viewport_height * self.rotate_speed);
        self.rotate_up(TAU * dy / viewport_height * self.rotate_speed);
    }

    /// Positive `amount` moves away from the target.
    pub fn wheel(&mut self, amount: f32) {
        let zoom = 0.95f32.powf(self.zoom_speed);
        if amount > 0.0 {
            self.scale /= zoom;
        } else if amount < 0.0 {
            self.scale *= zoom;
        }
    }

    pub fn is_settled(&self) -> bool {
        self.delta_theta.abs() < 1e-6 && self.delta_phi.abs() < 1e-6 && self.scale == 1.0
    }

    /// Applies pending motion to the camera. Returns true if it moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        let (mut theta, mut phi) = if radius > 0.0 {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI * 0.5)
        };

        if self.enable_damping {
            theta += self.delta_theta * self.damping_factor;
            phi += self.delta_phi * self.damping_factor;
        } else {
            theta += self.delta_theta;
            phi += self.delta_phi;
        }
        phi = phi.clamp(MIN_POLAR, PI - MIN_POLAR);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        let new_position = self.target + new_offset;

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;

        let moved = (new_position - camera.position).length_squared() > 1e-10;
        camera.position = new_position;
        camera.target = self.target;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::{OrbitControls, PerspectiveCamera};
    use glam::Vec3;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(75.0, 16.0 / 9.0, 0.1, 100.0, Vec3::new(4.0, 1.0, -4.0))
    }

    #[test]
    fn idle_update_keeps_camera_in_place() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05);
        let moved = controls.update(&mut camera);
        assert!(!moved);
        assert!((camera.position - Vec3::new(4.0, 1.0, -4.0)).length() < 1e-5);
    }

    #[test]
    fn drag_orbits_at_constant_distance() {
        let mut camera = camera();
        let distance = camera.position.length();
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05);
        controls.drag(120.0, -30.0, 720.0);
        for _ in 0..10 {
            controls.update(&mut camera);
            assert!((camera.position.length() - distance).abs() < 1e-4);
            assert!(camera.position.is_finite());
        }
    }

    #[test]
    fn damping_settles_over_time() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05);
        controls.drag(300.0, 0.0, 720.0);
        let first = {
            let before = camera.position;
            controls.update(&mut camera);
            (camera.position - before).length()
        };
        for _ in 0..400 {
            controls.update(&mut camera);
        }
        let before = camera.position;
        controls.update(&mut camera);
        let last = (camera.position - before).length();
        assert!(last < first * 0.01);
        assert!(controls.is_settled() || last < 1e-4);
    }

    #[test]
    fn wheel_dollies_toward_and_away() {
        let mut camera = camera();
        let distance = camera.position.length();
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05);
        controls.wheel(-1.0);
        controls.update(&mut camera);
        assert!(camera.position.length() < distance);
        controls.wheel(1.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - distance).abs() < 1e-4);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05);
        controls.enable_damping = false;
        controls.drag(0.0, 10_000.0, 720.0);
        controls.update(&mut camera);
        assert!(camera.position.is_finite());
        assert!(camera.position.y > 0.0);
    }

    #[test]
    fn aspect_change_updates_projection() {
        let mut camera = camera();
        let before = camera.projection_matrix();
        camera.set_aspect(800, 800);
        assert_eq!(camera.aspect, 1.0);
        assert_ne!(before, camera.projection_matrix());
        camera.set_aspect(0, 600);
        assert_eq!(camera.aspect, 1.0);
    }
}
