use crate::scene::animator::ToggleState;
use glam::{Mat4, Vec3};
use std::time::Duration;

pub const ORBIT_RADIUS: f32 = 5.0;
/// Radians per elapsed millisecond.
pub const ORBIT_SPEED: f64 = 0.0005;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShadowSettings {
    pub enabled: bool,
    pub camera_far: f32,
    pub map_size: u32,
    pub normal_bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            camera_far: 15.0,
            map_size: 1024,
            // 0.02..0.05 removes acne on the baked walls
            normal_bias: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vec3,
    pub shadow: ShadowSettings,
    target: Vec3,
    world: Mat4,
}

impl DirectionalLight {
    pub fn new(position: Vec3, intensity: f32, shadow: ShadowSettings) -> Self {
        let mut light = Self {
            color: [1.0, 1.0, 1.0],
            intensity,
            position,
            shadow,
            target: Vec3::ZERO,
            world: Mat4::IDENTITY,
        };
        light.update_world();
        light
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.update_world();
    }

    /// Cached light-to-world matrix, looking from `position` at `target`.
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    pub fn update_world(&mut self) {
        let forward = self.target - self.position;
        if forward.length_squared() <= f32::EPSILON {
            self.world = Mat4::from_translation(self.position);
            return;
        }
        let up = if forward.normalize().abs().dot(Vec3::Y) > 0.999 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        self.world = Mat4::look_at_rh(self.position, self.target, up).inverse();
    }

    /// Unit vector the light travels along.
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightMode {
    Manual,
    AutoOrbit,
}

impl LightMode {
    pub fn from_toggles(toggles: &ToggleState) -> Self {
        if toggles.auto_rotate_light {
            LightMode::AutoOrbit
        } else {
            LightMode::Manual
        }
    }
}

/// Owns the scene's single directional light.
pub struct LightController {
    light: DirectionalLight,
}

impl LightController {
    pub fn new(light: DirectionalLight) -> Self {
        Self { light }
    }

    pub fn light(&self) -> &DirectionalLight {
        &self.light
    }

    pub fn light_mut(&mut self) -> &mut DirectionalLight {
        &mut self.light
    }

    /// Per-frame step. The mode is re-read from the toggles every call.
    pub fn update(&mut self, toggles: &ToggleState, elapsed: Duration) -> LightMode {
        let mode = LightMode::from_toggles(toggles);
        if mode == LightMode::AutoOrbit {
            let angle = elapsed.as_secs_f64() * 1000.0 * ORBIT_SPEED;
            self.light.position.x = (angle.cos() as f32) * ORBIT_RADIUS;
            self.light.position.z = (angle.sin() as f32) * ORBIT_RADIUS;
            self.light.set_target(Vec3::ZERO);
        }
        mode
    }
}
