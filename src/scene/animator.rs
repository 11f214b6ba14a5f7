use crate::scene::Scene;

/// Per-frame scene rotation increments (x, y) while `rotate_scene` is set.
pub const SCENE_ROTATION_STEP: [f32; 2] = [0.005, 0.002];
/// Per-frame model rotation increment for each enabled axis.
pub const OBJECT_ROTATION_STEP: f32 = 0.01;

/// Runtime toggles from the control panel. All independent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ToggleState {
    pub rotate_scene: bool,
    pub rotate_object_x: bool,
    pub rotate_object_y: bool,
    pub rotate_object_z: bool,
    pub auto_rotate_light: bool,
}

/// What a single animator step changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnimatorStep {
    pub scene_rotated: bool,
    pub object_axes: [bool; 3],
}

#[derive(Debug, Clone, Copy)]
pub struct TransformAnimator {
    scene_step: [f32; 2],
    object_step: f32,
}

impl Default for TransformAnimator {
    fn default() -> Self {
        Self {
            scene_step: SCENE_ROTATION_STEP,
            object_step: OBJECT_ROTATION_STEP,
        }
    }
}

impl TransformAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances rotations for every enabled toggle. Object toggles do nothing
    /// until the model has been added to the scene.
    pub fn step(&self, toggles: &ToggleState, scene: &mut Scene) -> AnimatorStep {
        let mut step = AnimatorStep::default();
        if toggles.rotate_scene {
            scene.transform.rotation.x += self.scene_step[0];
            scene.transform.rotation.y += self.scene_step[1];
            step.scene_rotated = true;
        }

        let axes = [
            toggles.rotate_object_x,
            toggles.rotate_object_y,
            toggles.rotate_object_z,
        ];
        if !axes.iter().any(|enabled| *enabled) {
            return step;
        }
        let Some(root) = scene.model_root() else {
            return step;
        };
        let Some(model) = scene.node_mut(root) else {
            return step;
        };
        let rotation = &mut model.transform.rotation;
        if axes[0] {
            rotation.x += self.object_step;
        }
        if axes[1] {
            rotation.y += self.object_step;
        }
        if axes[2] {
            rotation.z += self.object_step;
        }
        step.object_axes = axes;
        step
    }
}
