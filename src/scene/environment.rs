use crate::assets::TextureHandle;
use crate::scene::Scene;

pub const DEFAULT_ENV_MAP_INTENSITY: f32 = 5.0;

/// Environment map binding plus the intensity every lit material reads.
#[derive(Debug, Clone)]
pub struct EnvironmentState {
    pub env_map_intensity: f32,
    cubemap: Option<TextureHandle>,
}

impl Default for EnvironmentState {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_MAP_INTENSITY)
    }
}

impl EnvironmentState {
    pub fn new(env_map_intensity: f32) -> Self {
        Self {
            env_map_intensity,
            cubemap: None,
        }
    }

    /// Uses the cubemap as both background and ambient environment.
    /// Only the first call binds; later calls are ignored and return false.
    pub fn bind(&mut self, scene: &mut Scene, cubemap: TextureHandle) -> bool {
        if let Some(bound) = &self.cubemap {
            log::warn!(
                "Environment already bound to texture {}; ignoring texture {}",
                bound.id,
                cubemap.id
            );
            return false;
        }
        log::info!(
            "Binding environment cubemap {} ({}x{})",
            cubemap.id,
            cubemap.width,
            cubemap.height
        );
        scene.set_background(cubemap.clone());
        scene.set_environment(cubemap.clone());
        self.cubemap = Some(cubemap);
        true
    }

    /// Stores the intensity as given (no clamping) and pushes it to every material.
    pub fn set_intensity(&mut self, scene: &mut Scene, value: f32) -> PropagationStats {
        self.env_map_intensity = value;
        propagate(scene, self)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PropagationStats {
    pub nodes_visited: usize,
    pub materials_updated: usize,
}

/// Writes the current environment intensity into every reachable material
/// that responds to it, marks those materials dirty and turns shadows on for
/// their nodes. Change-triggered; never run per frame.
pub fn propagate(scene: &mut Scene, environment: &EnvironmentState) -> PropagationStats {
    let mut stats = PropagationStats::default();
    for id in scene.traverse() {
        stats.nodes_visited += 1;
        let Some(material_id) = scene.node(id).and_then(|node| node.material) else {
            continue;
        };
        let updated = match scene.materials_mut().get_mut(material_id) {
            Some(material) if material.has_environment_intensity() => {
                material.set_environment_intensity(environment.env_map_intensity)
            }
            _ => false,
        };
        if !updated {
            continue;
        }
        stats.materials_updated += 1;
        if let Some(node) = scene.node_mut(id) {
            node.set_shadows(true, true);
        }
    }
    log::debug!(
        "Propagated environment intensity {} to {} material slots ({} nodes)",
        environment.env_map_intensity,
        stats.materials_updated,
        stats.nodes_visited
    );
    stats
}
