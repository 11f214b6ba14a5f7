use crate::assets::{AssetError, ModelAsset, TextureHandle};
use crate::config::ViewerConfig;
use crate::render::{
    FrameStats, OrbitControls, PerspectiveCamera, RenderBackend, RenderError, RendererSettings,
    UiFrame,
};
use crate::scene::animator::{ToggleState, TransformAnimator};
use crate::scene::classify::{
    classify_subtree, ClassificationSummary, ClassifierRules, ComposedMaterials,
};
use crate::scene::environment::{propagate, EnvironmentState, PropagationStats};
use crate::scene::light::{DirectionalLight, LightController, LightMode};
use crate::scene::material::Material;
use crate::scene::{NodeId, Scene, SceneError};
use crate::ui::{PanelBindings, PanelResponse};
use glam::Vec3;
use std::time::Duration;

/// Session-wide parameters the control panel edits and components read.
#[derive(Debug, Clone)]
pub struct ViewerParams {
    pub environment: EnvironmentState,
    pub toggles: ToggleState,
}

/// Results of the background load, delivered to the frame thread in order.
#[derive(Debug)]
pub enum LoadEvent {
    Environment(Result<TextureHandle, AssetError>),
    BakedTexture(Result<TextureHandle, AssetError>),
    Model(Result<ModelAsset, AssetError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionReport {
    pub root: NodeId,
    pub classification: ClassificationSummary,
    pub propagation: PropagationStats,
}

pub struct Viewer {
    scene: Scene,
    params: ViewerParams,
    light: LightController,
    animator: TransformAnimator,
    rules: ClassifierRules,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    model_scale: f32,
    max_pixel_ratio: f32,
    baked_texture: Option<TextureHandle>,
    composed: Option<ComposedMaterials>,
}

impl Viewer {
    pub fn new(config: &ViewerConfig) -> Self {
        let [width, height] = config.window_size;
        let aspect = if height > 0 {
            width as f32 / height as f32
        } else {
            1.0
        };
        let camera = PerspectiveCamera::new(
            config.camera_fov_deg,
            aspect,
            config.camera_near,
            config.camera_far,
            Vec3::from(config.camera_position),
        );
        let light = DirectionalLight::new(
            Vec3::from(config.light_position),
            config.light_intensity,
            config.shadow,
        );
        let mut viewer = Self {
            scene: Scene::new(),
            params: ViewerParams {
                environment: EnvironmentState::new(config.env_map_intensity),
                toggles: config.toggles,
            },
            light: LightController::new(light),
            animator: TransformAnimator::new(),
            rules: if config.glass_rule_first {
                ClassifierRules::broad_first()
            } else {
                ClassifierRules::default()
            },
            camera,
            controls: OrbitControls::new(Vec3::ZERO, config.camera_damping),
            model_scale: config.model_scale,
            max_pixel_ratio: config.max_pixel_ratio,
            baked_texture: None,
            composed: None,
        };
        viewer.sync_marker_nodes();
        viewer
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn light(&self) -> &DirectionalLight {
        self.light.light()
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn is_model_loaded(&self) -> bool {
        self.scene.model_root().is_some()
    }

    pub fn handle_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Environment(Ok(cubemap)) => {
                self.params.environment.bind(&mut self.scene, cubemap);
            }
            LoadEvent::Environment(Err(err)) => {
                log::error!("Environment map failed to load: {}", err);
            }
            LoadEvent::BakedTexture(Ok(texture)) => {
                log::info!(
                    "Baked texture ready ({}x{}, {})",
                    texture.width,
                    texture.height,
                    texture.source.display()
                );
                self.baked_texture = Some(texture);
            }
            LoadEvent::BakedTexture(Err(err)) => {
                log::warn!("Baked texture failed to load, materials stay untextured: {}", err);
            }
            LoadEvent::Model(Ok(model)) => {
                log::debug!("Model meshes: {:?}", model.mesh_names());
                self.handle_model(&model);
            }
            LoadEvent::Model(Err(err)) => {
                log::error!("Model failed to load, scene stays empty: {}", err);
            }
        }
    }

    fn handle_model(&mut self, model: &ModelAsset) {
        match self.compose_model(model) {
            Ok(report) => {
                let extent = self.scene.subtree_bounds(report.root).extent();
                log::info!(
                    "Composed '{}': {} glass, {} baked, {} unmatched meshes",
                    model.name,
                    report.classification.glass,
                    report.classification.baked,
                    report.classification.unmatched
                );
                log::debug!(
                    "Scene holds {} nodes; model half-extent {:?}",
                    self.scene.node_count(),
                    extent
                );
            }
            Err(err) => log::error!("Could not add '{}' to the scene: {}", model.name, err),
        }
    }

    /// Adds the model, places it, assigns materials and runs the first
    /// propagation pass.
    pub fn compose_model(&mut self, model: &ModelAsset) -> Result<CompositionReport, SceneError> {
        let imported: Vec<_> = model
            .materials
            .iter()
            .map(|material| self.scene.add_material(Material::from_imported(material)))
            .collect();
        let root = self.scene.add_model(model, &imported)?;

        if let Some(node) = self.scene.node_mut(root) {
            node.transform.scale = Vec3::splat(self.model_scale);
        }
        let center = self.scene.subtree_bounds(root).center();
        if let Some(node) = self.scene.node_mut(root) {
            node.transform.position -= center;
        }

        let composed = ComposedMaterials::create(&mut self.scene, self.baked_texture.clone());
        let classification = classify_subtree(&mut self.scene, root, &self.rules, &composed);
        self.composed = Some(composed);
        let propagation = propagate(&mut self.scene, &self.params.environment);

        Ok(CompositionReport {
            root,
            classification,
            propagation,
        })
    }

    pub fn set_environment_intensity(&mut self, value: f32) -> PropagationStats {
        self.params.environment.set_intensity(&mut self.scene, value)
    }

    /// Pushes current parameters to every material again (tone mapping changes).
    pub fn refresh_materials(&mut self) -> PropagationStats {
        propagate(&mut self.scene, &self.params.environment)
    }

    pub fn resize(
        &mut self,
        renderer: &mut dyn RenderBackend,
        width: u32,
        height: u32,
        device_pixel_ratio: f64,
    ) {
        self.camera.set_aspect(width, height);
        renderer.set_size(width, height);
        renderer.set_pixel_ratio((device_pixel_ratio as f32).min(self.max_pixel_ratio));
    }

    /// Borrows everything the debug panel edits for the duration of one UI pass.
    pub fn panel_bindings<'a>(&'a mut self, settings: &'a mut RendererSettings) -> PanelBindings<'a> {
        let Self {
            scene,
            params,
            light,
            ..
        } = self;
        let model_rotation_y = match scene.model_root() {
            Some(root) => scene
                .node_mut(root)
                .map(|node| &mut node.transform.rotation.y),
            None => None,
        };
        let light = light.light_mut();
        PanelBindings {
            env_map_intensity: &mut params.environment.env_map_intensity,
            model_rotation_y,
            light_intensity: &mut light.intensity,
            light_position: &mut light.position,
            tone_mapping: &mut settings.tone_mapping,
            exposure: &mut settings.exposure,
            toggles: &mut params.toggles,
        }
    }

    pub fn apply_panel(&mut self, response: PanelResponse) {
        if response.environment_changed {
            log::debug!(
                "Environment intensity set to {}",
                self.params.environment.env_map_intensity
            );
        }
        if response.environment_changed || response.tone_mapping_changed {
            self.refresh_materials();
        }
        if response.light_changed {
            self.light.light_mut().update_world();
        }
    }

    /// One frame: light, camera damping, animator, render.
    pub fn tick(
        &mut self,
        elapsed: Duration,
        renderer: &mut dyn RenderBackend,
        ui: Option<&UiFrame>,
    ) -> Result<FrameStats, RenderError> {
        let mode = self.light.update(&self.params.toggles, elapsed);
        if !self.controls.is_settled() {
            self.controls.update(&mut self.camera);
        }
        self.animator.step(&self.params.toggles, &mut self.scene);
        self.sync_marker_nodes();
        if mode == LightMode::AutoOrbit {
            log::trace!("Light orbit at {:?}", self.light.light().position);
        }
        renderer.render(&mut self.scene, &self.camera, self.light.light(), ui)
    }

    fn sync_marker_nodes(&mut self) {
        let camera = self.scene.camera_node();
        if let Some(node) = self.scene.node_mut(camera) {
            node.transform.position = self.camera.position;
        }
        let light = self.scene.light_node();
        if let Some(node) = self.scene.node_mut(light) {
            node.transform.position = self.light.light().position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ImportedMaterial;
    use crate::render::{HeadlessRenderer, ToneMapping};
    use crate::scene::test_support::model_with_meshes;

    fn viewer() -> Viewer {
        Viewer::new(&ViewerConfig::default())
    }

    fn renderer() -> HeadlessRenderer {
        let mut renderer = HeadlessRenderer::new(RendererSettings::default());
        renderer.set_size(1280, 720);
        renderer
    }

    fn mesh_material(viewer: &Viewer, name: &str) -> Option<&'static str> {
        let scene = viewer.scene();
        scene
            .find_by_name(name)
            .and_then(|id| scene.material_of(id))
            .map(Material::label)
    }

    #[test]
    fn composition_classifies_expected_meshes() {
        let mut viewer = viewer();
        let report = viewer
            .compose_model(&model_with_meshes(&["Cube", "Cube_1", "Cube_2"]))
            .unwrap();
        assert_eq!(report.classification.glass, 1);
        assert_eq!(report.classification.baked, 2);
        assert_eq!(mesh_material(&viewer, "Cube"), Some("glass-reflective"));
        assert_eq!(mesh_material(&viewer, "Cube_1"), Some("baked-opaque"));
        assert_eq!(mesh_material(&viewer, "Cube_2"), Some("baked-opaque"));
        for name in ["Cube", "Cube_1", "Cube_2"] {
            let scene = viewer.scene();
            let node = scene.node(scene.find_by_name(name).unwrap()).unwrap();
            assert!(node.casts_shadow && node.receives_shadow);
        }
    }

    #[test]
    fn multi_material_cube_splits_into_glass_and_baked() {
        let json = r#"{
            "asset": { "version": "2.0" },
            "scenes": [ { "nodes": [0] } ],
            "nodes": [ { "name": "Cube", "mesh": 0 } ],
            "meshes": [ { "name": "Cube", "primitives": [
                { "attributes": { "POSITION": 0 }, "material": 0 },
                { "attributes": { "POSITION": 0 }, "material": 1 },
                { "attributes": { "POSITION": 0 }, "material": 2 }
            ] } ],
            "accessors": [ { "componentType": 5126, "count": 24, "type": "VEC3",
                "min": [-1.0, -1.0, -1.0], "max": [1.0, 1.0, 1.0] } ],
            "materials": [ { "name": "Glass" }, { "name": "Frame" }, { "name": "Sill" } ]
        }"#;
        let model = crate::assets::parse_model("cube.glb", "cube.glb", json.as_bytes()).unwrap();
        let mut viewer = viewer();
        let report = viewer.compose_model(&model).unwrap();
        assert_eq!(report.classification.glass, 1);
        assert_eq!(report.classification.baked, 2);
        assert_eq!(report.classification.unmatched, 0);
        assert_eq!(mesh_material(&viewer, "Cube"), Some("glass-reflective"));
        assert_eq!(mesh_material(&viewer, "Cube_2"), Some("baked-opaque"));
    }

    #[test]
    fn cyclic_model_is_not_composed() {
        let mut viewer = viewer();
        let mut model = model_with_meshes(&["Loop"]);
        model.nodes[0].children.push(0);
        assert!(matches!(
            viewer.compose_model(&model),
            Err(SceneError::RevisitedModelNode { .. })
        ));
        assert!(!viewer.is_model_loaded());
    }

    #[test]
    fn glass_rule_first_is_configurable() {
        let config = ViewerConfig {
            glass_rule_first: true,
            ..ViewerConfig::default()
        };
        let mut viewer = Viewer::new(&config);
        viewer
            .compose_model(&model_with_meshes(&["Cube", "Cube_3"]))
            .unwrap();
        assert_eq!(mesh_material(&viewer, "Cube_3"), Some("glass-reflective"));
    }

    #[test]
    fn composition_scales_and_recentres_model() {
        let mut viewer = viewer();
        let mut model = model_with_meshes(&["Cube"]);
        model.nodes[0].transform.position = Vec3::new(10.0, 0.0, 0.0);
        let report = viewer.compose_model(&model).unwrap();
        let scene = viewer.scene();
        let root = scene.node(report.root).unwrap();
        assert_eq!(root.transform.scale, Vec3::splat(0.3));
        assert!((root.transform.position - Vec3::new(-3.0, 0.0, 0.0)).length() < 1e-5);
        assert!(scene.subtree_bounds(report.root).center().length() < 1e-5);
    }

    #[test]
    fn first_propagation_uses_configured_intensity() {
        let mut viewer = viewer();
        let mut model = model_with_meshes(&["Cube", "Walls"]);
        model.materials.push(ImportedMaterial {
            name: "Walls".to_string(),
            base_color: [1.0; 4],
            metalness: 0.0,
            roughness: 1.0,
            unlit: false,
        });
        viewer.compose_model(&model).unwrap();
        let scene = viewer.scene();
        for id in scene.traverse() {
            if let Some(material) = scene.material_of(id) {
                assert_eq!(material.environment_intensity(), Some(5.0));
            }
        }
    }

    #[test]
    fn set_environment_intensity_reaches_materials() {
        let mut viewer = viewer();
        viewer
            .compose_model(&model_with_meshes(&["Cube", "Cube_4"]))
            .unwrap();
        viewer.set_environment_intensity(7.5);
        let scene = viewer.scene();
        let lit: Vec<_> = scene
            .materials()
            .iter()
            .filter_map(|(_, m)| m.environment_intensity())
            .collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|value| *value == 7.5));
    }

    #[test]
    fn tick_before_load_renders_without_model() {
        let mut viewer = viewer();
        let mut renderer = renderer();
        viewer.params.toggles.rotate_object_x = true;
        let stats = viewer
            .tick(Duration::from_millis(16), &mut renderer, None)
            .unwrap();
        assert_eq!(stats.draw_calls, 0);
        assert!(!viewer.is_model_loaded());
    }

    #[test]
    fn tick_runs_light_and_animator() {
        let mut viewer = viewer();
        let mut renderer = renderer();
        viewer
            .compose_model(&model_with_meshes(&["Cube"]))
            .unwrap();
        viewer.params.toggles = ToggleState {
            rotate_object_y: true,
            auto_rotate_light: true,
            ..ToggleState::default()
        };
        let stats = viewer
            .tick(Duration::from_millis(1000), &mut renderer, None)
            .unwrap();
        assert_eq!(stats.draw_calls, 1);
        let p = viewer.light().position;
        assert!((p.x * p.x + p.z * p.z - 25.0).abs() < 1e-3);
        let scene = viewer.scene();
        let root = scene.node(scene.model_root().unwrap()).unwrap();
        assert_eq!(root.transform.rotation.y, 0.01);
        let light_node = scene.node(scene.light_node()).unwrap();
        assert_eq!(light_node.transform.position, p);
    }

    #[test]
    fn resize_updates_camera_and_caps_pixel_ratio() {
        let mut viewer = viewer();
        let mut renderer = renderer();
        viewer.resize(&mut renderer, 1000, 500, 3.0);
        assert_eq!(viewer.camera().aspect, 2.0);
        assert_eq!(renderer.size(), (1000, 500));
        assert_eq!(renderer.pixel_ratio(), 2.0);
        viewer.resize(&mut renderer, 1000, 500, 1.25);
        assert_eq!(renderer.pixel_ratio(), 1.25);
    }

    #[test]
    fn load_failure_leaves_scene_usable() {
        let mut viewer = viewer();
        viewer.handle_load_event(LoadEvent::Model(Err(AssetError::InvalidGltf {
            path: "x.glb".to_string(),
            reason: "broken".to_string(),
        })));
        assert!(!viewer.is_model_loaded());
        let mut renderer = renderer();
        assert!(viewer
            .tick(Duration::from_millis(16), &mut renderer, None)
            .is_ok());
    }

    #[test]
    fn tone_mapping_change_marks_materials_dirty() {
        let mut viewer = viewer();
        let mut renderer = renderer();
        viewer
            .compose_model(&model_with_meshes(&["Cube"]))
            .unwrap();
        viewer
            .tick(Duration::ZERO, &mut renderer, None)
            .unwrap();
        assert!(viewer.scene().materials().iter().all(|(_, m)| !m.is_dirty()));

        renderer.settings_mut().tone_mapping = ToneMapping::Reinhard;
        viewer.apply_panel(PanelResponse {
            tone_mapping_changed: true,
            ..PanelResponse::default()
        });
        let stats = viewer
            .tick(Duration::ZERO, &mut renderer, None)
            .unwrap();
        assert_eq!(stats.material_uploads, 1);
    }

    #[test]
    fn baked_texture_is_shared_by_both_materials() {
        let mut viewer = viewer();
        let texture = TextureHandle::cubemap_for_tests(42, 16);
        viewer.handle_load_event(LoadEvent::BakedTexture(Ok(texture)));
        viewer
            .compose_model(&model_with_meshes(&["Cube", "Cube_1"]))
            .unwrap();
        let scene = viewer.scene();
        let maps: Vec<_> = scene
            .materials()
            .iter()
            .filter_map(|(_, m)| match m {
                Material::BakedOpaque(baked) => baked.map.as_ref().map(|t| t.id),
                Material::GlassReflective(glass) => glass.map.as_ref().map(|t| t.id),
                _ => None,
            })
            .collect();
        assert_eq!(maps, vec![42, 42]);
    }
}
