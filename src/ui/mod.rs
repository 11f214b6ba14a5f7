use crate::render::ToneMapping;
use crate::scene::animator::ToggleState;
use glam::Vec3;
use std::f32::consts::PI;

/// Mutable views into the parameters the panel edits, borrowed for one pass.
pub struct PanelBindings<'a> {
    pub env_map_intensity: &'a mut f32,
    /// `None` until the model is in the scene.
    pub model_rotation_y: Option<&'a mut f32>,
    pub light_intensity: &'a mut f32,
    pub light_position: &'a mut Vec3,
    pub tone_mapping: &'a mut ToneMapping,
    pub exposure: &'a mut f32,
    pub toggles: &'a mut ToggleState,
}

/// Which edits need follow-up work outside the panel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PanelResponse {
    pub environment_changed: bool,
    pub tone_mapping_changed: bool,
    pub light_changed: bool,
}

impl PanelResponse {
    pub fn any_changed(&self) -> bool {
        self.environment_changed || self.tone_mapping_changed || self.light_changed
    }

    pub fn merge(&mut self, other: PanelResponse) {
        self.environment_changed |= other.environment_changed;
        self.tone_mapping_changed |= other.tone_mapping_changed;
        self.light_changed |= other.light_changed;
    }
}

pub struct ControlPanel {
    title: String,
    open: bool,
}

impl ControlPanel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn show(&mut self, ctx: &egui::Context, bindings: PanelBindings<'_>) -> PanelResponse {
        let mut response = PanelResponse::default();
        let mut open = self.open;
        egui::Window::new(self.title.as_str())
            .open(&mut open)
            .default_width(280.0)
            .resizable(false)
            .show(ctx, |ui| {
                response.merge(draw_controls(ui, bindings));
            });
        self.open = open;
        response
    }
}

fn draw_controls(ui: &mut egui::Ui, bindings: PanelBindings<'_>) -> PanelResponse {
    let PanelBindings {
        env_map_intensity,
        model_rotation_y,
        light_intensity,
        light_position,
        tone_mapping,
        exposure,
        toggles,
    } = bindings;
    let mut response = PanelResponse::default();

    response.environment_changed = ui
        .add(
            egui::Slider::new(env_map_intensity, 0.0..=10.0)
                .step_by(0.001)
                .text("envMapIntensity"),
        )
        .changed();

    if let Some(rotation) = model_rotation_y {
        ui.add(
            egui::Slider::new(rotation, -PI..=PI)
                .step_by(0.001)
                .text("rotation"),
        );
    }

    ui.separator();
    let mut light_changed = ui
        .add(
            egui::Slider::new(light_intensity, 0.0..=10.0)
                .step_by(0.001)
                .text("lightIntensity"),
        )
        .changed();
    for (value, label) in [
        (&mut light_position.x, "lightX"),
        (&mut light_position.y, "lightY"),
        (&mut light_position.z, "lightZ"),
    ] {
        light_changed |= ui
            .add(egui::Slider::new(value, -5.0..=5.0).step_by(0.001).text(label))
            .changed();
    }
    response.light_changed = light_changed;

    ui.separator();
    let mut tone_mapping_changed = false;
    egui::ComboBox::from_label("toneMapping")
        .selected_text(tone_mapping.label())
        .show_ui(ui, |ui| {
            for option in ToneMapping::ALL {
                tone_mapping_changed |= ui
                    .selectable_value(tone_mapping, option, option.label())
                    .changed();
            }
        });
    response.tone_mapping_changed = tone_mapping_changed;
    ui.add(
        egui::Slider::new(exposure, 0.0..=10.0)
            .step_by(0.001)
            .text("toneMappingExposure"),
    );

    ui.separator();
    ui.checkbox(&mut toggles.auto_rotate_light, "Auto Rotate Light");
    ui.checkbox(&mut toggles.rotate_object_x, "Object X Rotation");
    ui.checkbox(&mut toggles.rotate_object_y, "Object Y Rotation");
    ui.checkbox(&mut toggles.rotate_object_z, "Object Z Rotation");
    ui.checkbox(&mut toggles.rotate_scene, "Scene Rotation");

    response
}
