mod camera;

pub use camera::{OrbitControls, PerspectiveCamera};

use crate::scene::light::DirectionalLight;
use crate::scene::{NodeKind, Scene};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create window: {0}")]
    WindowCreate(#[from] winit::error::OsError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ToneMapping {
    None,
    Linear,
    Reinhard,
    Cineon,
    AcesFilmic,
}

impl ToneMapping {
    pub const ALL: [ToneMapping; 5] = [
        ToneMapping::None,
        ToneMapping::Linear,
        ToneMapping::Reinhard,
        ToneMapping::Cineon,
        ToneMapping::AcesFilmic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToneMapping::None => "No",
            ToneMapping::Linear => "Linear",
            ToneMapping::Reinhard => "Reinhard",
            ToneMapping::Cineon => "Cineon",
            ToneMapping::AcesFilmic => "ACESFilmic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ShadowFilter {
    Basic,
    Pcf,
    PcfSoft,
    Vsm,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererSettings {
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    pub shadow_map_enabled: bool,
    pub shadow_filter: ShadowFilter,
    pub output_srgb: bool,
    pub physically_correct_lights: bool,
    pub antialias: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: 3.0,
            shadow_map_enabled: true,
            shadow_filter: ShadowFilter::Pcf,
            output_srgb: true,
            physically_correct_lights: true,
            antialias: true,
        }
    }
}

/// Tessellated control panel for one frame, ready for upload.
pub struct UiFrame {
    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    pixels_per_point: f32,
}

impl UiFrame {
    pub fn tessellate(
        ctx: &egui::Context,
        shapes: Vec<egui::epaint::ClippedShape>,
        textures_delta: egui::TexturesDelta,
        pixels_per_point: f32,
    ) -> Self {
        Self {
            primitives: ctx.tessellate(shapes, pixels_per_point),
            textures_delta,
            pixels_per_point,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.primitives
            .iter()
            .map(|clipped| match &clipped.primitive {
                egui::epaint::Primitive::Mesh(mesh) => mesh.vertices.len(),
                egui::epaint::Primitive::Callback(_) => 0,
            })
            .sum()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub skipped: bool,
    pub draw_calls: usize,
    pub material_uploads: usize,
    pub shadow_casters: usize,
    pub ui_vertices: usize,
}

/// The rasterizer the frame loop hands each finished scene to.
pub trait RenderBackend {
    fn set_size(&mut self, width: u32, height: u32);
    fn set_pixel_ratio(&mut self, ratio: f32);
    fn settings(&self) -> &RendererSettings;
    fn settings_mut(&mut self) -> &mut RendererSettings;
    /// Draws one frame. Re-uploads dirty materials and clears their flag.
    fn render(
        &mut self,
        scene: &mut Scene,
        camera: &PerspectiveCamera,
        light: &DirectionalLight,
        ui: Option<&UiFrame>,
    ) -> Result<FrameStats, RenderError>;
}

/// Backend without a GPU surface: performs the bookkeeping a real backend
/// does (material re-upload, draw list, shadow casters) and logs it.
pub struct HeadlessRenderer {
    settings: RendererSettings,
    width: u32,
    height: u32,
    pixel_ratio: f32,
    frame_index: u64,
    uploads_total: u64,
}

impl HeadlessRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        log::info!(
            "Headless renderer: tone mapping {}, exposure {}, shadows {} ({:?})",
            settings.tone_mapping.label(),
            settings.exposure,
            settings.shadow_map_enabled,
            settings.shadow_filter
        );
        log::info!(
            "   output {}, {} lights, antialias {}",
            if settings.output_srgb { "sRGB" } else { "linear" },
            if settings.physically_correct_lights {
                "physically correct"
            } else {
                "legacy"
            },
            if settings.antialias { "on" } else { "off" }
        );
        Self {
            settings,
            width: 0,
            height: 0,
            pixel_ratio: 1.0,
            frame_index: 0,
            uploads_total: 0,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn uploads_total(&self) -> u64 {
        self.uploads_total
    }
}

impl RenderBackend for HeadlessRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
    }

    fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        camera: &PerspectiveCamera,
        light: &DirectionalLight,
        ui: Option<&UiFrame>,
    ) -> Result<FrameStats, RenderError> {
        self.frame_index += 1;
        let mut stats = FrameStats {
            frame_index: self.frame_index,
            ..FrameStats::default()
        };
        // Minimised window: nothing to draw into.
        if self.width == 0 || self.height == 0 {
            stats.skipped = true;
            return Ok(stats);
        }

        for (_, material) in scene.materials_mut().iter_mut() {
            if material.is_dirty() {
                material.clear_dirty();
                stats.material_uploads += 1;
            }
        }
        self.uploads_total += stats.material_uploads as u64;

        let worlds = scene.world_matrices();
        let view_projection = camera.projection_matrix() * camera.view_matrix();
        let shadow_pass = self.settings.shadow_map_enabled && light.shadow.enabled;
        let light_view = light.world_matrix().inverse();
        for id in scene.traverse() {
            let Some(node) = scene.node(id) else {
                continue;
            };
            if let NodeKind::Mesh(mesh) = &node.kind {
                let clip = view_projection * worlds[id.index()];
                if clip.is_finite() {
                    stats.draw_calls += mesh.primitive_count;
                }
                let in_shadow_map = (light_view * worlds[id.index()]).is_finite();
                if node.casts_shadow && shadow_pass && in_shadow_map {
                    stats.shadow_casters += 1;
                }
            }
        }

        if let Some(ui) = ui {
            stats.ui_vertices = ui.vertex_count();
            if !ui.textures_delta.set.is_empty() {
                log::trace!(
                    "Uploading {} UI texture deltas at {} ppp",
                    ui.textures_delta.set.len(),
                    ui.pixels_per_point
                );
            }
        }

        if stats.material_uploads > 0 {
            log::debug!(
                "Frame {}: re-uploaded {} materials",
                stats.frame_index,
                stats.material_uploads
            );
        }
        log::trace!(
            "Frame {} {}x{}@{}: {} draws, {} shadow casters ({}px map, sun {:?}), tone mapping {} exposure {}",
            stats.frame_index,
            self.width,
            self.height,
            self.pixel_ratio,
            stats.draw_calls,
            stats.shadow_casters,
            light.shadow.map_size,
            light.direction(),
            self.settings.tone_mapping.label(),
            self.settings.exposure
        );
        Ok(stats)
    }
}
