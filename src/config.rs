use crate::render::{ShadowFilter, ToneMapping};
use crate::scene::animator::ToggleState;
use crate::scene::light::ShadowSettings;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "bakeview.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Startup configuration. Every field has a default, so a partial file works.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_title: String,
    pub window_size: [u32; 2],
    pub asset_root: PathBuf,
    pub model_path: String,
    pub baked_texture_path: String,
    /// +x, -x, +y, -y, +z, -z
    pub cubemap_faces: [String; 6],
    pub model_scale: f32,
    /// Evaluate the bare `Cube` rule before `Cube_1`..`Cube_9`.
    pub glass_rule_first: bool,
    pub env_map_intensity: f32,
    pub tone_mapping: ToneMapping,
    pub tone_mapping_exposure: f32,
    pub shadow_filter: ShadowFilter,
    pub light_position: [f32; 3],
    pub light_intensity: f32,
    pub shadow: ShadowSettings,
    pub camera_position: [f32; 3],
    pub camera_fov_deg: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    pub camera_damping: f32,
    pub max_pixel_ratio: f32,
    pub toggles: ToggleState,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let face = |name: &str| format!("textures/environmentMaps/1/{name}.jpg");
        Self {
            window_title: "bakeview".to_string(),
            window_size: [1280, 720],
            asset_root: PathBuf::from("assets"),
            model_path: "models/rendersimplebake.glb".to_string(),
            baked_texture_path: "models/Musholla_Bake1_CyclesBake_COMBINED.png".to_string(),
            cubemap_faces: [
                face("px"),
                face("nx"),
                face("py"),
                face("ny"),
                face("pz"),
                face("nz"),
            ],
            model_scale: 0.3,
            glass_rule_first: false,
            env_map_intensity: 5.0,
            tone_mapping: ToneMapping::AcesFilmic,
            tone_mapping_exposure: 3.0,
            shadow_filter: ShadowFilter::Pcf,
            light_position: [0.28, 5.0, 2.02],
            light_intensity: 2.5,
            shadow: ShadowSettings::default(),
            camera_position: [4.0, 1.0, -4.0],
            camera_fov_deg: 75.0,
            camera_near: 0.1,
            camera_far: 100.0,
            camera_damping: 0.05,
            max_pixel_ratio: 2.0,
            toggles: ToggleState::default(),
        }
    }
}

pub fn save_config(config: &ViewerConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_config(path: &Path) -> Result<ViewerConfig> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// An explicit path must load; the default file is optional.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ViewerConfig> {
    if let Some(path) = explicit {
        log::info!("Loading config from {}", path.display());
        return load_config(path);
    }
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        log::info!("Loading config from {}", default_path.display());
        return load_config(default_path);
    }
    log::info!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
    Ok(ViewerConfig::default())
}
