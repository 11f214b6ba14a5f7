mod gltf_model;

use crate::scene::{Aabb, Transform};
use std::path::{Path, PathBuf};

pub use gltf_model::parse_model;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read asset at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse glTF in {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("invalid glTF structure in {path}: {reason}")]
    InvalidGltf { path: String, reason: String },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("cubemap face {face} is {width}x{height}, expected {expected}x{expected}")]
    CubemapFaceMismatch {
        face: usize,
        width: u32,
        height: u32,
        expected: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ColorSpace {
    Linear,
    Srgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Texture2d,
    Cubemap,
}

/// Opaque handle to a decoded texture owned by the asset provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureHandle {
    pub id: u64,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub flip_y: bool,
    pub source: PathBuf,
}

impl TextureHandle {
    #[cfg(test)]
    pub fn cubemap_for_tests(id: u64, size: u32) -> Self {
        Self {
            id,
            kind: TextureKind::Cubemap,
            width: size,
            height: size,
            color_space: ColorSpace::Srgb,
            flip_y: false,
            source: PathBuf::from("test"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    pub base_color: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    pub unlit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelMesh {
    pub name: String,
    pub bounds: Aabb,
    pub primitive_count: usize,
    /// Index into `ModelAsset::materials`.
    pub material: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<ModelMesh>,
    pub children: Vec<usize>,
}

/// Hierarchy and metadata of a loaded model, before it joins a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    pub name: String,
    pub nodes: Vec<ModelNode>,
    pub roots: Vec<usize>,
    pub materials: Vec<ImportedMaterial>,
}

impl ModelAsset {
    pub fn mesh_names(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| node.mesh.is_some())
            .map(|node| node.name.as_str())
            .collect()
    }
}

/// Texture decode options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    pub color_space: ColorSpace,
    pub flip_y: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Srgb,
            flip_y: true,
        }
    }
}

/// Loads models and textures. Implementations may block; callers run them
/// off the frame thread.
pub trait AssetProvider {
    fn load_model(&mut self, path: &str) -> Result<ModelAsset, AssetError>;
    fn load_cubemap(
        &mut self,
        faces: &[String; 6],
        options: TextureOptions,
    ) -> Result<TextureHandle, AssetError>;
    fn load_texture(
        &mut self,
        path: &str,
        options: TextureOptions,
    ) -> Result<TextureHandle, AssetError>;
}

/// Reads assets from disk relative to a root directory.
pub struct FsAssetProvider {
    root: PathBuf,
    next_texture_id: u64,
}

impl FsAssetProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_texture_id: 1,
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_texture_id;
        self.next_texture_id += 1;
        id
    }
}

impl AssetProvider for FsAssetProvider {
    fn load_model(&mut self, path: &str) -> Result<ModelAsset, AssetError> {
        let full_path = self.resolve(path);
        let display = full_path.display().to_string();
        let bytes = std::fs::read(&full_path).map_err(|source| AssetError::Read {
            path: display.clone(),
            source,
        })?;
        let name = full_path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("model")
            .to_string();
        parse_model(&name, &display, &bytes)
    }

    fn load_cubemap(
        &mut self,
        faces: &[String; 6],
        options: TextureOptions,
    ) -> Result<TextureHandle, AssetError> {
        let mut size = None;
        for (face, path) in faces.iter().enumerate() {
            let (width, height) = image_dimensions(&self.resolve(path))?;
            let expected = *size.get_or_insert(width);
            if width != height || width != expected {
                return Err(AssetError::CubemapFaceMismatch {
                    face,
                    width,
                    height,
                    expected,
                });
            }
        }
        let size = size.unwrap_or(0);
        Ok(TextureHandle {
            id: self.allocate_id(),
            kind: TextureKind::Cubemap,
            width: size,
            height: size,
            color_space: options.color_space,
            flip_y: options.flip_y,
            source: self.resolve(&faces[0]),
        })
    }

    fn load_texture(
        &mut self,
        path: &str,
        options: TextureOptions,
    ) -> Result<TextureHandle, AssetError> {
        let full_path = self.resolve(path);
        let (width, height) = image_dimensions(&full_path)?;
        Ok(TextureHandle {
            id: self.allocate_id(),
            kind: TextureKind::Texture2d,
            width,
            height,
            color_space: options.color_space,
            flip_y: options.flip_y,
            source: full_path,
        })
    }
}

fn image_dimensions(path: &Path) -> Result<(u32, u32), AssetError> {
    image::image_dimensions(path).map_err(|source| AssetError::Image {
        path: path.display().to_string(),
        source,
    })
}
