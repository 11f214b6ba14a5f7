use crate::assets::{ImportedMaterial, TextureHandle};

/// Environment intensity a material starts with before the first propagation pass.
pub const DEFAULT_ENVIRONMENT_INTENSITY: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

impl MaterialId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Pre-lit material: the baked texture is the whole shading result.
#[derive(Debug, Clone, PartialEq)]
pub struct BakedOpaque {
    pub map: Option<TextureHandle>,
    pub environment_intensity: f32,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlassReflective {
    pub map: Option<TextureHandle>,
    pub metalness: f32,
    pub roughness: f32,
    pub transparent: bool,
    pub opacity: f32,
    pub environment_intensity: f32,
    pub dirty: bool,
}

/// Physically based material imported with the model.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    pub name: String,
    pub base_color: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    pub environment_intensity: f32,
    pub dirty: bool,
}

/// Imported material flagged unlit; ignores scene lighting entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlitMaterial {
    pub name: String,
    pub base_color: [f32; 4],
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    BakedOpaque(BakedOpaque),
    GlassReflective(GlassReflective),
    Standard(StandardMaterial),
    Unlit(UnlitMaterial),
}

impl Material {
    pub fn baked(map: Option<TextureHandle>) -> Self {
        Material::BakedOpaque(BakedOpaque {
            map,
            environment_intensity: DEFAULT_ENVIRONMENT_INTENSITY,
            dirty: true,
        })
    }

    pub fn glass(map: Option<TextureHandle>) -> Self {
        Material::GlassReflective(GlassReflective {
            map,
            metalness: 1.0,
            roughness: 0.1,
            transparent: true,
            opacity: 0.99,
            environment_intensity: DEFAULT_ENVIRONMENT_INTENSITY,
            dirty: true,
        })
    }

    pub fn from_imported(imported: &ImportedMaterial) -> Self {
        if imported.unlit {
            Material::Unlit(UnlitMaterial {
                name: imported.name.clone(),
                base_color: imported.base_color,
                dirty: true,
            })
        } else {
            Material::Standard(StandardMaterial {
                name: imported.name.clone(),
                base_color: imported.base_color,
                metalness: imported.metalness,
                roughness: imported.roughness,
                environment_intensity: DEFAULT_ENVIRONMENT_INTENSITY,
                dirty: true,
            })
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Material::BakedOpaque(_) => "baked-opaque",
            Material::GlassReflective(_) => "glass-reflective",
            Material::Standard(_) => "standard",
            Material::Unlit(_) => "unlit",
        }
    }

    pub fn has_environment_intensity(&self) -> bool {
        self.environment_intensity().is_some()
    }

    pub fn environment_intensity(&self) -> Option<f32> {
        match self {
            Material::BakedOpaque(m) => Some(m.environment_intensity),
            Material::GlassReflective(m) => Some(m.environment_intensity),
            Material::Standard(m) => Some(m.environment_intensity),
            Material::Unlit(_) => None,
        }
    }

    /// Writes the intensity and marks the material for re-upload.
    /// Returns false when the variant has no environment response.
    pub fn set_environment_intensity(&mut self, value: f32) -> bool {
        let slot = match self {
            Material::BakedOpaque(m) => &mut m.environment_intensity,
            Material::GlassReflective(m) => &mut m.environment_intensity,
            Material::Standard(m) => &mut m.environment_intensity,
            Material::Unlit(_) => return false,
        };
        *slot = value;
        self.mark_dirty();
        true
    }

    fn dirty_flag(&mut self) -> &mut bool {
        match self {
            Material::BakedOpaque(m) => &mut m.dirty,
            Material::GlassReflective(m) => &mut m.dirty,
            Material::Standard(m) => &mut m.dirty,
            Material::Unlit(m) => &mut m.dirty,
        }
    }

    pub fn is_dirty(&self) -> bool {
        match self {
            Material::BakedOpaque(m) => m.dirty,
            Material::GlassReflective(m) => m.dirty,
            Material::Standard(m) => m.dirty,
            Material::Unlit(m) => m.dirty,
        }
    }

    pub fn mark_dirty(&mut self) {
        *self.dirty_flag() = true;
    }

    pub fn clear_dirty(&mut self) {
        *self.dirty_flag() = false;
    }
}

/// Materials shared between nodes. Entries are never removed.
#[derive(Debug, Default)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self {
            materials: Vec::new(),
        }
    }

    pub fn insert(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len());
        self.materials.push(material);
        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(index, material)| (MaterialId(index), material))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MaterialId, &mut Material)> {
        self.materials
            .iter_mut()
            .enumerate()
            .map(|(index, material)| (MaterialId(index), material))
    }
}
