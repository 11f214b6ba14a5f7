//! Name-based material assignment for the loaded model.
//!
//! Rules are evaluated in table order and the first match wins. The default
//! table checks the numbered `Cube_N` pattern before the bare `Cube` pattern,
//! so numbered pieces stay baked and only the plain `Cube` mesh turns to glass.

use crate::assets::TextureHandle;
use crate::scene::material::{Material, MaterialId};
use crate::scene::{NodeId, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialVariant {
    BakedOpaque,
    GlassReflective,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    /// Substrings; any one of them matching selects the rule.
    pub patterns: Vec<String>,
    pub variant: MaterialVariant,
    pub shadows: bool,
}

impl ClassificationRule {
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| name.contains(pattern.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub variant: MaterialVariant,
    pub casts_shadow: bool,
    pub receives_shadow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    rules: Vec<ClassificationRule>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::new(vec![numbered_cube_rule(), glass_cube_rule()])
    }
}

impl ClassifierRules {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Broad `Cube` rule first: every `Cube_N` mesh becomes glass as well.
    pub fn broad_first() -> Self {
        Self::new(vec![glass_cube_rule(), numbered_cube_rule()])
    }

    pub fn classify(&self, name: &str) -> Option<Classification> {
        self.rules
            .iter()
            .find(|rule| rule.matches(name))
            .map(|rule| Classification {
                variant: rule.variant,
                casts_shadow: rule.shadows,
                receives_shadow: rule.shadows,
            })
    }
}

fn glass_cube_rule() -> ClassificationRule {
    ClassificationRule {
        patterns: vec!["Cube".to_string()],
        variant: MaterialVariant::GlassReflective,
        shadows: true,
    }
}

fn numbered_cube_rule() -> ClassificationRule {
    ClassificationRule {
        patterns: (1..=9).map(|n| format!("Cube_{n}")).collect(),
        variant: MaterialVariant::BakedOpaque,
        shadows: true,
    }
}

/// The two shared materials the classifier hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposedMaterials {
    pub baked: MaterialId,
    pub glass: MaterialId,
}

impl ComposedMaterials {
    pub fn create(scene: &mut Scene, baked_texture: Option<TextureHandle>) -> Self {
        let baked = scene.add_material(Material::baked(baked_texture.clone()));
        let glass = scene.add_material(Material::glass(baked_texture));
        Self { baked, glass }
    }

    pub fn for_variant(&self, variant: MaterialVariant) -> MaterialId {
        match variant {
            MaterialVariant::BakedOpaque => self.baked,
            MaterialVariant::GlassReflective => self.glass,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub glass: usize,
    pub baked: usize,
    pub unmatched: usize,
}

/// Assigns materials and shadow flags to every mesh under `root`.
pub fn classify_subtree(
    scene: &mut Scene,
    root: NodeId,
    rules: &ClassifierRules,
    materials: &ComposedMaterials,
) -> ClassificationSummary {
    let mut summary = ClassificationSummary::default();
    for id in scene.descendants(root) {
        let Some(node) = scene.node_mut(id) else {
            continue;
        };
        if !node.is_mesh() {
            continue;
        }
        match rules.classify(&node.name) {
            Some(classification) => {
                node.material = Some(materials.for_variant(classification.variant));
                node.set_shadows(classification.casts_shadow, classification.receives_shadow);
                match classification.variant {
                    MaterialVariant::GlassReflective => summary.glass += 1,
                    MaterialVariant::BakedOpaque => summary.baked += 1,
                }
                log::debug!("Mesh '{}' -> {:?}", node.name, classification.variant);
            }
            None => {
                summary.unmatched += 1;
                log::debug!("Mesh '{}' keeps its imported material", node.name);
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::test_support::model_with_meshes;

    fn variant_of(scene: &Scene, name: &str, materials: &ComposedMaterials) -> Option<MaterialVariant> {
        let node = scene.node(scene.find_by_name(name)?)?;
        let material = node.material?;
        if material == materials.glass {
            Some(MaterialVariant::GlassReflective)
        } else if material == materials.baked {
            Some(MaterialVariant::BakedOpaque)
        } else {
            None
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let rules = ClassifierRules::default();
        for name in ["Cube", "Cube_3", "Cube_10", "Plane", "", "cube"] {
            assert_eq!(rules.classify(name), rules.classify(name));
        }
    }

    #[test]
    fn numbered_cube_prefers_baked() {
        let rules = ClassifierRules::default();
        let result = rules.classify("Cube_3").unwrap();
        assert_eq!(result.variant, MaterialVariant::BakedOpaque);
        assert!(result.casts_shadow && result.receives_shadow);
        assert_eq!(
            rules.classify("Cube").map(|c| c.variant),
            Some(MaterialVariant::GlassReflective)
        );
    }

    #[test]
    fn broad_first_turns_numbered_cubes_into_glass() {
        let rules = ClassifierRules::broad_first();
        assert_eq!(
            rules.classify("Cube_3").map(|c| c.variant),
            Some(MaterialVariant::GlassReflective)
        );
    }

    #[test]
    fn matching_is_substring_and_case_sensitive() {
        let rules = ClassifierRules::default();
        assert_eq!(
            rules.classify("Window_Cube.002").map(|c| c.variant),
            Some(MaterialVariant::GlassReflective)
        );
        // Cube_10 contains Cube_1
        assert_eq!(
            rules.classify("Cube_10").map(|c| c.variant),
            Some(MaterialVariant::BakedOpaque)
        );
        assert!(rules.classify("cube").is_none());
        assert!(rules.classify("Plane").is_none());
    }

    #[test]
    fn subtree_classification_assigns_materials_and_shadows() {
        let mut scene = Scene::new();
        let model = model_with_meshes(&["Cube", "Cube_1", "Cube_2", "Floor"]);
        let root = scene.add_model(&model, &[]).unwrap();
        let materials = ComposedMaterials::create(&mut scene, None);

        let summary = classify_subtree(&mut scene, root, &ClassifierRules::default(), &materials);
        assert_eq!(
            summary,
            ClassificationSummary {
                glass: 1,
                baked: 2,
                unmatched: 1
            }
        );

        assert_eq!(
            variant_of(&scene, "Cube", &materials),
            Some(MaterialVariant::GlassReflective)
        );
        assert_eq!(
            variant_of(&scene, "Cube_1", &materials),
            Some(MaterialVariant::BakedOpaque)
        );
        assert_eq!(
            variant_of(&scene, "Cube_2", &materials),
            Some(MaterialVariant::BakedOpaque)
        );
        for name in ["Cube", "Cube_1", "Cube_2"] {
            let node = scene.node(scene.find_by_name(name).unwrap()).unwrap();
            assert!(node.casts_shadow && node.receives_shadow, "{name}");
        }

        let floor = scene.node(scene.find_by_name("Floor").unwrap()).unwrap();
        assert!(floor.material.is_none());
        assert!(!floor.casts_shadow && !floor.receives_shadow);
    }

    #[test]
    fn group_nodes_are_not_classified() {
        let mut scene = Scene::new();
        let model = model_with_meshes(&[]);
        let root = scene.add_model(&model, &[]).unwrap();
        scene.node_mut(root).unwrap().name = "Cube".to_string();
        let materials = ComposedMaterials::create(&mut scene, None);
        let summary = classify_subtree(&mut scene, root, &ClassifierRules::default(), &materials);
        assert_eq!(summary, ClassificationSummary::default());
        assert!(scene.node(root).unwrap().material.is_none());
    }
}
