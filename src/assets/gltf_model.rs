//! glTF 2.0 metadata through the `gltf` crate: node hierarchy, names,
//! transforms, primitive bounds and material parameters. Buffers are never
//! decoded; vertex data is left to the renderer.

use super::{AssetError, ImportedMaterial, ModelAsset, ModelMesh, ModelNode};
use crate::scene::{Aabb, Transform};
use glam::{EulerRot, Quat, Vec3};
use gltf::{Document, Gltf, Semantic};
use std::collections::HashMap;

/// Per-document name registry: the first claim of a base name gets it
/// verbatim, later claims get `_1`, `_2`, ...
#[derive(Debug, Default)]
struct UniqueNames {
    used: HashMap<String, usize>,
}

impl UniqueNames {
    fn claim(&mut self, base: &str) -> String {
        match self.used.get_mut(base) {
            Some(count) => {
                *count += 1;
                format!("{base}_{count}")
            }
            None => {
                self.used.insert(base.to_string(), 0);
                base.to_string()
            }
        }
    }
}

/// Parses a `.glb` container or a plain `.gltf` JSON document.
pub fn parse_model(name: &str, path: &str, bytes: &[u8]) -> Result<ModelAsset, AssetError> {
    let gltf = Gltf::from_slice(bytes).map_err(|source| AssetError::Gltf {
        path: path.to_string(),
        source,
    })?;
    build_model(name, path, &gltf.document)
}

fn build_model(name: &str, path: &str, document: &Document) -> Result<ModelAsset, AssetError> {
    let invalid = |reason: String| AssetError::InvalidGltf {
        path: path.to_string(),
        reason,
    };
    let node_count = document.nodes().count();
    let children: Vec<Vec<usize>> = document
        .nodes()
        .map(|node| node.children().map(|child| child.index()).collect())
        .collect();

    let mut parents = vec![0usize; node_count];
    for (index, node_children) in children.iter().enumerate() {
        for &child in node_children {
            let Some(count) = parents.get_mut(child) else {
                return Err(invalid(format!("node {index} has missing child {child}")));
            };
            *count += 1;
            if *count > 1 {
                return Err(invalid(format!("node {child} has more than one parent")));
            }
        }
    }

    let roots: Vec<usize> = match document
        .default_scene()
        .or_else(|| document.scenes().next())
    {
        Some(scene) => scene.nodes().map(|node| node.index()).collect(),
        None => (0..node_count).filter(|index| parents[*index] == 0).collect(),
    };

    let mut visited = vec![false; node_count];
    let mut pending = roots.clone();
    while let Some(index) = pending.pop() {
        let Some(seen) = visited.get_mut(index) else {
            return Err(invalid(format!("scene references missing node {index}")));
        };
        if *seen {
            return Err(invalid(format!("node {index} is reachable more than once")));
        }
        *seen = true;
        pending.extend(children[index].iter().copied());
    }

    let materials = document
        .materials()
        .enumerate()
        .map(|(index, material)| {
            let pbr = material.pbr_metallic_roughness();
            ImportedMaterial {
                name: material
                    .name()
                    .map_or_else(|| format!("material_{index}"), str::to_string),
                base_color: pbr.base_color_factor(),
                metalness: pbr.metallic_factor(),
                roughness: pbr.roughness_factor(),
                unlit: material.unlit(),
            }
        })
        .collect();

    let mut names = UniqueNames::default();
    let mut nodes = Vec::with_capacity(node_count);
    // One node per primitive of a multi-primitive mesh, appended after the
    // document's own nodes so their indices stay valid.
    let mut split = Vec::new();
    for node in document.nodes() {
        let mut node_children = Vec::new();
        let mut mesh = None;
        let mut mesh_base = None;
        if let Some(source) = node.mesh() {
            let base = source
                .name()
                .or(node.name())
                .map_or_else(|| format!("mesh_{}", source.index()), str::to_string);
            let primitives: Vec<_> = source.primitives().collect();
            match primitives.as_slice() {
                [] => {}
                [primitive] => mesh = Some(model_mesh(base.clone(), primitive)),
                primitives => {
                    // Primitives claim their names before the group does.
                    for primitive in primitives {
                        let primitive_name = names.claim(&base);
                        node_children.push(node_count + split.len());
                        split.push(ModelNode {
                            name: primitive_name.clone(),
                            transform: Transform::IDENTITY,
                            mesh: Some(model_mesh(primitive_name, primitive)),
                            children: Vec::new(),
                        });
                    }
                }
            }
            mesh_base = Some(base);
        }
        node_children.extend(children[node.index()].iter().copied());

        let name = match (node.name(), &mesh, mesh_base) {
            (Some(name), _, _) => names.claim(name),
            (None, Some(_), Some(base)) => names.claim(&base),
            _ => format!("node_{}", node.index()),
        };
        nodes.push(ModelNode {
            name,
            transform: node_transform(&node),
            mesh,
            children: node_children,
        });
    }
    let split_count = split.len();
    nodes.extend(split);

    log::debug!(
        "Parsed glTF {}: {} nodes ({} split from primitives), {} meshes, {} materials",
        path,
        nodes.len(),
        split_count,
        document.meshes().count(),
        document.materials().count()
    );

    Ok(ModelAsset {
        name: name.to_string(),
        nodes,
        roots,
        materials,
    })
}

fn model_mesh(name: String, primitive: &gltf::Primitive<'_>) -> ModelMesh {
    ModelMesh {
        name,
        bounds: primitive_bounds(primitive),
        primitive_count: 1,
        material: primitive.material().index(),
    }
}

fn primitive_bounds(primitive: &gltf::Primitive<'_>) -> Aabb {
    let Some(positions) = primitive.get(&Semantic::Positions) else {
        return Aabb::EMPTY;
    };
    match (positions.min(), positions.max()) {
        (Some(min), Some(max)) => match (vec3(&min), vec3(&max)) {
            (Some(min), Some(max)) => Aabb::new(min, max),
            _ => Aabb::EMPTY,
        },
        _ => Aabb::EMPTY,
    }
}

fn vec3(value: &gltf::json::Value) -> Option<Vec3> {
    let values = value.as_array()?;
    let component = |index: usize| values.get(index)?.as_f64().map(|v| v as f32);
    Some(Vec3::new(component(0)?, component(1)?, component(2)?))
}

fn node_transform(node: &gltf::Node<'_>) -> Transform {
    let (translation, rotation, scale) = node.transform().decomposed();
    let (x, y, z) = Quat::from_array(rotation).to_euler(EulerRot::XYZ);
    Transform {
        position: Vec3::from(translation),
        rotation: Vec3::new(x, y, z),
        scale: Vec3::from(scale),
    }
}
