pub mod animator;
pub mod classify;
pub mod environment;
pub mod light;
pub mod material;

use crate::assets::{ModelAsset, TextureHandle};
use glam::{EulerRot, Mat4, Quat, Vec3};
use material::{Material, MaterialId, MaterialTable};

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("a model is already loaded into the scene (root node {0:?})")]
    ModelAlreadyLoaded(NodeId),
    #[error("model node {index} referenced by '{model}' does not exist")]
    MissingModelNode { model: String, index: usize },
    #[error("model node {index} in '{model}' is reachable more than once")]
    RevisitedModelNode { model: String, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Local transform. Rotation is Euler XYZ in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

/// Axis-aligned bounding box. An empty box has `min > max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.extend_point(other.min);
        self.extend_point(other.max);
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.min + self.max) * 0.5
    }

    /// Half-size along each axis.
    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.max - self.min) * 0.5
    }

    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let mut out = Aabb::EMPTY;
        if self.is_empty() {
            return out;
        }
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.extend_point(matrix.transform_point3(corner));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub mesh_name: String,
    pub bounds: Aabb,
    pub primitive_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(MeshData),
    Camera,
    DirectionalLight,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub material: Option<MaterialId>,
    pub casts_shadow: bool,
    pub receives_shadow: bool,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform::IDENTITY,
            material: None,
            casts_shadow: false,
            receives_shadow: false,
            children: Vec::new(),
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    /// Shadow flags only mean something on mesh nodes.
    pub fn set_shadows(&mut self, casts: bool, receives: bool) {
        if self.is_mesh() {
            self.casts_shadow = casts;
            self.receives_shadow = receives;
        }
    }
}

/// Single scene: one camera, one directional light, at most one loaded model.
pub struct Scene {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    materials: MaterialTable,
    /// Scene-level transform; the "rotate scene" toggle spins this.
    pub transform: Transform,
    background: Option<TextureHandle>,
    environment: Option<TextureHandle>,
    camera: NodeId,
    light: NodeId,
    model_root: Option<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        let mut scene = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            materials: MaterialTable::new(),
            transform: Transform::IDENTITY,
            background: None,
            environment: None,
            camera: NodeId(0),
            light: NodeId(0),
            model_root: None,
        };
        scene.camera = scene.push_root(Node::new("Camera", NodeKind::Camera));
        scene.light = scene.push_root(Node::new("DirectionalLight", NodeKind::DirectionalLight));
        scene
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn push_root(&mut self, node: Node) -> NodeId {
        let id = self.push_node(node);
        self.roots.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn camera_node(&self) -> NodeId {
        self.camera
    }

    pub fn light_node(&self) -> NodeId {
        self.light
    }

    pub fn model_root(&self) -> Option<NodeId> {
        self.model_root
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialTable {
        &mut self.materials
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn material_of(&self, id: NodeId) -> Option<&Material> {
        self.node(id)
            .and_then(|node| node.material)
            .and_then(|material| self.materials.get(material))
    }

    pub fn background(&self) -> Option<&TextureHandle> {
        self.background.as_ref()
    }

    pub fn environment(&self) -> Option<&TextureHandle> {
        self.environment.as_ref()
    }

    pub fn set_background(&mut self, texture: TextureHandle) {
        self.background = Some(texture);
    }

    pub fn set_environment(&mut self, texture: TextureHandle) {
        self.environment = Some(texture);
    }

    /// Depth-first, pre-order walk over every node reachable from the roots.
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.node(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.traverse()
            .into_iter()
            .find(|id| self.nodes[id.0].name == name)
    }

    /// World matrices for every reachable node, indexed by `NodeId::index`.
    /// Unreachable slots stay identity.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut worlds = vec![Mat4::IDENTITY; self.nodes.len()];
        let scene_matrix = self.transform.matrix();
        let mut stack: Vec<(NodeId, Mat4)> =
            self.roots.iter().map(|id| (*id, scene_matrix)).collect();
        while let Some((id, parent)) = stack.pop() {
            let node = &self.nodes[id.0];
            let world = parent * node.transform.matrix();
            worlds[id.0] = world;
            for child in &node.children {
                stack.push((*child, world));
            }
        }
        worlds
    }

    /// Bounds of a subtree in the coordinate frame of `root`'s parent.
    pub fn subtree_bounds(&self, root: NodeId) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        let Some(node) = self.node(root) else {
            return bounds;
        };
        let mut stack = vec![(root, node.transform.matrix())];
        while let Some((id, matrix)) = stack.pop() {
            let node = &self.nodes[id.0];
            if let NodeKind::Mesh(mesh) = &node.kind {
                bounds.union(&mesh.bounds.transformed(&matrix));
            }
            for child in &node.children {
                let child_matrix = matrix * self.nodes[child.0].transform.matrix();
                stack.push((*child, child_matrix));
            }
        }
        bounds
    }

    /// Instantiates a loaded model as the scene's single model subtree.
    ///
    /// `imported` maps the model's material indices to scene material ids.
    pub fn add_model(
        &mut self,
        model: &ModelAsset,
        imported: &[MaterialId],
    ) -> Result<NodeId, SceneError> {
        if let Some(existing) = self.model_root {
            return Err(SceneError::ModelAlreadyLoaded(existing));
        }
        for &index in model
            .roots
            .iter()
            .chain(model.nodes.iter().flat_map(|node| node.children.iter()))
        {
            if index >= model.nodes.len() {
                return Err(SceneError::MissingModelNode {
                    model: model.name.clone(),
                    index,
                });
            }
        }
        // Each node must hang off exactly one path, or the walk below never ends.
        let mut visited = vec![false; model.nodes.len()];
        let mut pending = model.roots.clone();
        while let Some(index) = pending.pop() {
            if std::mem::replace(&mut visited[index], true) {
                return Err(SceneError::RevisitedModelNode {
                    model: model.name.clone(),
                    index,
                });
            }
            pending.extend(model.nodes[index].children.iter().copied());
        }

        let root = self.push_root(Node::new(model.name.clone(), NodeKind::Group));
        let mut stack: Vec<(usize, NodeId)> =
            model.roots.iter().rev().map(|index| (*index, root)).collect();
        while let Some((index, parent)) = stack.pop() {
            let source = &model.nodes[index];
            let mut node = match &source.mesh {
                Some(mesh) => {
                    let mut node = Node::new(
                        source.name.clone(),
                        NodeKind::Mesh(MeshData {
                            mesh_name: mesh.name.clone(),
                            bounds: mesh.bounds,
                            primitive_count: mesh.primitive_count,
                        }),
                    );
                    node.material = mesh
                        .material
                        .and_then(|material| imported.get(material).copied());
                    node
                }
                None => Node::new(source.name.clone(), NodeKind::Group),
            };
            node.transform = source.transform;
            let id = self.push_node(node);
            self.nodes[parent.0].children.push(id);
            for child in source.children.iter().rev() {
                stack.push((*child, id));
            }
        }

        self.model_root = Some(root);
        Ok(root)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::model_with_meshes;
    use super::*;
    use crate::assets::{ModelMesh, ModelNode};

    #[test]
    fn new_scene_has_one_camera_and_one_light() {
        let scene = Scene::new();
        let cameras = scene
            .traverse()
            .into_iter()
            .filter(|id| scene.node(*id).map(|n| n.kind == NodeKind::Camera) == Some(true))
            .count();
        assert_eq!(cameras, 1);
        assert!(scene.model_root().is_none());
        assert_eq!(
            scene.node(scene.light_node()).map(|n| &n.kind),
            Some(&NodeKind::DirectionalLight)
        );
    }

    #[test]
    fn add_model_builds_subtree_in_order() {
        let mut scene = Scene::new();
        let model = model_with_meshes(&["Cube", "Cube_1", "Plane"]);
        let root = scene.add_model(&model, &[]).unwrap();
        let names: Vec<_> = scene
            .descendants(root)
            .into_iter()
            .map(|id| scene.node(id).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["test.glb", "Cube", "Cube_1", "Plane"]);
        assert_eq!(scene.model_root(), Some(root));
    }

    #[test]
    fn second_model_is_rejected() {
        let mut scene = Scene::new();
        let model = model_with_meshes(&["Cube"]);
        scene.add_model(&model, &[]).unwrap();
        assert!(matches!(
            scene.add_model(&model, &[]),
            Err(SceneError::ModelAlreadyLoaded(_))
        ));
    }

    #[test]
    fn dangling_child_index_is_rejected() {
        let mut scene = Scene::new();
        let mut model = model_with_meshes(&["Cube"]);
        model.nodes[0].children.push(9);
        assert!(matches!(
            scene.add_model(&model, &[]),
            Err(SceneError::MissingModelNode { index: 9, .. })
        ));
        assert!(scene.model_root().is_none());
    }

    #[test]
    fn cyclic_or_shared_children_are_rejected() {
        let mut scene = Scene::new();
        let mut model = model_with_meshes(&["Loop"]);
        model.nodes[0].children.push(0);
        assert!(matches!(
            scene.add_model(&model, &[]),
            Err(SceneError::RevisitedModelNode { index: 0, .. })
        ));

        let mut model = model_with_meshes(&["Left", "Right", "Shared"]);
        model.roots = vec![0, 1];
        model.nodes[0].children.push(2);
        model.nodes[1].children.push(2);
        assert!(matches!(
            scene.add_model(&model, &[]),
            Err(SceneError::RevisitedModelNode { index: 2, .. })
        ));
        assert!(scene.model_root().is_none());
        assert_eq!(scene.node_count(), Scene::new().node_count());
    }

    #[test]
    fn shadow_flags_are_ignored_on_non_mesh_nodes() {
        let mut scene = Scene::new();
        let camera = scene.camera_node();
        scene.node_mut(camera).unwrap().set_shadows(true, true);
        let node = scene.node(camera).unwrap();
        assert!(!node.casts_shadow);
        assert!(!node.receives_shadow);
    }

    #[test]
    fn subtree_bounds_follow_child_transforms() {
        let mut scene = Scene::new();
        let model = ModelAsset {
            name: "nested".to_string(),
            roots: vec![0],
            nodes: vec![
                ModelNode {
                    name: "Group".to_string(),
                    transform: Transform::from_position(Vec3::new(2.0, 0.0, 0.0)),
                    mesh: None,
                    children: vec![1],
                },
                ModelNode {
                    name: "Cube".to_string(),
                    transform: Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
                    mesh: Some(ModelMesh {
                        name: "Cube".to_string(),
                        bounds: Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
                        primitive_count: 1,
                        material: None,
                    }),
                    children: Vec::new(),
                },
            ],
            materials: Vec::new(),
        };
        let root = scene.add_model(&model, &[]).unwrap();
        let bounds = scene.subtree_bounds(root);
        assert!((bounds.center() - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-6);
        assert!((bounds.extent() - Vec3::ONE).length() < 1e-6);
    }

    #[test]
    fn world_matrices_include_scene_rotation() {
        let mut scene = Scene::new();
        let light = scene.light_node();
        scene.node_mut(light).unwrap().transform.position = Vec3::new(1.0, 0.0, 0.0);
        scene.transform.rotation.y = std::f32::consts::FRAC_PI_2;
        let worlds = scene.world_matrices();
        let p = worlds[light.index()].transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn empty_bounds_have_zero_center() {
        let bounds = Aabb::EMPTY;
        assert!(bounds.is_empty());
        assert_eq!(bounds.center(), Vec3::ZERO);
        assert!(bounds.transformed(&Mat4::IDENTITY).is_empty());
    }
}
