//! Assembly hierarchy stored as an arena of nodes.
//!
//! Nodes refer to their parent by [`NodeIndex`] rather than by reference, so
//! the tree has no ownership cycles. Everything is validated once in
//! [`SceneGraph::from_model`]; a graph that exists is acyclic and fully
//! resolved, so queries only ever fail on unknown ids.

use std::collections::HashMap;

use glam::Mat4;

use crate::error::{ExplodeViewError, Result};
use crate::model::{ExplodeSpec, Model, Part};
use crate::transform::Transform;

/// Index of a node in the scene graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

/// A node placed in the assembly tree.
#[derive(Debug, Clone)]
pub struct SceneNode {
    id: String,
    part: usize,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    assembled: Transform,
    explode: ExplodeSpec,
}

impl SceneNode {
    /// The node id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The parent node, if any.
    #[must_use]
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Direct children in document order.
    #[must_use]
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Pose relative to the parent when fully assembled.
    #[must_use]
    pub fn assembled(&self) -> &Transform {
        &self.assembled
    }

    /// Explode parameters in the parent's local frame.
    #[must_use]
    pub fn explode(&self) -> &ExplodeSpec {
        &self.explode
    }
}

/// The static assembly hierarchy of one model.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    parts: Vec<Part>,
    index: HashMap<String, NodeIndex>,
    roots: Vec<NodeIndex>,
    /// Parents always appear before their children.
    order: Vec<NodeIndex>,
}

// DFS colouring for cycle detection.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

impl SceneGraph {
    /// Builds and validates a scene graph from a model document.
    ///
    /// The whole model is rejected if any node id or part id is duplicated,
    /// any reference does not resolve, any transform is non-finite, or the
    /// parent references contain a cycle.
    pub fn from_model(model: &Model) -> Result<Self> {
        let mut part_index = HashMap::with_capacity(model.parts.len());
        for (i, part) in model.parts.iter().enumerate() {
            if part_index.insert(part.part_id.as_str(), i).is_some() {
                return Err(ExplodeViewError::DuplicatePart(part.part_id.clone()));
            }
        }

        let mut index = HashMap::with_capacity(model.nodes.len());
        for (i, node) in model.nodes.iter().enumerate() {
            if index.insert(node.node_id.clone(), NodeIndex(i)).is_some() {
                return Err(ExplodeViewError::DuplicateNode(node.node_id.clone()));
            }
        }

        let mut nodes = Vec::with_capacity(model.nodes.len());
        for node in &model.nodes {
            let part = *part_index.get(node.part_id.as_str()).ok_or_else(|| {
                ExplodeViewError::UnknownPart {
                    node: node.node_id.clone(),
                    part: node.part_id.clone(),
                }
            })?;
            let parent = match &node.parent_node_id {
                Some(parent_id) => Some(*index.get(parent_id).ok_or_else(|| {
                    ExplodeViewError::UnknownParent {
                        node: node.node_id.clone(),
                        parent: parent_id.clone(),
                    }
                })?),
                None => None,
            };
            let mut assembled = node.assembled.to_transform();
            if !assembled.is_finite() {
                return Err(ExplodeViewError::InvalidTransform {
                    node: node.node_id.clone(),
                    reason: "assembled pose is not finite".to_string(),
                });
            }
            // Documents may carry non-unit quaternions; composition assumes unit length.
            assembled.rotation = assembled.rotation.normalize();
            let explode = validated_explode(&node.node_id, &node.explode)?;
            nodes.push(SceneNode {
                id: node.node_id.clone(),
                part,
                parent,
                children: Vec::new(),
                assembled,
                explode,
            });
        }

        let order = parents_first_order(&nodes)?;

        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            match nodes[i].parent {
                Some(parent) => nodes[parent.0].children.push(NodeIndex(i)),
                None => roots.push(NodeIndex(i)),
            }
        }

        log::debug!(
            "scene graph for '{}': {} nodes, {} roots",
            model.model_id,
            nodes.len(),
            roots.len()
        );

        Ok(Self {
            nodes,
            parts: model.parts.clone(),
            index,
            roots,
            order,
        })
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolves a node id to its arena index.
    pub fn lookup(&self, node_id: &str) -> Result<NodeIndex> {
        self.index
            .get(node_id)
            .copied()
            .ok_or_else(|| ExplodeViewError::NodeNotFound(node_id.to_string()))
    }

    /// Returns whether a node with this id exists.
    #[must_use]
    pub fn contains(&self, node_id: &str) -> bool {
        self.index.contains_key(node_id)
    }

    /// Returns the node with this id.
    pub fn node(&self, node_id: &str) -> Result<&SceneNode> {
        Ok(self.get(self.lookup(node_id)?))
    }

    /// Returns the node at an arena index.
    ///
    /// Indices handed out by this graph are always valid.
    #[must_use]
    pub fn get(&self, index: NodeIndex) -> &SceneNode {
        &self.nodes[index.0]
    }

    /// Iterates over all nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeIndex(i), n))
    }

    /// Root nodes in document order.
    #[must_use]
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// Node indices ordered so that every parent precedes its children.
    #[must_use]
    pub fn traversal_order(&self) -> &[NodeIndex] {
        &self.order
    }

    /// Direct children of a node, in document order.
    pub fn children(&self, node_id: &str) -> Result<&[NodeIndex]> {
        Ok(self.node(node_id)?.children())
    }

    /// Ids of the direct children of a node, in document order.
    pub fn child_ids(&self, node_id: &str) -> Result<impl Iterator<Item = &str>> {
        Ok(self
            .children(node_id)?
            .iter()
            .map(move |c| self.get(*c).id()))
    }

    /// Ancestors of a node, nearest first.
    pub fn ancestors(&self, node_id: &str) -> Result<Vec<NodeIndex>> {
        let mut out = Vec::new();
        let mut current = self.node(node_id)?.parent;
        while let Some(parent) = current {
            out.push(parent);
            current = self.get(parent).parent;
        }
        Ok(out)
    }

    /// All descendants of a node in depth-first pre-order.
    pub fn descendants(&self, node_id: &str) -> Result<Vec<NodeIndex>> {
        let start = self.lookup(node_id)?;
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.get(start).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.get(next).children.iter().rev().copied());
        }
        Ok(out)
    }

    /// The part a node instantiates.
    pub fn part_of(&self, node_id: &str) -> Result<&Part> {
        Ok(self.node_part(self.lookup(node_id)?))
    }

    /// The part a node instantiates, by arena index.
    #[must_use]
    pub fn node_part(&self, index: NodeIndex) -> &Part {
        &self.parts[self.nodes[index.0].part]
    }

    /// The part catalog of this model.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Looks up a part by id.
    pub fn part(&self, part_id: &str) -> Result<&Part> {
        self.parts
            .iter()
            .find(|p| p.part_id == part_id)
            .ok_or_else(|| ExplodeViewError::PartNotFound(part_id.to_string()))
    }

    /// Assembled local transforms of every node, by arena index.
    #[must_use]
    pub fn assembled_locals(&self) -> Vec<Transform> {
        self.nodes.iter().map(|n| n.assembled).collect()
    }

    /// World-space assembled pose of a node, composed root to leaf.
    pub fn world_transform(&self, node_id: &str) -> Result<Transform> {
        let index = self.lookup(node_id)?;
        Ok(self.world_of(index, |i| self.nodes[i.0].assembled))
    }

    /// World-space assembled pose of a node as a matrix.
    pub fn world_matrix(&self, node_id: &str) -> Result<Mat4> {
        let index = self.lookup(node_id)?;
        let mut matrix = self.nodes[index.0].assembled.to_matrix();
        let mut current = self.nodes[index.0].parent;
        while let Some(parent) = current {
            matrix = self.nodes[parent.0].assembled.to_matrix() * matrix;
            current = self.nodes[parent.0].parent;
        }
        Ok(matrix)
    }

    /// World pose of one node given per-node local transforms.
    ///
    /// `locals` is indexed by arena index. Nodes it does not cover use their
    /// assembled local transform.
    #[must_use]
    pub fn world_in(&self, index: NodeIndex, locals: &[Transform]) -> Transform {
        self.world_of(index, |i| self.local_or_assembled(locals, i))
    }

    /// World pose of one node, computing each ancestor's local transform on demand.
    #[must_use]
    pub fn world_with(
        &self,
        index: NodeIndex,
        local: impl Fn(&SceneNode) -> Transform,
    ) -> Transform {
        self.world_of(index, |i| local(&self.nodes[i.0]))
    }

    /// Composes per-node local transforms into world poses in one pass.
    ///
    /// `locals` is indexed by arena index. Nodes it does not cover use their
    /// assembled local transform.
    #[must_use]
    pub fn compose_world(&self, locals: &[Transform]) -> Vec<Transform> {
        let mut world = vec![Transform::IDENTITY; self.nodes.len()];
        for &i in &self.order {
            let local = self.local_or_assembled(locals, i);
            world[i.0] = match self.nodes[i.0].parent {
                Some(parent) => world[parent.0].compose(&local),
                None => local,
            };
        }
        world
    }

    fn local_or_assembled(&self, locals: &[Transform], index: NodeIndex) -> Transform {
        locals
            .get(index.0)
            .copied()
            .unwrap_or(self.nodes[index.0].assembled)
    }

    fn world_of(&self, index: NodeIndex, local: impl Fn(NodeIndex) -> Transform) -> Transform {
        let mut chain = vec![index];
        let mut current = self.nodes[index.0].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes[parent.0].parent;
        }
        let mut iter = chain.into_iter().rev();
        let first = iter.next().map_or(Transform::IDENTITY, &local);
        iter.fold(first, |acc, i| acc.compose(&local(i)))
    }
}

/// Checks every explode field for finiteness and normalizes the rotation override.
fn validated_explode(node_id: &str, spec: &ExplodeSpec) -> Result<ExplodeSpec> {
    let invalid = |reason: &str| ExplodeViewError::InvalidTransform {
        node: node_id.to_string(),
        reason: reason.to_string(),
    };
    if !spec.dir.is_finite() || !spec.distance.is_finite() {
        return Err(invalid("explode vector is not finite"));
    }
    if spec.start.is_some_and(|v| !v.is_finite()) || spec.duration.is_some_and(|v| !v.is_finite())
    {
        return Err(invalid("explode staging is not finite"));
    }
    if spec.scale.is_some_and(|s| !s.is_finite()) {
        return Err(invalid("explode scale is not finite"));
    }
    let mut spec = *spec;
    if let Some(rotation) = spec.quat {
        if !rotation.is_finite() || !(rotation.length_squared() > 0.0) {
            return Err(invalid("explode rotation is not a finite non-zero quaternion"));
        }
        spec.quat = Some(rotation.normalize());
    }
    Ok(spec)
}

/// Orders nodes parents-first, rejecting parent cycles.
fn parents_first_order(nodes: &[SceneNode]) -> Result<Vec<NodeIndex>> {
    let mut state = vec![Visit::Unvisited; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    let mut path = Vec::new();

    for start in 0..nodes.len() {
        if state[start] != Visit::Unvisited {
            continue;
        }
        // Walk up until we hit a finished node, a root, or our own path.
        let mut current = Some(start);
        while let Some(i) = current {
            match state[i] {
                Visit::Done => break,
                Visit::InProgress => {
                    return Err(ExplodeViewError::CyclicHierarchy(nodes[i].id.clone()));
                }
                Visit::Unvisited => {
                    state[i] = Visit::InProgress;
                    path.push(i);
                    current = nodes[i].parent.map(|p| p.0);
                }
            }
        }
        // Unwind: the topmost node on the path goes first.
        while let Some(i) = path.pop() {
            state[i] = Visit::Done;
            order.push(NodeIndex(i));
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssembledPose, Node};
    use glam::{Quat, Vec3};

    fn part(id: &str) -> Part {
        Part {
            part_id: id.to_string(),
            display_name_ko: id.to_string(),
            glb_url: format!("/m/{id}.glb"),
            summary: String::new(),
            material_type: None,
        }
    }

    fn node(id: &str, parent: Option<&str>, pos: Vec3) -> Node {
        Node {
            node_id: id.to_string(),
            part_id: "p".to_string(),
            parent_node_id: parent.map(str::to_string),
            assembled: AssembledPose {
                pos,
                ..AssembledPose::default()
            },
            explode: ExplodeSpec::default(),
        }
    }

    fn model(nodes: Vec<Node>) -> Model {
        Model {
            model_id: "m".to_string(),
            title: "m".to_string(),
            thumbnail_url: String::new(),
            overview: String::new(),
            theory: String::new(),
            parts: vec![part("p")],
            nodes,
        }
    }

    #[test]
    fn test_world_transform_composes_chain() {
        let graph = SceneGraph::from_model(&model(vec![
            node("root", None, Vec3::new(1.0, 0.0, 0.0)),
            node("a", Some("root"), Vec3::new(0.0, 2.0, 0.0)),
            node("b", Some("a"), Vec3::new(0.0, 0.0, 3.0)),
        ]))
        .unwrap();

        let world = graph.world_transform("b").unwrap();
        assert_eq!(world.translation, Vec3::new(1.0, 2.0, 3.0));

        let matrix = graph.world_matrix("b").unwrap();
        assert!((matrix.transform_point3(Vec3::ZERO) - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn test_world_transform_respects_parent_rotation() {
        let mut root = node("root", None, Vec3::ZERO);
        root.assembled.quat = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let graph = SceneGraph::from_model(&model(vec![
            root,
            node("child", Some("root"), Vec3::X),
        ]))
        .unwrap();
        let world = graph.world_transform("child").unwrap();
        assert!((world.translation - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_unknown_node() {
        let graph = SceneGraph::from_model(&model(vec![node("root", None, Vec3::ZERO)])).unwrap();
        assert!(matches!(
            graph.world_transform("ghost"),
            Err(ExplodeViewError::NodeNotFound(id)) if id == "ghost"
        ));
        assert!(graph.children("ghost").is_err());
    }

    #[test]
    fn test_children_in_document_order() {
        let graph = SceneGraph::from_model(&model(vec![
            node("c2", Some("root"), Vec3::ZERO),
            node("root", None, Vec3::ZERO),
            node("c1", Some("root"), Vec3::ZERO),
            node("c3", Some("root"), Vec3::ZERO),
        ]))
        .unwrap();
        let ids: Vec<&str> = graph.child_ids("root").unwrap().collect();
        assert_eq!(ids, vec!["c2", "c1", "c3"]);
        assert_eq!(graph.roots().len(), 1);
    }

    #[test]
    fn test_traversal_order_parents_first() {
        let graph = SceneGraph::from_model(&model(vec![
            node("leaf", Some("mid"), Vec3::ZERO),
            node("mid", Some("root"), Vec3::ZERO),
            node("root", None, Vec3::ZERO),
        ]))
        .unwrap();
        let pos = |id: &str| {
            let idx = graph.lookup(id).unwrap();
            graph
                .traversal_order()
                .iter()
                .position(|i| *i == idx)
                .unwrap()
        };
        assert!(pos("root") < pos("mid"));
        assert!(pos("mid") < pos("leaf"));
    }

    #[test]
    fn test_cycle_rejected() {
        let result = SceneGraph::from_model(&model(vec![
            node("root", None, Vec3::ZERO),
            node("a", Some("c"), Vec3::ZERO),
            node("b", Some("a"), Vec3::ZERO),
            node("c", Some("b"), Vec3::ZERO),
        ]));
        assert!(matches!(result, Err(ExplodeViewError::CyclicHierarchy(_))));
    }

    #[test]
    fn test_self_parent_rejected() {
        let result = SceneGraph::from_model(&model(vec![node("a", Some("a"), Vec3::ZERO)]));
        assert!(matches!(result, Err(ExplodeViewError::CyclicHierarchy(id)) if id == "a"));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let result = SceneGraph::from_model(&model(vec![node("a", Some("nope"), Vec3::ZERO)]));
        assert!(matches!(result, Err(ExplodeViewError::UnknownParent { .. })));
    }

    #[test]
    fn test_unknown_part_rejected() {
        let mut n = node("a", None, Vec3::ZERO);
        n.part_id = "missing".to_string();
        let result = SceneGraph::from_model(&model(vec![n]));
        assert!(matches!(result, Err(ExplodeViewError::UnknownPart { .. })));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let result = SceneGraph::from_model(&model(vec![
            node("a", None, Vec3::ZERO),
            node("a", None, Vec3::ZERO),
        ]));
        assert!(matches!(result, Err(ExplodeViewError::DuplicateNode(_))));
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = SceneGraph::from_model(&model(vec![node(
            "a",
            None,
            Vec3::new(f32::INFINITY, 0.0, 0.0),
        )]));
        assert!(matches!(result, Err(ExplodeViewError::InvalidTransform { .. })));
    }

    #[test]
    fn test_non_finite_explode_fields_rejected() {
        let build = |edit: fn(&mut ExplodeSpec)| {
            let mut n = node("a", None, Vec3::ZERO);
            n.explode = ExplodeSpec::along(Vec3::X, 1.0);
            edit(&mut n.explode);
            SceneGraph::from_model(&model(vec![n]))
        };
        let cases: [fn(&mut ExplodeSpec); 5] = [
            |e| e.start = Some(f32::INFINITY),
            |e| e.duration = Some(f32::NAN),
            |e| e.scale = Some(Vec3::new(1.0, f32::INFINITY, 1.0)),
            |e| e.quat = Some(Quat::from_xyzw(0.0, f32::INFINITY, 0.0, 1.0)),
            |e| e.quat = Some(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)),
        ];
        for edit in cases {
            assert!(matches!(
                build(edit),
                Err(ExplodeViewError::InvalidTransform { .. })
            ));
        }
    }

    #[test]
    fn test_overflowing_json_value_rejected() {
        let doc = r#"{
            "modelId": "m", "title": "m",
            "parts": [{ "partId": "p", "displayNameKo": "p", "glbUrl": "/p.glb" }],
            "nodes": [{ "nodeId": "a", "partId": "p", "parentNodeId": null,
                        "explode": { "dir": [1, 0, 0], "distance": 1, "scale": [1e40, 1, 1] } }]
        }"#;
        let model = Model::from_json_str(doc).unwrap();
        assert!(SceneGraph::from_model(&model).is_err());
    }

    #[test]
    fn test_non_unit_quaternions_normalized() {
        let mut root = node("root", None, Vec3::ZERO);
        root.assembled.quat = Quat::from_xyzw(0.0, 0.0, 0.0, 2.0);
        let mut child = node("child", Some("root"), Vec3::new(1.0, 0.0, 0.0));
        child.explode.quat = Some(Quat::from_xyzw(0.0, 0.0, 3.0, 3.0));
        let graph = SceneGraph::from_model(&model(vec![root, child])).unwrap();

        let world = graph.world_transform("child").unwrap();
        assert!((world.translation - Vec3::X).length() < 1e-6);
        assert!((graph.node("root").unwrap().assembled().rotation.length() - 1.0).abs() < 1e-6);
        let override_rotation = graph.node("child").unwrap().explode().quat.unwrap();
        assert!((override_rotation.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_locals_fall_back_to_assembled() {
        let graph = SceneGraph::from_model(&model(vec![
            node("root", None, Vec3::new(0.0, 2.0, 0.0)),
            node("a", Some("root"), Vec3::new(1.0, 0.0, 0.0)),
        ]))
        .unwrap();
        let a = graph.lookup("a").unwrap();
        let expected = graph.world_transform("a").unwrap();
        assert_eq!(graph.world_in(a, &[]), expected);
        assert_eq!(graph.compose_world(&[])[a.0], expected);
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let graph = SceneGraph::from_model(&model(vec![
            node("root", None, Vec3::ZERO),
            node("a", Some("root"), Vec3::ZERO),
            node("b", Some("a"), Vec3::ZERO),
            node("c", Some("root"), Vec3::ZERO),
        ]))
        .unwrap();
        let ancestors: Vec<&str> = graph
            .ancestors("b")
            .unwrap()
            .into_iter()
            .map(|i| graph.get(i).id())
            .collect();
        assert_eq!(ancestors, vec!["a", "root"]);

        let descendants: Vec<&str> = graph
            .descendants("root")
            .unwrap()
            .into_iter()
            .map(|i| graph.get(i).id())
            .collect();
        assert_eq!(descendants, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_compose_world_matches_single_queries() {
        let graph = SceneGraph::from_model(&model(vec![
            node("root", None, Vec3::new(1.0, 1.0, 1.0)),
            node("a", Some("root"), Vec3::new(2.0, 0.0, 0.0)),
            node("b", Some("a"), Vec3::new(0.0, 0.0, -1.0)),
        ]))
        .unwrap();
        let world = graph.compose_world(&graph.assembled_locals());
        for (i, n) in graph.nodes() {
            let single = graph.world_transform(n.id()).unwrap();
            assert!(world[i.0].distance(&single) < 1e-6);
        }
    }

    #[test]
    fn test_part_of() {
        let graph = SceneGraph::from_model(&model(vec![node("a", None, Vec3::ZERO)])).unwrap();
        assert_eq!(graph.part_of("a").unwrap().part_id, "p");
        assert!(matches!(
            graph.part("zzz"),
            Err(ExplodeViewError::PartNotFound(_))
        ));
    }
}
