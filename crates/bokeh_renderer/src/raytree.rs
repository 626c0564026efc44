//! Debug tree of the rays spawned for one traced pixel.
//!
//! Arena storage: nodes live in one vector and children are index
//! lists, so the tree moves freely and clearing is a truncate. Node 0
//! is a pseudo-root that carries no ray.

use bokeh_math::{Ray, Vec3, Vec4};

use crate::rayhit::RayHit;

/// How far a missing ray's debug line extends.
const MISS_LINE_LENGTH: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct RayTreeNode {
    /// Absent only on the pseudo-root.
    ray: Option<(Ray, f32)>,
    color: Vec3,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct RayTree {
    nodes: Vec<RayTreeNode>,
}

impl Default for RayTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RayTree {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![RayTreeNode {
                ray: None,
                color: Vec3::ZERO,
                children: Vec::new(),
            }],
        }
    }

    /// Drop every node except the pseudo-root.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Record a traced ray under `parent`, returning the new node.
    pub fn add_child(&mut self, parent: NodeId, hit: &RayHit, color: Vec3) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RayTreeNode {
            ray: Some((*hit.ray(), hit.t())),
            color,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn color(&self, node: NodeId) -> Vec3 {
        self.nodes[node.0].color
    }

    pub fn ray(&self, node: NodeId) -> Option<&Ray> {
        self.nodes[node.0].ray.as_ref().map(|(ray, _)| ray)
    }

    /// Line segments for the preview's line visualizer: one per traced
    /// ray, fading out at the far end when the ray missed.
    pub fn lines(&self) -> Vec<(Vec3, Vec3, Vec4, Vec4)> {
        self.nodes[1..]
            .iter()
            .filter_map(|node| {
                let (ray, t) = node.ray.as_ref()?;
                let start_color = node.color.extend(1.0);
                let (end, end_color) = if t.is_nan() {
                    (ray.point_at(MISS_LINE_LENGTH), node.color.extend(0.0))
                } else {
                    (ray.point_at(*t), start_color)
                };
                Some((ray.origin(), end, start_color, end_color))
            })
            .collect()
    }
}
