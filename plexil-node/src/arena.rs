//! The per-plan node tree, addressed the same way `plexil_expr::ExprArena`
//! addresses expressions: stable indices rather than owning pointers
//! (SPEC_FULL.md DESIGN NOTES).

use crate::node::{Node, NodeBody, NodeId};
use arcstr::ArcStr;

#[derive(Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena::default()
    }

    pub fn alloc(&mut self, node_id: impl Into<ArcStr>, parent: Option<NodeId>, body: NodeBody) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, node_id, parent, body));
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.raw() as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.raw() as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId::from_raw)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).body.children()
    }
}
