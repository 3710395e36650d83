//
// syntax/builder.rs
//
// Incremental construction of a SyntaxTree
//

use super::tree::{DebugMetadata, Flow, FlowLevel, Node, NodeId, NodeKind, SyntaxTree, TreeError};

/// Appends nodes in document order and links them to their parents.
///
/// Used by compilers that build the tree in-process and by fixtures.
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new(root: NodeKind, debug_metadata: Option<DebugMetadata>) -> Self {
        Self {
            nodes: vec![Node::new(root, debug_metadata)],
        }
    }

    /// Builder whose root is the top-level story flow.
    pub fn story() -> Self {
        Self::new(NodeKind::Flow(Flow::new(FlowLevel::Story, None)), None)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        debug_metadata: Option<DebugMetadata>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind, debug_metadata));
        if let Some(parent) = self.nodes.get_mut(parent.index()) {
            parent.children.push(id);
        }
        id
    }

    /// Add a call argument: a child of `call` that is also listed in its
    /// argument vector.
    pub fn add_argument(
        &mut self,
        call: NodeId,
        kind: NodeKind,
        debug_metadata: Option<DebugMetadata>,
    ) -> NodeId {
        let id = self.add(call, kind, debug_metadata);
        if let Some(NodeKind::FunctionCall(function_call)) =
            self.nodes.get_mut(call.index()).map(|n| &mut n.kind)
        {
            function_call.arguments.push(id);
        }
        id
    }

    /// Add the guard expression of a choice.
    pub fn add_condition(
        &mut self,
        choice: NodeId,
        kind: NodeKind,
        debug_metadata: Option<DebugMetadata>,
    ) -> NodeId {
        let id = self.add(choice, kind, debug_metadata);
        if let Some(NodeKind::Choice(node)) = self.nodes.get_mut(choice.index()).map(|n| &mut n.kind) {
            node.condition = Some(id);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn finish(self) -> Result<SyntaxTree, TreeError> {
        SyntaxTree::from_nodes(NodeId(0), self.nodes)
    }
}
