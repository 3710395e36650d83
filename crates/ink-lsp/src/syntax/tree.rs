//
// syntax/tree.rs
//
// Arena representation of a parsed ink story
//

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index of a node inside a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source span attached to a node by the compiler.
///
/// Lines and columns are one-based, exactly as the compiler reports them.
/// Conversion to zero-based LSP positions happens at the edges
/// (see [`crate::position`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugMetadata {
    #[serde(default)]
    pub file_name: Option<String>,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl DebugMetadata {
    pub fn new(
        file_name: impl Into<String>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file_name: Some(file_name.into()),
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub name: String,
    #[serde(default)]
    pub debug_metadata: Option<DebugMetadata>,
}

impl Identifier {
    pub fn new(name: impl Into<String>, debug_metadata: Option<DebugMetadata>) -> Self {
        Self {
            name: name.into(),
            debug_metadata,
        }
    }
}

/// Nesting level of named content. `WeavePoint` is only used when
/// resolving paths; flows themselves are `Story`, `Knot` or `Stitch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowLevel {
    Story,
    Knot,
    Stitch,
    WeavePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub level: FlowLevel,
    #[serde(default)]
    pub identifier: Option<Identifier>,
    #[serde(default)]
    pub arguments: Vec<Identifier>,
    #[serde(default)]
    pub is_function: bool,
    /// Variables declared in this flow, populated when the tree is indexed.
    #[serde(skip)]
    variable_declarations: IndexMap<String, NodeId>,
}

impl Flow {
    pub fn new(level: FlowLevel, identifier: Option<Identifier>) -> Self {
        Self {
            level,
            identifier,
            arguments: Vec::new(),
            is_function: false,
            variable_declarations: IndexMap::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<Identifier>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn function(mut self) -> Self {
        self.is_function = true;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.identifier.as_ref().map(|i| i.name.as_str())
    }

    /// Declaration node for a variable declared directly in this flow.
    pub fn variable_declaration(&self, name: &str) -> Option<NodeId> {
        self.variable_declarations.get(name).copied()
    }

    pub fn argument(&self, name: &str) -> Option<&Identifier> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

bitflags! {
    /// Behaviour flags of a `{a|b|c}` sequence.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SequenceFlags: u8 {
        const STOPPING = 1;
        const CYCLE = 2;
        const SHUFFLE = 4;
        const ONCE = 8;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    #[serde(default)]
    pub identifier: Option<Identifier>,
    #[serde(default)]
    pub condition: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gather {
    #[serde(default)]
    pub identifier: Option<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Divert {
    /// Target path components; empty for tunnel returns and `-> DONE`-like
    /// diverts the compiler leaves unresolved.
    #[serde(default)]
    pub target: Vec<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    pub name: Identifier,
    #[serde(default)]
    pub arguments: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableReference {
    pub path: Vec<Identifier>,
    #[serde(default)]
    pub is_constant_reference: bool,
    #[serde(default)]
    pub is_list_item_reference: bool,
}

impl VariableReference {
    /// Dotted name as written in source.
    pub fn name(&self) -> String {
        self.path
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableAssignment {
    pub identifier: Identifier,
    #[serde(default)]
    pub is_declaration: bool,
    #[serde(default)]
    pub is_global: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedDeclaration {
    pub identifier: Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncDecExpression {
    pub identifier: Identifier,
    #[serde(default)]
    pub is_increment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLiteral {
    #[serde(default)]
    pub items: Vec<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDeclaration {
    pub identifier: Identifier,
    #[serde(default)]
    pub argument_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub flags: SequenceFlags,
}

/// Closed set of node variants the language features care about.
/// Everything else the compiler emits collapses into `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeKind {
    Flow(Flow),
    Weave,
    Choice(Choice),
    Gather(Gather),
    Divert(Divert),
    FunctionCall(FunctionCall),
    VariableReference(VariableReference),
    VariableAssignment(VariableAssignment),
    ConstantDeclaration(NamedDeclaration),
    IncDecExpression(IncDecExpression),
    UnaryExpression,
    List(ListLiteral),
    ListDefinition(NamedDeclaration),
    ListElementDefinition(NamedDeclaration),
    ExternalDeclaration(ExternalDeclaration),
    Sequence(Sequence),
    Text { text: String },
    #[serde(other)]
    Other,
}

impl NodeKind {
    /// Nodes that answer for themselves once their children have been
    /// searched without a hit.
    pub fn is_terminal_token(&self) -> bool {
        matches!(
            self,
            NodeKind::VariableAssignment(_)
                | NodeKind::ConstantDeclaration(_)
                | NodeKind::FunctionCall(_)
                | NodeKind::IncDecExpression(_)
                | NodeKind::UnaryExpression
        )
    }

    pub fn as_flow(&self) -> Option<&Flow> {
        match self {
            NodeKind::Flow(flow) => Some(flow),
            _ => None,
        }
    }

    /// Nodes this node refers to besides its children. Each must also be
    /// one of its children.
    pub fn operands(&self) -> &[NodeId] {
        match self {
            NodeKind::Choice(choice) => choice.condition.as_slice(),
            NodeKind::FunctionCall(call) => &call.arguments,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub debug_metadata: Option<DebugMetadata>,
    #[serde(skip)]
    parent: Option<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind, debug_metadata: Option<DebugMetadata>) -> Self {
        Self {
            kind,
            children: Vec::new(),
            debug_metadata,
            parent: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("syntax tree has no nodes")]
    Empty,
    #[error("root node {0:?} is out of bounds")]
    RootOutOfBounds(NodeId),
    #[error("node {parent:?} references missing child {child:?}")]
    ChildOutOfBounds { parent: NodeId, child: NodeId },
    #[error("node {0:?} has more than one parent")]
    MultipleParents(NodeId),
    #[error("root node {0:?} is listed as a child")]
    RootIsChild(NodeId),
    #[error("node {0:?} is not reachable from the root")]
    Unreachable(NodeId),
    #[error("node {node:?} refers to {operand:?}, which is not one of its children")]
    OperandNotChild { node: NodeId, operand: NodeId },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTree {
    root: NodeId,
    nodes: Vec<Node>,
}

/// Immutable, fully indexed story tree.
///
/// Parent links and declaration tables are computed once when the tree is
/// built and never change afterwards, so a tree can be shared freely across
/// request handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTree", into = "RawTree")]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
    global_variables: IndexMap<String, NodeId>,
    constants: IndexMap<String, NodeId>,
    externals: IndexMap<String, NodeId>,
    list_definitions: IndexMap<String, NodeId>,
}

impl TryFrom<RawTree> for SyntaxTree {
    type Error = TreeError;

    fn try_from(raw: RawTree) -> Result<Self, Self::Error> {
        SyntaxTree::from_nodes(raw.root, raw.nodes)
    }
}

impl From<SyntaxTree> for RawTree {
    fn from(tree: SyntaxTree) -> Self {
        RawTree {
            root: tree.root,
            nodes: tree.nodes,
        }
    }
}

impl SyntaxTree {
    /// Validate the arena, link parents and build declaration tables.
    pub fn from_nodes(root: NodeId, mut nodes: Vec<Node>) -> Result<Self, TreeError> {
        if nodes.is_empty() {
            return Err(TreeError::Empty);
        }
        if root.index() >= nodes.len() {
            return Err(TreeError::RootOutOfBounds(root));
        }

        let mut parents: Vec<Option<NodeId>> = vec![None; nodes.len()];
        for (index, node) in nodes.iter().enumerate() {
            let parent = NodeId(index as u32);
            for &child in &node.children {
                if child.index() >= nodes.len() {
                    return Err(TreeError::ChildOutOfBounds { parent, child });
                }
                if child == root {
                    return Err(TreeError::RootIsChild(root));
                }
                if parents[child.index()].replace(parent).is_some() {
                    return Err(TreeError::MultipleParents(child));
                }
            }
            if let Some(&operand) = node
                .kind
                .operands()
                .iter()
                .find(|operand| !node.children.contains(operand))
            {
                return Err(TreeError::OperandNotChild { node: parent, operand });
            }
        }

        // Every node having at most one parent still allows detached cycles.
        let mut reached = vec![false; nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            reached[id.index()] = true;
            stack.extend(nodes[id.index()].children.iter().copied());
        }
        if let Some(index) = reached.iter().position(|r| !r) {
            return Err(TreeError::Unreachable(NodeId(index as u32)));
        }

        for (node, parent) in nodes.iter_mut().zip(parents) {
            node.parent = parent;
        }

        let mut tree = SyntaxTree {
            nodes,
            root,
            global_variables: IndexMap::new(),
            constants: IndexMap::new(),
            externals: IndexMap::new(),
            list_definitions: IndexMap::new(),
        };
        tree.index_declarations();
        Ok(tree)
    }

    fn index_declarations(&mut self) {
        let mut flow_declarations: Vec<(NodeId, String, NodeId)> = Vec::new();
        let story_flow = self.nodes[self.root.index()]
            .kind
            .as_flow()
            .map(|_| self.root);

        // Pre-order walk keeps the tables in source order.
        let mut stack = vec![(self.root, None::<NodeId>)];
        while let Some((id, enclosing_flow)) = stack.pop() {
            let node = &self.nodes[id.index()];
            let flow_for_children = match node.kind {
                NodeKind::Flow(_) => Some(id),
                _ => enclosing_flow,
            };

            match &node.kind {
                NodeKind::VariableAssignment(assignment) if assignment.is_declaration => {
                    let name = assignment.identifier.name.clone();
                    if assignment.is_global {
                        self.global_variables.entry(name.clone()).or_insert(id);
                        if let Some(story) = story_flow {
                            flow_declarations.push((story, name, id));
                        }
                    } else if let Some(flow) = enclosing_flow {
                        flow_declarations.push((flow, name, id));
                    }
                }
                NodeKind::ConstantDeclaration(decl) => {
                    self.constants
                        .entry(decl.identifier.name.clone())
                        .or_insert(id);
                }
                NodeKind::ExternalDeclaration(decl) => {
                    self.externals
                        .entry(decl.identifier.name.clone())
                        .or_insert(id);
                }
                NodeKind::ListDefinition(decl) => {
                    self.list_definitions
                        .entry(decl.identifier.name.clone())
                        .or_insert(id);
                }
                _ => {}
            }

            for &child in node.children.iter().rev() {
                stack.push((child, flow_for_children));
            }
        }

        for (flow, name, declaration) in flow_declarations {
            if let NodeKind::Flow(flow) = &mut self.nodes[flow.index()].kind {
                flow.variable_declarations.entry(name).or_insert(declaration);
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Panics if `id` did not come from this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn flow(&self, id: NodeId) -> Option<&Flow> {
        self.kind(id).as_flow()
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index as u32), node))
    }

    pub fn global_variable(&self, name: &str) -> Option<NodeId> {
        self.global_variables.get(name).copied()
    }

    pub fn constant(&self, name: &str) -> Option<NodeId> {
        self.constants.get(name).copied()
    }

    pub fn external(&self, name: &str) -> Option<NodeId> {
        self.externals.get(name).copied()
    }

    pub fn list_definition(&self, name: &str) -> Option<NodeId> {
        self.list_definitions.get(name).copied()
    }

    pub fn list_definitions(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.list_definitions
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
    }
}

impl NodeKind {
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Flow(_) => "flow",
            NodeKind::Weave => "weave",
            NodeKind::Choice(_) => "choice",
            NodeKind::Gather(_) => "gather",
            NodeKind::Divert(_) => "divert",
            NodeKind::FunctionCall(_) => "functionCall",
            NodeKind::VariableReference(_) => "variableReference",
            NodeKind::VariableAssignment(_) => "variableAssignment",
            NodeKind::ConstantDeclaration(_) => "constantDeclaration",
            NodeKind::IncDecExpression(_) => "incDecExpression",
            NodeKind::UnaryExpression => "unaryExpression",
            NodeKind::List(_) => "list",
            NodeKind::ListDefinition(_) => "listDefinition",
            NodeKind::ListElementDefinition(_) => "listElementDefinition",
            NodeKind::ExternalDeclaration(_) => "externalDeclaration",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Text { .. } => "text",
            NodeKind::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(level: FlowLevel, name: Option<&str>) -> NodeKind {
        NodeKind::Flow(Flow::new(level, name.map(|n| Identifier::new(n, None))))
    }

    fn with_children(kind: NodeKind, children: &[u32]) -> Node {
        let mut node = Node::new(kind, None);
        node.children = children.iter().map(|&c| NodeId(c)).collect();
        node
    }

    fn declaration(name: &str, is_global: bool) -> NodeKind {
        NodeKind::VariableAssignment(VariableAssignment {
            identifier: Identifier::new(name, None),
            is_declaration: true,
            is_global,
        })
    }

    #[test]
    fn test_parents_are_linked() {
        let nodes = vec![
            with_children(flow(FlowLevel::Story, None), &[1]),
            with_children(NodeKind::Weave, &[2]),
            with_children(NodeKind::Other, &[]),
        ];
        let tree = SyntaxTree::from_nodes(NodeId(0), nodes).unwrap();
        assert_eq!(tree.parent(NodeId(0)), None);
        assert_eq!(tree.parent(NodeId(1)), Some(NodeId(0)));
        assert_eq!(tree.parent(NodeId(2)), Some(NodeId(1)));
        assert_eq!(
            tree.ancestors(NodeId(2)).collect::<Vec<_>>(),
            vec![NodeId(1), NodeId(0)]
        );
    }

    #[test]
    fn test_rejects_shared_child() {
        let nodes = vec![
            with_children(flow(FlowLevel::Story, None), &[1, 2]),
            with_children(NodeKind::Weave, &[2]),
            with_children(NodeKind::Other, &[]),
        ];
        assert_eq!(
            SyntaxTree::from_nodes(NodeId(0), nodes).unwrap_err(),
            TreeError::MultipleParents(NodeId(2))
        );
    }

    #[test]
    fn test_rejects_detached_cycle() {
        let nodes = vec![
            with_children(flow(FlowLevel::Story, None), &[]),
            with_children(NodeKind::Weave, &[2]),
            with_children(NodeKind::Weave, &[1]),
        ];
        assert_eq!(
            SyntaxTree::from_nodes(NodeId(0), nodes).unwrap_err(),
            TreeError::Unreachable(NodeId(1))
        );
    }

    #[test]
    fn test_rejects_out_of_bounds_child() {
        let nodes = vec![with_children(flow(FlowLevel::Story, None), &[7])];
        assert!(matches!(
            SyntaxTree::from_nodes(NodeId(0), nodes),
            Err(TreeError::ChildOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_condition_outside_children() {
        let json = r#"{
            "root": 0,
            "nodes": [
                {"kind": {"kind": "flow", "level": "story"}, "children": [1]},
                {"kind": {"kind": "choice", "condition": 42},
                 "debugMetadata": {"fileName": "main.ink", "startLine": 1,
                    "startColumn": 1, "endLine": 1, "endColumn": 10}}
            ]
        }"#;
        let err = serde_json::from_str::<SyntaxTree>(json).unwrap_err();
        assert!(err.to_string().contains("not one of its children"), "{err}");
    }

    #[test]
    fn test_rejects_condition_pointing_at_ancestor() {
        let choice = NodeKind::Choice(Choice {
            identifier: None,
            condition: Some(NodeId(0)),
        });
        let nodes = vec![
            with_children(flow(FlowLevel::Story, None), &[1]),
            with_children(choice, &[]),
        ];
        assert_eq!(
            SyntaxTree::from_nodes(NodeId(0), nodes).unwrap_err(),
            TreeError::OperandNotChild {
                node: NodeId(1),
                operand: NodeId(0)
            }
        );
    }

    #[test]
    fn test_rejects_argument_owned_by_another_node() {
        let call = NodeKind::FunctionCall(FunctionCall {
            name: Identifier::new("RANDOM", None),
            arguments: vec![NodeId(2)],
        });
        let nodes = vec![
            with_children(flow(FlowLevel::Story, None), &[1, 2]),
            with_children(call, &[]),
            with_children(NodeKind::Other, &[]),
        ];
        assert!(matches!(
            SyntaxTree::from_nodes(NodeId(0), nodes),
            Err(TreeError::OperandNotChild { node: NodeId(1), .. })
        ));
    }

    #[test]
    fn test_accepts_operands_among_children() {
        let choice = NodeKind::Choice(Choice {
            identifier: None,
            condition: Some(NodeId(2)),
        });
        let nodes = vec![
            with_children(flow(FlowLevel::Story, None), &[1]),
            with_children(choice, &[2]),
            with_children(NodeKind::Other, &[]),
        ];
        assert!(SyntaxTree::from_nodes(NodeId(0), nodes).is_ok());
    }

    #[test]
    fn test_declarations_are_indexed_per_flow() {
        let nodes = vec![
            with_children(flow(FlowLevel::Story, None), &[1, 2]),
            with_children(declaration("health", true), &[]),
            with_children(flow(FlowLevel::Knot, Some("forest")), &[3]),
            with_children(declaration("steps", false), &[]),
        ];
        let tree = SyntaxTree::from_nodes(NodeId(0), nodes).unwrap();

        assert_eq!(tree.global_variable("health"), Some(NodeId(1)));
        assert_eq!(tree.global_variable("steps"), None);

        let story = tree.flow(NodeId(0)).unwrap();
        assert_eq!(story.variable_declaration("health"), Some(NodeId(1)));
        let knot = tree.flow(NodeId(2)).unwrap();
        assert_eq!(knot.variable_declaration("steps"), Some(NodeId(3)));
        assert_eq!(knot.variable_declaration("health"), None);
    }

    #[test]
    fn test_json_round_trip_rebuilds_indexes() {
        let nodes = vec![
            with_children(flow(FlowLevel::Story, None), &[1]),
            with_children(declaration("gold", true), &[]),
        ];
        let tree = SyntaxTree::from_nodes(NodeId(0), nodes).unwrap();
        let json = serde_json::to_string(&tree).unwrap();
        let back: SyntaxTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back.global_variable("gold"), Some(NodeId(1)));
        assert_eq!(back.parent(NodeId(1)), Some(NodeId(0)));
    }

    #[test]
    fn test_deserialize_compiler_shape() {
        let json = r#"{
            "root": 0,
            "nodes": [
                {"kind": {"kind": "flow", "level": "story"}, "children": [1]},
                {"kind": {"kind": "divert", "target": [{"name": "forest"}]},
                 "debugMetadata": {"fileName": "main.ink", "startLine": 1,
                    "startColumn": 1, "endLine": 1, "endColumn": 10}}
            ]
        }"#;
        let tree: SyntaxTree = serde_json::from_str(json).unwrap();
        match tree.kind(NodeId(1)) {
            NodeKind::Divert(divert) => assert_eq!(divert.target[0].name, "forest"),
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
