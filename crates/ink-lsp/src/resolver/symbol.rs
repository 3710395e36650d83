//
// resolver/symbol.rs
//
// Finding the syntax node under the cursor
//

use std::sync::Arc;

use tower_lsp::lsp_types::{Position, Url};

use crate::file_handler::SourceFileResolver;
use crate::position::metadata_contains;
use crate::syntax::{DebugMetadata, Identifier, NodeId, NodeKind, SyntaxTree};

/// What the cursor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located<'t> {
    Node(NodeId),
    /// A declaring name: choice or gather label, flow name or argument,
    /// external function name.
    Identifier(&'t Identifier),
}

/// Depth-first search for the most specific node covering a position.
pub struct SymbolLocator {
    files: Arc<dyn SourceFileResolver>,
}

struct Target<'a> {
    document: &'a Url,
    position: Position,
}

impl SymbolLocator {
    pub fn new(files: Arc<dyn SourceFileResolver>) -> Self {
        Self { files }
    }

    /// Symbol at `position` in `document`, or `None` when nothing there
    /// means anything.
    pub fn locate<'t>(
        &self,
        tree: &'t SyntaxTree,
        document: &Url,
        position: Position,
    ) -> Option<Located<'t>> {
        let target = Target { document, position };
        self.symbol_at(tree, tree.root(), &target)
    }

    fn symbol_at<'t>(
        &self,
        tree: &'t SyntaxTree,
        id: NodeId,
        target: &Target<'_>,
    ) -> Option<Located<'t>> {
        let node = tree.node(id);

        match &node.kind {
            NodeKind::Choice(choice) => {
                if let Some(label) = self.matching_identifier(choice.identifier.as_ref(), target) {
                    return Some(label);
                }
                // The condition is a dead end: no fallback to other children.
                if let Some(condition) = choice.condition {
                    if self.node_matches(tree, condition, target) {
                        return self.symbol_at(tree, condition, target);
                    }
                }
            }
            NodeKind::Gather(gather) => {
                if let Some(label) = self.matching_identifier(gather.identifier.as_ref(), target) {
                    return Some(label);
                }
            }
            NodeKind::ExternalDeclaration(declaration) => {
                if let Some(name) = self.matching_identifier(Some(&declaration.identifier), target) {
                    return Some(name);
                }
            }
            NodeKind::FunctionCall(call) => {
                for &argument in &call.arguments {
                    if self.node_matches(tree, argument, target) {
                        if let Some(found) = self.symbol_at(tree, argument, target) {
                            return Some(found);
                        }
                    }
                }
            }
            _ => {}
        }

        if node.children.is_empty() {
            let is_weave = matches!(node.kind, NodeKind::Weave);
            return (!is_weave && self.node_matches(tree, id, target)).then_some(Located::Node(id));
        }

        for &child in &node.children {
            let child_node = tree.node(child);
            let drill = matches!(child_node.kind, NodeKind::Weave)
                || child_node.debug_metadata.is_none()
                || self.node_matches(tree, child, target);
            if drill {
                if let Some(found) = self.symbol_at(tree, child, target) {
                    return Some(found);
                }
            }
        }

        if node.kind.is_terminal_token() {
            return Some(Located::Node(id));
        }

        if let NodeKind::Flow(flow) = &node.kind {
            if let Some(argument) = flow
                .arguments
                .iter()
                .find_map(|argument| self.matching_identifier(Some(argument), target))
            {
                return Some(argument);
            }
            return self.matching_identifier(flow.identifier.as_ref(), target);
        }

        None
    }

    fn node_matches(&self, tree: &SyntaxTree, id: NodeId, target: &Target<'_>) -> bool {
        tree.node(id)
            .debug_metadata
            .as_ref()
            .is_some_and(|metadata| self.metadata_matches(metadata, target))
    }

    fn matching_identifier<'t>(
        &self,
        identifier: Option<&'t Identifier>,
        target: &Target<'_>,
    ) -> Option<Located<'t>> {
        let identifier = identifier?;
        let metadata = identifier.debug_metadata.as_ref()?;
        self.metadata_matches(metadata, target)
            .then_some(Located::Identifier(identifier))
    }

    fn metadata_matches(&self, metadata: &DebugMetadata, target: &Target<'_>) -> bool {
        metadata_contains(metadata, target.position) && self.is_in_document(metadata, target.document)
    }

    fn is_in_document(&self, metadata: &DebugMetadata, document: &Url) -> bool {
        metadata
            .file_name
            .as_deref()
            .and_then(|name| self.files.resolve_source_uri(name))
            .is_some_and(|uri| &uri == document)
    }
}
