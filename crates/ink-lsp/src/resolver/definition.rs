//
// resolver/definition.rs
//
// Go-to-definition over a compiled story
//

use std::sync::Arc;

use tower_lsp::lsp_types::{Location, Position};

use super::symbol::Located;
use crate::file_handler::SourceFileResolver;
use crate::position::{identifier_contains, metadata_range};
use crate::syntax::{
    is_builtin_function, DebugMetadata, Divert, FunctionCall, Identifier, ListLiteral, NodeId, NodeKind, SyntaxTree,
    VariableReference,
};

pub struct DefinitionResolver {
    files: Arc<dyn SourceFileResolver>,
}

impl DefinitionResolver {
    pub fn new(files: Arc<dyn SourceFileResolver>) -> Self {
        Self { files }
    }

    /// Where the symbol `located` at `position` is defined.
    ///
    /// Declaring names point at themselves. Unknown functions, missing
    /// targets and spans without a file name all yield `None`.
    pub fn resolve_definition(
        &self,
        tree: &SyntaxTree,
        located: Located<'_>,
        position: Position,
    ) -> Option<Location> {
        let id = match located {
            Located::Identifier(identifier) => {
                return self.location_of(identifier.debug_metadata.as_ref())
            }
            Located::Node(id) => id,
        };

        match tree.kind(id) {
            NodeKind::Divert(divert) => self.divert_definition(tree, id, divert, position),
            NodeKind::FunctionCall(call) => self.function_definition(tree, id, call),
            NodeKind::List(list) => self.list_literal_definition(tree, list, position),
            NodeKind::ListElementDefinition(item) => {
                self.location_of(item.identifier.debug_metadata.as_ref())
            }
            NodeKind::VariableReference(reference) => {
                self.reference_definition(tree, id, reference)
            }
            NodeKind::VariableAssignment(assignment) => {
                if assignment.is_declaration {
                    return self.identifier_location(&assignment.identifier);
                }
                self.local_definition(tree, id, &assignment.identifier.name)
            }
            NodeKind::ConstantDeclaration(declaration) => {
                self.identifier_location(&declaration.identifier)
            }
            NodeKind::IncDecExpression(expression) => {
                let name = &expression.identifier.name;
                self.global_definition(tree, name)
                    .or_else(|| self.local_definition(tree, id, name))
            }
            _ => None,
        }
    }

    /// Each component of `knot.stitch.label` points at its own target.
    fn divert_definition(
        &self,
        tree: &SyntaxTree,
        id: NodeId,
        divert: &Divert,
        position: Position,
    ) -> Option<Location> {
        let target = tree.resolve_path(&divert.target, id)?;
        if !has_file_name(tree.node(target).debug_metadata.as_ref()) {
            return None;
        }

        divert
            .target
            .iter()
            .enumerate()
            .filter(|(_, component)| identifier_contains(component, position))
            .find_map(|(index, _)| {
                let partial = tree.resolve_path(&divert.target[..=index], id)?;
                let metadata = tree.node(partial).debug_metadata.as_ref();
                if !has_file_name(metadata) {
                    return None;
                }
                // A divert nested in its own target would otherwise jump to
                // the enclosing span.
                match tree.flow(partial).and_then(|flow| flow.identifier.as_ref()) {
                    Some(identifier) => self.identifier_location(identifier),
                    None => self.location_of(metadata),
                }
            })
    }

    fn function_definition(
        &self,
        tree: &SyntaxTree,
        id: NodeId,
        call: &FunctionCall,
    ) -> Option<Location> {
        if is_builtin_function(&call.name.name) {
            return None;
        }
        if let Some(target) = tree.resolve_path(std::slice::from_ref(&call.name), id) {
            return self.location_of(tree.node(target).debug_metadata.as_ref());
        }

        let external = tree.external(&call.name.name)?;
        match tree.kind(external) {
            NodeKind::ExternalDeclaration(declaration) => {
                self.identifier_location(&declaration.identifier)
            }
            _ => None,
        }
    }

    fn list_literal_definition(
        &self,
        tree: &SyntaxTree,
        list: &ListLiteral,
        position: Position,
    ) -> Option<Location> {
        let item = list
            .items
            .iter()
            .find(|item| identifier_contains(item, position))?;
        let parts: Vec<&str> = item.name.split('.').collect();
        let element = match parts.as_slice() {
            [item_name] => tree.resolve_list_item(None, item_name),
            [list_name, item_name] => tree.resolve_list_item(Some(*list_name), item_name),
            _ => None,
        }?;
        self.location_of(tree.node(element).debug_metadata.as_ref())
    }

    fn reference_definition(
        &self,
        tree: &SyntaxTree,
        id: NodeId,
        reference: &VariableReference,
    ) -> Option<Location> {
        if reference.is_list_item_reference {
            let element = match reference.path.as_slice() {
                [item] => tree.resolve_list_item(None, &item.name),
                [list, item] => tree.resolve_list_item(Some(list.name.as_str()), &item.name),
                _ => None,
            }?;
            return self.location_of(tree.node(element).debug_metadata.as_ref());
        }

        let name = reference.name();
        if reference.is_constant_reference {
            if let Some(NodeKind::ConstantDeclaration(declaration)) =
                tree.constant(&name).map(|constant| tree.kind(constant))
            {
                return self.identifier_location(&declaration.identifier);
            }
        }

        // Temps and arguments may not shadow globals.
        if let Some(location) = self.global_definition(tree, &name) {
            return Some(location);
        }
        if let Some(location) = self.local_definition(tree, id, &name) {
            return Some(location);
        }

        // Read count of a knot, stitch or label.
        let target = tree.resolve_path(&reference.path, id)?;
        self.location_of(tree.node(target).debug_metadata.as_ref())
    }

    fn global_definition(&self, tree: &SyntaxTree, name: &str) -> Option<Location> {
        match tree.kind(tree.global_variable(name)?) {
            NodeKind::VariableAssignment(declaration) => {
                self.identifier_location(&declaration.identifier)
            }
            _ => None,
        }
    }

    fn local_definition(&self, tree: &SyntaxTree, id: NodeId, name: &str) -> Option<Location> {
        let identifier = declaration_in_parents(tree, id, name)?;
        self.identifier_location(identifier)
    }

    fn identifier_location(&self, identifier: &Identifier) -> Option<Location> {
        self.location_of(identifier.debug_metadata.as_ref())
    }

    fn location_of(&self, metadata: Option<&DebugMetadata>) -> Option<Location> {
        let metadata = metadata?;
        let uri = self
            .files
            .resolve_source_uri(metadata.file_name.as_deref()?)?;
        Some(Location::new(uri, metadata_range(metadata)))
    }
}

fn has_file_name(metadata: Option<&DebugMetadata>) -> bool {
    metadata.is_some_and(|m| m.file_name.is_some())
}

/// Nearest declaration of `name` above `id`: a declaring assignment, a
/// variable declared in an enclosing flow, or an enclosing flow's argument.
/// Re-assignments never count.
fn declaration_in_parents<'t>(tree: &'t SyntaxTree, id: NodeId, name: &str) -> Option<&'t Identifier> {
    tree.ancestors(id).find_map(|ancestor| match tree.kind(ancestor) {
        NodeKind::VariableAssignment(assignment)
            if assignment.is_declaration && assignment.identifier.name == name =>
        {
            Some(&assignment.identifier)
        }
        NodeKind::Flow(flow) => flow
            .variable_declaration(name)
            .and_then(|declaration| match tree.kind(declaration) {
                NodeKind::VariableAssignment(assignment) => Some(&assignment.identifier),
                _ => None,
            })
            .or_else(|| flow.argument(name)),
        _ => None,
    })
}
