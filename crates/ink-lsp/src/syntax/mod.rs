//
// syntax/mod.rs
//
// Parsed story model shared by the compiler adapters and the resolvers
//

mod builder;
mod builtins;
mod path;
mod tree;

pub use builder::TreeBuilder;
pub use builtins::{builtin_function, is_builtin_function, BuiltinFunction, BUILTIN_FUNCTIONS};
pub use tree::{
    Choice, DebugMetadata, Divert, ExternalDeclaration, Flow, FlowLevel, FunctionCall, Gather,
    Identifier, IncDecExpression, ListLiteral, NamedDeclaration, Node, NodeId, NodeKind, Sequence,
    SequenceFlags, SyntaxTree, TreeError, VariableAssignment, VariableReference,
};
