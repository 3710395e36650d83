//
// resolver/mod.rs
//
// Position queries over the last published compilation
//

mod cache;
mod definition;
mod hover;
mod symbol;

pub use cache::{DefinitionManager, ResolverBundle};
pub use definition::DefinitionResolver;
pub use hover::{builtin_documentation, sequence_messages, HoverResolver};
pub use symbol::{Located, SymbolLocator};
