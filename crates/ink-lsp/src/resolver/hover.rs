//
// resolver/hover.rs
//
// Hover documentation for built-in functions and sequences
//

use tower_lsp::lsp_types::{Hover, HoverContents, MarkedString};

use super::symbol::Located;
use crate::syntax::{builtin_function, NodeKind, SequenceFlags, SyntaxTree};

/// Documentation shown when hovering a call to a runtime function.
pub fn builtin_documentation(name: &str) -> Option<&'static str> {
    builtin_function(name).map(|function| function.documentation)
}

/// One paragraph per behaviour set on a sequence, in a fixed order.
pub fn sequence_messages(flags: SequenceFlags) -> Vec<&'static str> {
    const MESSAGES: [(SequenceFlags, &str); 4] = [
        (
            SequenceFlags::ONCE,
            "A **once-only (!)** alternative displays nothing when its run out of new content to display. (You can think of a once-only alternative as a sequence with a blank last entry.",
        ),
        (
            SequenceFlags::CYCLE,
            "A **cycle (&)** alternatives loop its content.",
        ),
        (
            SequenceFlags::STOPPING,
            "A **sequence** (or \"stopping blocks\") is a set of alternatives that tracks how many times its been seen, and each time, shows the next element along. When it runs out of new content it continues the show the final element.",
        ),
        (
            SequenceFlags::SHUFFLE,
            "A **shuffle (~)** produces randomised output.",
        ),
    ];

    MESSAGES
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, message)| *message)
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HoverResolver;

impl HoverResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_hover(&self, tree: &SyntaxTree, located: Located<'_>) -> Option<Hover> {
        let Located::Node(id) = located else {
            return None;
        };
        match tree.kind(id) {
            NodeKind::FunctionCall(call) => {
                builtin_documentation(&call.name.name).map(|text| hover_from_messages(&[text]))
            }
            NodeKind::Sequence(sequence) => {
                let messages = sequence_messages(sequence.flags);
                (!messages.is_empty()).then(|| hover_from_messages(&messages))
            }
            _ => None,
        }
    }
}

fn hover_from_messages(messages: &[&str]) -> Hover {
    Hover {
        contents: HoverContents::Array(
            messages
                .iter()
                .map(|message| MarkedString::String((*message).to_string()))
                .collect(),
        ),
        range: None,
    }
}
