//
// stats.rs
//
// Story statistics pushed after each compile
//

use serde::{Deserialize, Serialize};

use crate::syntax::{FlowLevel, NodeKind, SyntaxTree};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub word_count: u64,
    pub knot_count: u64,
    pub stitch_count: u64,
    pub function_count: u64,
    pub choice_count: u64,
    pub gather_count: u64,
    pub divert_count: u64,
}

impl Statistics {
    pub fn generate(tree: &SyntaxTree) -> Self {
        let mut stats = Statistics::default();
        let mut diverts = 0u64;

        for (_, node) in tree.nodes() {
            match &node.kind {
                NodeKind::Text { text } => stats.word_count += count_words(text),
                NodeKind::Flow(flow) => match flow.level {
                    FlowLevel::Knot => {
                        stats.knot_count += 1;
                        if flow.is_function {
                            stats.function_count += 1;
                        }
                    }
                    FlowLevel::Stitch => stats.stitch_count += 1,
                    FlowLevel::Story | FlowLevel::WeavePoint => {}
                },
                NodeKind::Choice(_) => stats.choice_count += 1,
                // The implicit gather at the top of the story has no metadata.
                NodeKind::Gather(_) if node.debug_metadata.is_some() => stats.gather_count += 1,
                NodeKind::Divert(_) => diverts += 1,
                _ => {}
            }
        }

        // Minus the implicit DONE closing the top-level flow.
        stats.divert_count = diverts.saturating_sub(1);
        stats
    }
}

fn count_words(text: &str) -> u64 {
    text.split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r'))
        .filter(|word| !word.is_empty())
        .count() as u64
}
