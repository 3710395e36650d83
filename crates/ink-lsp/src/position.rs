//
// position.rs
//
// Conversion between compiler spans and LSP positions
//

use tower_lsp::lsp_types::{Position, Range};

use crate::syntax::{DebugMetadata, Identifier};

/// Zero-based range of a one-based compiler span.
pub fn metadata_range(metadata: &DebugMetadata) -> Range {
    Range {
        start: Position::new(
            metadata.start_line.saturating_sub(1),
            metadata.start_column.saturating_sub(1),
        ),
        end: Position::new(
            metadata.end_line.saturating_sub(1),
            metadata.end_column.saturating_sub(1),
        ),
    }
}

/// Whether `position` falls inside `metadata`, both endpoints inclusive.
pub fn metadata_contains(metadata: &DebugMetadata, position: Position) -> bool {
    let range = metadata_range(metadata);
    if position.line < range.start.line || position.line > range.end.line {
        return false;
    }
    if position.line == range.start.line && position.character < range.start.character {
        return false;
    }
    if position.line == range.end.line && position.character > range.end.character {
        return false;
    }
    true
}

pub fn identifier_contains(identifier: &Identifier, position: Position) -> bool {
    identifier
        .debug_metadata
        .as_ref()
        .is_some_and(|m| metadata_contains(m, position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn span(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> DebugMetadata {
        DebugMetadata::new("main.ink", start_line, start_column, end_line, end_column)
    }

    #[test]
    fn test_range_is_zero_based() {
        let range = metadata_range(&span(3, 5, 4, 1));
        assert_eq!(range.start, Position::new(2, 4));
        assert_eq!(range.end, Position::new(3, 0));
    }

    #[test]
    fn test_single_line_endpoints_inclusive() {
        // Columns 5..=9 on line 3 (one-based) are 4..=8 on line 2.
        let m = span(3, 5, 3, 9);
        assert!(!metadata_contains(&m, Position::new(2, 3)));
        assert!(metadata_contains(&m, Position::new(2, 4)));
        assert!(metadata_contains(&m, Position::new(2, 8)));
        assert!(!metadata_contains(&m, Position::new(2, 9)));
        assert!(!metadata_contains(&m, Position::new(1, 6)));
    }

    #[test]
    fn test_multi_line_span() {
        let m = span(2, 10, 5, 3);
        assert!(!metadata_contains(&m, Position::new(1, 8)));
        assert!(metadata_contains(&m, Position::new(1, 9)));
        // Interior lines match at any column.
        assert!(metadata_contains(&m, Position::new(2, 0)));
        assert!(metadata_contains(&m, Position::new(3, 500)));
        assert!(metadata_contains(&m, Position::new(4, 2)));
        assert!(!metadata_contains(&m, Position::new(4, 3)));
        assert!(!metadata_contains(&m, Position::new(5, 0)));
    }

    #[test]
    fn test_identifier_without_metadata_never_contains() {
        let identifier = Identifier::new("forest", None);
        assert!(!identifier_contains(&identifier, Position::new(0, 0)));
    }

    mod property_tests {
        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn prop_span_endpoints_contained(
                start_line in 1u32..500,
                start_column in 1u32..200,
                extra_lines in 0u32..20,
                end_column in 1u32..200,
            ) {
                let end_line = start_line + extra_lines;
                prop_assume!(extra_lines > 0 || end_column >= start_column);
                let m = span(start_line, start_column, end_line, end_column);
                let range = metadata_range(&m);
                prop_assert!(metadata_contains(&m, range.start));
                prop_assert!(metadata_contains(&m, range.end));
                prop_assert!(!metadata_contains(
                    &m,
                    Position::new(range.end.line, range.end.character + 1)
                ));
                prop_assert!(!metadata_contains(&m, Position::new(range.end.line + 1, 0)));
            }
        }
    }
}
