//! Functions provided by the ink runtime.
//!
//! Calls to these never resolve to a user definition; hovering one shows
//! its documentation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFunction {
    pub name: &'static str,
    /// Markdown shown on hover.
    pub documentation: &'static str,
}

/// Every built-in function, including the counters and list operators.
pub const BUILTIN_FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "CHOICE_COUNT",
        documentation: "`CHOICE_COUNT` returns the number of options created so far in the current chunk.",
    },
    BuiltinFunction {
        name: "TURNS",
        documentation: "`TURNS` returns the number of game turns since the game began.",
    },
    BuiltinFunction {
        name: "TURNS_SINCE",
        documentation: "`TURNS_SINCE` returns the number of moves (formally, player inputs) since a particular knot/stitch was last visited.",
    },
    BuiltinFunction {
        name: "READ_COUNT",
        documentation: "`READ_COUNT` returns the number of times a knot or stitch has been visited (read).",
    },
    BuiltinFunction {
        name: "RANDOM",
        documentation: "`RANDOM(min, max)` Ink can generate random integers if required using the `RANDOM` function. `RANDOM` is authored to be like a dice, so the min and max values are both inclusive.",
    },
    BuiltinFunction {
        name: "SEED_RANDOM",
        documentation: "`SEED_RANDOM` seeds the random number generator manually. For testing purposes, it's often useful to fix the random number generator so ink will produce the same outcomes every time you play. You can do this by _seeding_ the random number system.",
    },
    BuiltinFunction {
        name: "LIST_VALUE",
        documentation: "`LIST_VALUE` returns the numerical value associated with the list. Note the first value in a list has the value 1, and not the value 0.",
    },
    BuiltinFunction {
        name: "LIST_RANDOM",
        documentation: "`LIST_RANDOM` returns a random item from the list.",
    },
    BuiltinFunction {
        name: "LIST_MIN",
        documentation: "`LIST_MIN` return the item with the smallest value. Note that it ignores items considered out of the list.",
    },
    BuiltinFunction {
        name: "LIST_MAX",
        documentation: "`LIST_MAX` return the item with the largest value. Note that it ignores items considered out of the list.",
    },
    BuiltinFunction {
        name: "LIST_COUNT",
        documentation: "`LIST_COUNT` returns the number of items in the list. Note that it ignores items considered out of the list.",
    },
    BuiltinFunction {
        name: "LIST_ALL",
        documentation: "`LIST_ALL` returns all items from the list regardless of whether they are considered _in_ or _out_.",
    },
    BuiltinFunction {
        name: "LIST_INVERT",
        documentation: "`LIST_INVERT` invert the list (i. e., goes through the accommodation in/out name-board and flipping every switch to the opposite of what it was before. Note that LIST_INVERT on an empty list will return a null value, if the game doesn't have enough context to know what invert.",
    },
    BuiltinFunction {
        name: "LIST_RANGE",
        documentation: "`LIST_RANGE(list_name, min_value, max_value)` returns a _slice_ of the full list",
    },
    BuiltinFunction {
        name: "POW",
        documentation: "`POW(a, b)` returns the a raised to the power of b.",
    },
    BuiltinFunction {
        name: "FLOOR",
        documentation: "`FLOOR` returns the largest integer less than or equal to a given number.",
    },
    BuiltinFunction {
        name: "CEILING",
        documentation: "`CEILING` rounds a number up to the next largest integer.",
    },
    BuiltinFunction {
        name: "INT",
        documentation: "`INT` casts a value into a integer.",
    },
    BuiltinFunction {
        name: "FLOAT",
        documentation: "`FLOAT` casts a value into a floating-point number.",
    },
    BuiltinFunction {
        name: "MIN",
        documentation: "`MIN(a, b)` returns the lowest number between `a` and `b`.",
    },
    BuiltinFunction {
        name: "MAX",
        documentation: "`MAX(a, b)` returns the largest number between `a` and `b`.",
    },
];

/// Look up a built-in function by name. The lookup is case-sensitive.
pub fn builtin_function(name: &str) -> Option<&'static BuiltinFunction> {
    BUILTIN_FUNCTIONS.iter().find(|function| function.name == name)
}

/// Check if a name is a built-in function.
///
/// ```
/// use ink_lsp::syntax::is_builtin_function;
///
/// assert!(is_builtin_function("TURNS_SINCE"));
/// assert!(!is_builtin_function("turns_since"));
/// assert!(!is_builtin_function("visit_forest"));
/// ```
pub fn is_builtin_function(name: &str) -> bool {
    builtin_function(name).is_some()
}
