//
// diagnostics/mod.rs
//
// Compiler diagnostics: parsing, orchestration and publication
//

mod diagnostician;
mod manager;
mod message;
mod publisher;

pub use diagnostician::{publication_set, CompileError, CompilePhase, CompileRun, Diagnostician};
pub use manager::{CompileOutcome, CompileSchedule, DiagnosticManager};
pub use message::{
    parse_compiler_message, CompilationError, ParsedMessage, Severity, DIAGNOSTIC_SOURCE,
};
pub use publisher::{DiagnosticsPublisher, StatisticsParams, StoryStatistics};
