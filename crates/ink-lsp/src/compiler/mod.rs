//
// compiler/mod.rs
//
// Seam between the language server and the ink compiler
//

mod process;

use std::sync::Arc;

pub use process::{ProcessCompiler, ProcessCompilerFactory};

use crate::file_handler::FileAccessError;
use crate::syntax::SyntaxTree;

/// Kind reported alongside each compiler message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// `TODO:` notes left by the story's author.
    Author,
    Warning,
    Error,
}

/// Receives every message the compiler reports.
pub type ErrorHandler = Box<dyn FnMut(&str, ErrorType) + Send>;

/// How the compiler reaches included files.
pub trait InkFileHandler: Send + Sync {
    /// Full file name for an `INCLUDE` directive.
    fn resolve_ink_filename(&self, include_name: &str) -> String;

    fn load_ink_file_contents(&self, full_filename: &str) -> Result<String, FileAccessError>;
}

pub struct CompilerOptions {
    /// Entry file name, as it will appear in debug metadata.
    pub source_filename: String,
    pub count_all_visits: bool,
    pub error_handler: ErrorHandler,
    pub file_handler: Arc<dyn InkFileHandler>,
}

/// One compilation of one story.
///
/// Compilers never fail; everything they have to say goes through the
/// error handler.
pub trait InkCompiler: Send {
    /// Parse the story. Returns no tree when parsing could not produce one.
    fn parse(&mut self) -> Option<SyntaxTree>;

    /// Generate runtime code from the parsed story.
    fn generate(&mut self);
}

pub trait CompilerFactory: Send + Sync {
    fn create(&self, source: String, options: CompilerOptions) -> Box<dyn InkCompiler>;
}
