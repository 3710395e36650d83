//
// diagnostics/diagnostician.rs
//
// One compile-and-diagnose cycle for one main document
//

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{Diagnostic, Url};

use super::message::{parse_compiler_message, CompilationError};
use crate::compilation::CompilationResult;
use crate::compiler::{CompilerOptions, ErrorType};
use crate::file_handler::{FileAccessError, WorkspaceFileHandler};
use crate::perf::TimingGuard;
use crate::state::WorkspaceContext;
use crate::stats::Statistics;
use crate::syntax::SyntaxTree;

/// Where a compile is in its lifecycle.
///
/// `Idle → LoadingEntryPoint → Parsing → Diagnosing → CodeGenerating →
/// Published`, or `Cancelled` from any phase once cancellation is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilePhase {
    Idle,
    LoadingEntryPoint,
    Parsing,
    Diagnosing,
    CodeGenerating,
    Published,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    File(#[from] FileAccessError),
    #[error("compiler task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// What a finished run produced.
#[derive(Debug)]
pub enum CompileRun {
    Completed(CompilationResult),
    /// Cancellation was observed after `phase`.
    Cancelled(CompilePhase),
}

/// Collects compiler messages per file as the compiler reports them.
struct ErrorCollector {
    files: Arc<WorkspaceFileHandler>,
    errors: IndexMap<Url, Vec<CompilationError>>,
}

impl ErrorCollector {
    fn record(&mut self, message: &str, error_type: ErrorType) {
        let records = parse_compiler_message(message);
        if records.is_empty() {
            log::debug!("Dropping unparsed {:?} message: {}", error_type, message);
            return;
        }
        for record in records {
            let file = record
                .file_name
                .as_deref()
                .and_then(|name| self.files.resolve_ink_file_uri(name))
                .unwrap_or_else(|| self.files.main_document().clone());
            log::trace!("{} {}:{} {}", record.severity.tag(), file, record.line, record.message);
            self.errors.entry(file).or_default().push(record.into());
        }
    }

    /// A compiler thread that panicked mid-report leaves the collector
    /// poisoned; what it recorded is still kept.
    fn lock(collector: &Mutex<ErrorCollector>) -> MutexGuard<'_, ErrorCollector> {
        collector.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(collector: &Mutex<ErrorCollector>) -> IndexMap<Url, Vec<CompilationError>> {
        std::mem::take(&mut Self::lock(collector).errors)
    }
}

enum BlockingOutcome {
    Completed {
        tree: Option<SyntaxTree>,
        statistics: Option<Statistics>,
    },
    Cancelled(CompilePhase),
}

/// Drives the compiler through its phases for one main document.
pub struct Diagnostician {
    context: Arc<WorkspaceContext>,
    files: Arc<WorkspaceFileHandler>,
    generation: u64,
    phase: CompilePhase,
    previous: Option<Arc<CompilationResult>>,
}

impl Diagnostician {
    pub fn new(context: Arc<WorkspaceContext>, files: Arc<WorkspaceFileHandler>, generation: u64) -> Self {
        Self {
            context,
            files,
            generation,
            phase: CompilePhase::Idle,
            previous: None,
        }
    }

    pub fn phase(&self) -> CompilePhase {
        self.phase
    }

    pub fn main_document(&self) -> &Url {
        self.files.main_document()
    }

    /// Result that was current when this run started.
    pub fn previous(&self) -> Option<&Arc<CompilationResult>> {
        self.previous.as_ref()
    }

    fn enter(&mut self, phase: CompilePhase) {
        log::trace!("Compile {} of {}: {:?} -> {:?}", self.generation, self.main_document(), self.phase, phase);
        self.phase = phase;
    }

    /// Load, parse, compute statistics and generate.
    ///
    /// Nothing is published or stored here; a completed run hands its result
    /// back for publication. Only file access failures are errors.
    pub async fn compile_and_diagnose(&mut self, token: &CancellationToken) -> Result<CompileRun, CompileError> {
        let main_document = self.main_document().clone();
        self.previous = self.context.compilations.get(&main_document);

        self.enter(CompilePhase::LoadingEntryPoint);
        let source = self.files.load_document_content(&main_document)?;
        if token.is_cancelled() {
            self.enter(CompilePhase::Cancelled);
            return Ok(CompileRun::Cancelled(CompilePhase::LoadingEntryPoint));
        }

        let collector = Arc::new(Mutex::new(ErrorCollector {
            files: self.files.clone(),
            errors: IndexMap::new(),
        }));
        let handler_collector = collector.clone();
        let options = CompilerOptions {
            source_filename: self.files.main_path_name(),
            count_all_visits: true,
            error_handler: Box::new(move |message, error_type| {
                ErrorCollector::lock(&handler_collector).record(message, error_type);
            }),
            file_handler: self.files.clone(),
        };

        self.enter(CompilePhase::Parsing);
        let factory = self.context.compiler.clone();
        let blocking_token = token.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut compiler = factory.create(source, options);

            let tree = {
                let _guard = TimingGuard::with_threshold("Parsing", 500);
                compiler.parse()
            };
            if blocking_token.is_cancelled() {
                return BlockingOutcome::Cancelled(CompilePhase::Parsing);
            }

            let statistics = {
                let _guard = TimingGuard::new("Statistics Generation");
                tree.as_ref().map(Statistics::generate)
            };
            if blocking_token.is_cancelled() {
                return BlockingOutcome::Cancelled(CompilePhase::Diagnosing);
            }

            {
                let _guard = TimingGuard::with_threshold("Code Generation", 500);
                compiler.generate();
            }
            if blocking_token.is_cancelled() {
                return BlockingOutcome::Cancelled(CompilePhase::CodeGenerating);
            }

            BlockingOutcome::Completed { tree, statistics }
        })
        .await?;

        match outcome {
            BlockingOutcome::Cancelled(phase) => {
                self.enter(CompilePhase::Cancelled);
                Ok(CompileRun::Cancelled(phase))
            }
            BlockingOutcome::Completed { tree, statistics } => {
                self.enter(CompilePhase::CodeGenerating);
                let diagnostics = ErrorCollector::take(&collector);
                if tree.is_none() {
                    log::debug!("Compiler produced no tree for {}", main_document);
                }
                Ok(CompileRun::Completed(CompilationResult {
                    main_document,
                    tree: tree.map(Arc::new),
                    diagnostics,
                    statistics,
                    generation: self.generation,
                }))
            }
        }
    }

    pub(crate) fn mark_published(&mut self) {
        self.enter(CompilePhase::Published);
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.enter(CompilePhase::Cancelled);
    }
}

/// Diagnostics to publish for `current`: every file it reports on, plus an
/// empty list for each file that had diagnostics in any of `previous`.
pub fn publication_set(
    current: &CompilationResult,
    previous: &[&CompilationResult],
) -> Vec<(Url, Vec<Diagnostic>)> {
    let mut files: IndexMap<Url, Vec<Diagnostic>> = IndexMap::new();
    files.insert(current.main_document.clone(), Vec::new());
    for (file, errors) in &current.diagnostics {
        files
            .entry(file.clone())
            .or_default()
            .extend(errors.iter().map(CompilationError::to_diagnostic));
    }
    for result in previous {
        for file in result.files_with_diagnostics() {
            files.entry(file.clone()).or_default();
        }
    }
    files.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::syntax::TreeBuilder;
    use crate::test_utils::{test_context_with, MemoryFileLoader, Script, ScriptedCompilerFactory};

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file://{}", path)).unwrap()
    }

    fn diagnostician(factory: Arc<ScriptedCompilerFactory>) -> Diagnostician {
        let loader = MemoryFileLoader::default().with_file("/w/main.ink", "Hello");
        let context = test_context_with("/w", loader, factory);
        let files = Arc::new(WorkspaceFileHandler::new(context.clone(), uri("/w/main.ink")));
        Diagnostician::new(context, files, 1)
    }

    #[tokio::test]
    async fn test_errors_grouped_per_file() {
        let factory = Arc::new(ScriptedCompilerFactory::new(
            Script::new()
                .message("ERROR: line 2: Unexpected token", ErrorType::Error)
                .message("WARNING: 'vars.ink' line 1: Unused variable", ErrorType::Warning)
                .message("not a compiler message", ErrorType::Error)
                .tree(TreeBuilder::story().finish().unwrap()),
        ));
        let mut run = diagnostician(factory.clone());

        let result = match run.compile_and_diagnose(&CancellationToken::new()).await.unwrap() {
            CompileRun::Completed(result) => result,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(run.phase(), CompilePhase::CodeGenerating);
        assert_eq!(factory.sources(), vec!["Hello".to_string()]);
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics_for(&uri("/w/main.ink"))[0].line, 2);
        assert_eq!(
            result.diagnostics_for(&uri("/w/vars.ink"))[0].severity,
            Severity::Warning
        );
        assert!(result.tree.is_some());
        assert!(result.statistics.is_some());
        assert_eq!(factory.generate_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_tree_still_reports() {
        let factory = Arc::new(ScriptedCompilerFactory::new(
            Script::new().message("ERROR: line 1: Broken", ErrorType::Error),
        ));
        let mut run = diagnostician(factory);
        let CompileRun::Completed(result) =
            run.compile_and_diagnose(&CancellationToken::new()).await.unwrap()
        else {
            panic!("expected completion");
        };
        assert!(result.tree.is_none());
        assert!(result.statistics.is_none());
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_compile() {
        let factory = Arc::new(ScriptedCompilerFactory::new(Script::new()));
        let mut run = diagnostician(factory.clone());
        let token = CancellationToken::new();
        token.cancel();

        let outcome = run.compile_and_diagnose(&token).await.unwrap();
        assert!(matches!(outcome, CompileRun::Cancelled(CompilePhase::LoadingEntryPoint)));
        assert_eq!(run.phase(), CompilePhase::Cancelled);
        assert!(factory.sources().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_during_parse() {
        let token = CancellationToken::new();
        let factory = Arc::new(ScriptedCompilerFactory::new(
            Script::new().cancel_during_parse(token.clone()),
        ));
        let mut run = diagnostician(factory.clone());

        let outcome = run.compile_and_diagnose(&token).await.unwrap();
        assert!(matches!(outcome, CompileRun::Cancelled(CompilePhase::Parsing)));
        assert_eq!(factory.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_outside_root_is_hard_failure() {
        let factory = Arc::new(ScriptedCompilerFactory::new(Script::new()));
        let context = test_context_with("/w", MemoryFileLoader::default(), factory);
        let files = Arc::new(WorkspaceFileHandler::new(context.clone(), uri("/elsewhere/main.ink")));
        let mut run = Diagnostician::new(context, files, 1);
        assert!(matches!(
            run.compile_and_diagnose(&CancellationToken::new()).await,
            Err(CompileError::File(FileAccessError::OutsideWorkspace(_)))
        ));
    }

    #[test]
    fn test_poisoned_collector_keeps_recording() {
        let factory = Arc::new(ScriptedCompilerFactory::new(Script::new()));
        let context = test_context_with("/w", MemoryFileLoader::default(), factory);
        let collector = Arc::new(Mutex::new(ErrorCollector {
            files: Arc::new(WorkspaceFileHandler::new(context, uri("/w/main.ink"))),
            errors: IndexMap::new(),
        }));
        ErrorCollector::lock(&collector).record("ERROR: line 1: before", ErrorType::Error);

        let poisoner = collector.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("compiler thread died");
        })
        .join();
        assert!(collector.is_poisoned());

        ErrorCollector::lock(&collector).record("WARNING: line 2: after", ErrorType::Warning);
        let errors = ErrorCollector::take(&collector);
        let messages: Vec<_> = errors[&uri("/w/main.ink")]
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(messages, vec!["before", "after"]);
    }

    #[test]
    fn test_publication_set_clears_fixed_files() {
        let main = uri("/w/main.ink");
        let mut previous = CompilationResult {
            main_document: main.clone(),
            tree: None,
            diagnostics: IndexMap::new(),
            statistics: None,
            generation: 1,
        };
        previous.diagnostics.insert(
            uri("/w/vars.ink"),
            vec![CompilationError {
                severity: Severity::Error,
                line: 1,
                message: "bad".into(),
            }],
        );
        let current = CompilationResult {
            generation: 2,
            diagnostics: IndexMap::new(),
            ..previous.clone()
        };

        let set = publication_set(&current, &[&previous]);
        assert_eq!(
            set,
            vec![(main, Vec::new()), (uri("/w/vars.ink"), Vec::new())]
        );
    }
}
