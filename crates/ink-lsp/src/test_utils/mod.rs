//! Test doubles for the compiler, the client and the file system.
//!
//! Compiled for unit tests and, with the `test-support` feature, for the
//! integration tests and benchmarks.

pub mod fixture_workspace;

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};

use crate::compiler::{CompilerFactory, CompilerOptions, ErrorType, InkCompiler};
use crate::config::{ConfigurationSource, InkConfig, StaticConfiguration};
use crate::diagnostics::{DiagnosticsPublisher, StatisticsParams};
use crate::file_handler::FileLoader;
use crate::state::{InkWorkspace, LanguageServerEnvironment, WorkspaceContext, WorkspaceServices};
use crate::syntax::SyntaxTree;

/// Files served in place of the disk, keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryFileLoader {
    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }
}

impl FileLoader for MemoryFileLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

/// What one scripted compile does.
#[derive(Debug, Clone, Default)]
pub struct Script {
    messages: Vec<(String, ErrorType)>,
    includes: Vec<String>,
    tree: Option<SyntaxTree>,
    cancel_during_parse: Option<CancellationToken>,
    delay: Option<Duration>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `text` through the error handler while parsing.
    pub fn message(mut self, text: impl Into<String>, error_type: ErrorType) -> Self {
        self.messages.push((text.into(), error_type));
        self
    }

    /// Load an included file through the file handler while parsing.
    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.includes.push(name.into());
        self
    }

    pub fn tree(mut self, tree: SyntaxTree) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Cancel `token` from inside `parse`.
    pub fn cancel_during_parse(mut self, token: CancellationToken) -> Self {
        self.cancel_during_parse = Some(token);
        self
    }

    /// Block the compiler thread for `delay` before parsing.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
struct CompilerLog {
    sources: Mutex<Vec<String>>,
    includes: Mutex<Vec<(String, String)>>,
    generate_calls: AtomicUsize,
}

/// Hands out compilers that replay scripts. Queued scripts are used first,
/// one per compile; after that every compile replays the default script.
pub struct ScriptedCompilerFactory {
    default: Script,
    queued: Mutex<VecDeque<Script>>,
    log: Arc<CompilerLog>,
}

impl ScriptedCompilerFactory {
    pub fn new(default: Script) -> Self {
        Self {
            default,
            queued: Mutex::new(VecDeque::new()),
            log: Arc::new(CompilerLog::default()),
        }
    }

    pub fn push(&self, script: Script) {
        self.queued.lock().unwrap().push_back(script);
    }

    /// Entry-file text of every compile, in order.
    pub fn sources(&self) -> Vec<String> {
        self.log.sources.lock().unwrap().clone()
    }

    /// `(full file name, text)` of every include served.
    pub fn includes(&self) -> Vec<(String, String)> {
        self.log.includes.lock().unwrap().clone()
    }

    pub fn generate_calls(&self) -> usize {
        self.log.generate_calls.load(Ordering::SeqCst)
    }
}

impl CompilerFactory for ScriptedCompilerFactory {
    fn create(&self, source: String, options: CompilerOptions) -> Box<dyn InkCompiler> {
        self.log.sources.lock().unwrap().push(source);
        let script = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone());
        Box::new(ScriptedCompiler {
            script,
            options,
            log: self.log.clone(),
        })
    }
}

struct ScriptedCompiler {
    script: Script,
    options: CompilerOptions,
    log: Arc<CompilerLog>,
}

impl InkCompiler for ScriptedCompiler {
    fn parse(&mut self) -> Option<SyntaxTree> {
        if let Some(delay) = self.script.delay {
            std::thread::sleep(delay);
        }
        for include in &self.script.includes {
            let full_name = self.options.file_handler.resolve_ink_filename(include);
            match self.options.file_handler.load_ink_file_contents(&full_name) {
                Ok(text) => self.log.includes.lock().unwrap().push((full_name, text)),
                Err(err) => (self.options.error_handler)(
                    &format!("ERROR: line 1: Failed to load '{}': {}", include, err),
                    ErrorType::Error,
                ),
            }
        }
        for (text, error_type) in &self.script.messages {
            (self.options.error_handler)(text, *error_type);
        }
        if let Some(token) = &self.script.cancel_during_parse {
            token.cancel();
        }
        self.script.tree.clone()
    }

    fn generate(&mut self) {
        self.log.generate_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Captures everything sent to the client.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    diagnostics: Mutex<Vec<(Url, Vec<Diagnostic>)>>,
    statistics: Mutex<Vec<StatisticsParams>>,
    messages: Mutex<Vec<(MessageType, String)>>,
}

impl RecordingPublisher {
    /// Every `publishDiagnostics`, in order.
    pub fn diagnostics(&self) -> Vec<(Url, Vec<Diagnostic>)> {
        self.diagnostics.lock().unwrap().clone()
    }

    /// The last diagnostics published for `uri`.
    pub fn latest(&self, uri: &Url) -> Option<Vec<Diagnostic>> {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(published, _)| published == uri)
            .map(|(_, diagnostics)| diagnostics.clone())
    }

    pub fn statistics(&self) -> Vec<StatisticsParams> {
        self.statistics.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<(MessageType, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.diagnostics.lock().unwrap().clear();
        self.statistics.lock().unwrap().clear();
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl DiagnosticsPublisher for RecordingPublisher {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        self.diagnostics.lock().unwrap().push((uri, diagnostics));
    }

    async fn publish_statistics(&self, params: StatisticsParams) {
        self.statistics.lock().unwrap().push(params);
    }

    async fn log_message(&self, typ: MessageType, message: String) {
        self.messages.lock().unwrap().push((typ, message));
    }
}

/// Configuration that answers slowly and counts how often it was asked.
#[derive(Debug)]
pub struct CountingConfiguration {
    config: InkConfig,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingConfiguration {
    pub fn new(config: InkConfig, delay: Duration) -> Self {
        Self {
            config,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigurationSource for CountingConfiguration {
    async fn ink_configuration(&self, _scope: &Url) -> InkConfig {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.config.clone()
    }
}

/// Context rooted at `root` with every collaborator supplied.
pub fn test_context_parts(
    root: impl AsRef<Path>,
    loader: impl FileLoader + 'static,
    compiler: Arc<dyn CompilerFactory>,
    configuration: Arc<dyn ConfigurationSource>,
    publisher: Arc<dyn DiagnosticsPublisher>,
) -> Arc<WorkspaceContext> {
    let environment = LanguageServerEnvironment::from_path(root.as_ref())
        .expect("test workspace root must be absolute");
    Arc::new(WorkspaceContext::new(
        environment,
        WorkspaceServices {
            compiler,
            loader: Arc::new(loader),
            configuration,
            publisher,
        },
    ))
}

pub fn test_context_with(
    root: impl AsRef<Path>,
    loader: impl FileLoader + 'static,
    compiler: Arc<ScriptedCompilerFactory>,
) -> Arc<WorkspaceContext> {
    test_context_parts(
        root,
        loader,
        compiler,
        Arc::new(StaticConfiguration::default()),
        Arc::new(RecordingPublisher::default()),
    )
}

pub fn test_context(root: impl AsRef<Path>, loader: impl FileLoader + 'static) -> Arc<WorkspaceContext> {
    test_context_with(root, loader, Arc::new(ScriptedCompilerFactory::new(Script::new())))
}

/// Workspace with a recording publisher and no configured main file.
pub fn test_workspace(
    root: impl AsRef<Path>,
    loader: impl FileLoader + 'static,
    compiler: Arc<ScriptedCompilerFactory>,
) -> (InkWorkspace, Arc<RecordingPublisher>) {
    test_workspace_with_config(root, loader, compiler, InkConfig::default())
}

pub fn test_workspace_with_config(
    root: impl AsRef<Path>,
    loader: impl FileLoader + 'static,
    compiler: Arc<ScriptedCompilerFactory>,
    config: InkConfig,
) -> (InkWorkspace, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let context = test_context_parts(
        root,
        loader,
        compiler,
        Arc::new(StaticConfiguration(config)),
        publisher.clone(),
    );
    (InkWorkspace::new(context), publisher)
}
