//
// state.rs
//
// Workspace state shared by every request handler
//

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tower_lsp::lsp_types::{Hover, Location, MessageType, Position, Url};

use crate::compilation::CompilationStore;
use crate::compiler::CompilerFactory;
use crate::config::ConfigurationSource;
use crate::diagnostics::{CompileError, CompileOutcome, DiagnosticManager, DiagnosticsPublisher};
use crate::document_store::DocumentStore;
use crate::file_handler::FileLoader;
use crate::path_resolve::PathResolver;
use crate::resolver::DefinitionManager;

/// Where the server runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageServerEnvironment {
    pub root_uri: Url,
}

impl LanguageServerEnvironment {
    pub fn new(root_uri: Url) -> Self {
        Self { root_uri }
    }

    pub fn from_path(root: &Path) -> Option<Self> {
        Url::from_directory_path(root).ok().map(Self::new)
    }

    pub fn root_path(&self) -> PathBuf {
        self.root_uri
            .to_file_path()
            .unwrap_or_else(|_| PathBuf::from(self.root_uri.path()))
    }
}

/// Collaborators the workspace talks to.
pub struct WorkspaceServices {
    pub compiler: Arc<dyn CompilerFactory>,
    pub loader: Arc<dyn FileLoader>,
    pub configuration: Arc<dyn ConfigurationSource>,
    pub publisher: Arc<dyn DiagnosticsPublisher>,
}

/// State shared by the compile pipeline and the resolvers. Built once per
/// session and handed around by `Arc`.
pub struct WorkspaceContext {
    pub environment: LanguageServerEnvironment,
    pub paths: PathResolver,
    pub documents: DocumentStore,
    pub compilations: CompilationStore,
    pub compiler: Arc<dyn CompilerFactory>,
    pub loader: Arc<dyn FileLoader>,
    pub configuration: Arc<dyn ConfigurationSource>,
    pub publisher: Arc<dyn DiagnosticsPublisher>,
}

impl WorkspaceContext {
    pub fn new(environment: LanguageServerEnvironment, services: WorkspaceServices) -> Self {
        let paths = PathResolver::new(environment.root_path());
        log::debug!("Workspace root: {}", paths.root().display());
        Self {
            environment,
            paths,
            documents: DocumentStore::new(),
            compilations: CompilationStore::new(),
            compiler: services.compiler,
            loader: services.loader,
            configuration: services.configuration,
            publisher: services.publisher,
        }
    }
}

pub type CompileTask = JoinHandle<Result<CompileOutcome, CompileError>>;

/// Document lifecycle plus the queries the backend forwards.
pub struct InkWorkspace {
    context: Arc<WorkspaceContext>,
    diagnostics: Arc<DiagnosticManager>,
    definitions: DefinitionManager,
}

impl InkWorkspace {
    pub fn new(context: Arc<WorkspaceContext>) -> Self {
        Self {
            diagnostics: Arc::new(DiagnosticManager::new(context.clone())),
            definitions: DefinitionManager::new(context.clone()),
            context,
        }
    }

    pub fn context(&self) -> &Arc<WorkspaceContext> {
        &self.context
    }

    pub fn diagnostics(&self) -> &DiagnosticManager {
        &self.diagnostics
    }

    pub fn definitions(&self) -> &DefinitionManager {
        &self.definitions
    }

    pub fn open_document(&self, uri: &Url, text: &str, version: i32) -> CompileTask {
        let uri = self.context.paths.canonical_uri(uri);
        self.context.documents.open(uri.clone(), text, version);
        self.schedule_compile(uri)
    }

    /// Replace the text of an open document. Returns `None` when the
    /// document is not open, in which case nothing is compiled.
    pub fn change_document(
        &self,
        uri: &Url,
        text: &str,
        version: Option<i32>,
    ) -> Option<CompileTask> {
        let uri = self.context.paths.canonical_uri(uri);
        if !self.context.documents.update(&uri, text, version) {
            return None;
        }
        Some(self.schedule_compile(uri))
    }

    pub fn close_document(&self, uri: &Url) {
        let uri = self.context.paths.canonical_uri(uri);
        self.context.documents.close(&uri);
        self.diagnostics.cancel(&uri);
        self.definitions.invalidate(&uri);

        if self.context.documents.is_empty() {
            log::debug!("Last document closed, dropping all compilations");
            // Compiles keyed to a configured main file outlive the closed URI.
            self.diagnostics.cancel_all();
            self.context.compilations.clear();
            self.definitions.invalidate_all();
        } else if self.context.compilations.remove(&uri).is_some() {
            log::debug!("Dropped compilation of {}", uri);
        }
    }

    /// Compile `uri`'s main document in the background.
    pub fn schedule_compile(&self, uri: Url) -> CompileTask {
        let diagnostics = self.diagnostics.clone();
        let publisher = self.context.publisher.clone();
        tokio::spawn(async move {
            let outcome = diagnostics.compile(&uri).await;
            if let Err(err) = &outcome {
                log::error!("Compiling {} failed: {}", uri, err);
                publisher
                    .log_message(
                        MessageType::ERROR,
                        format!("Could not compile {}: {}", uri, err),
                    )
                    .await;
            }
            outcome
        })
    }

    pub async fn definition(&self, uri: &Url, position: Position) -> Option<Location> {
        self.definitions.definition(uri, position).await
    }

    pub async fn hover(&self, uri: &Url, position: Position) -> Option<Hover> {
        self.definitions.hover(uri, position).await
    }

    /// Forget cached main documents after a configuration change.
    pub fn configuration_changed(&self) {
        self.definitions.invalidate_all();
    }

    pub fn shutdown(&self) {
        self.diagnostics.cancel_all();
        self.diagnostics.log_summary();
    }
}
