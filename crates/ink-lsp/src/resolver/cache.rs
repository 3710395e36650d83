//
// resolver/cache.rs
//
// Per-document resolver bundles, built once per document
//

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tower_lsp::lsp_types::{Hover, Location, Position, Url};

use super::definition::DefinitionResolver;
use super::hover::HoverResolver;
use super::symbol::{Located, SymbolLocator};
use crate::compilation::CompilationResult;
use crate::file_handler::{resolve_main_document, WorkspaceFileHandler};
use crate::perf::TimingGuard;
use crate::state::WorkspaceContext;
use crate::syntax::SyntaxTree;

/// Everything needed to answer position queries for one document.
pub struct ResolverBundle {
    pub document_uri: Url,
    pub main_document_uri: Url,
    files: Arc<WorkspaceFileHandler>,
    locator: SymbolLocator,
    definitions: DefinitionResolver,
    hover: HoverResolver,
}

impl ResolverBundle {
    fn new(context: Arc<WorkspaceContext>, document_uri: Url, main_document_uri: Url) -> Self {
        let files = Arc::new(WorkspaceFileHandler::new(context, main_document_uri.clone()));
        Self {
            document_uri,
            main_document_uri,
            locator: SymbolLocator::new(files.clone()),
            definitions: DefinitionResolver::new(files.clone()),
            hover: HoverResolver::new(),
            files,
        }
    }

    pub fn files(&self) -> &WorkspaceFileHandler {
        &self.files
    }

    pub fn locate<'t>(&self, tree: &'t SyntaxTree, position: Position) -> Option<Located<'t>> {
        self.locator.locate(tree, &self.document_uri, position)
    }

    pub fn definition(&self, tree: &SyntaxTree, position: Position) -> Option<Location> {
        let _guard = TimingGuard::new("Definition Resolution");
        let located = self.locate(tree, position)?;
        self.definitions.resolve_definition(tree, located, position)
    }

    pub fn hover(&self, tree: &SyntaxTree, position: Position) -> Option<Hover> {
        let located = self.locate(tree, position)?;
        self.hover.resolve_hover(tree, located)
    }
}

/// Caches one [`ResolverBundle`] per document.
///
/// An empty cell is a bundle whose main document is still being resolved;
/// concurrent requests for the same document wait on that cell instead of
/// building their own.
pub struct DefinitionManager {
    context: Arc<WorkspaceContext>,
    bundles: DashMap<Url, Arc<OnceCell<Arc<ResolverBundle>>>>,
    bundles_created: AtomicU64,
}

impl DefinitionManager {
    pub fn new(context: Arc<WorkspaceContext>) -> Self {
        Self {
            context,
            bundles: DashMap::new(),
            bundles_created: AtomicU64::new(0),
        }
    }

    pub async fn get_or_create(&self, document: &Url) -> Arc<ResolverBundle> {
        let document = self.context.paths.canonical_uri(document);
        let cell = self.bundles.entry(document.clone()).or_default().clone();

        let bundle = cell
            .get_or_init(|| async {
                let main_document = resolve_main_document(
                    self.context.configuration.as_ref(),
                    &self.context.paths,
                    &document,
                )
                .await;
                self.bundles_created.fetch_add(1, Ordering::Relaxed);
                log::trace!("Resolver bundle for {} (main document {})", document, main_document);
                Arc::new(ResolverBundle::new(self.context.clone(), document.clone(), main_document))
            })
            .await;
        bundle.clone()
    }

    fn latest_result(&self, bundle: &ResolverBundle) -> Option<Arc<CompilationResult>> {
        let result = self.context.compilations.get(&bundle.main_document_uri);
        if result.is_none() {
            log::trace!("No compilation yet for {}", bundle.main_document_uri);
        }
        result
    }

    /// Definition of the symbol at `position`, against the last published
    /// compilation.
    pub async fn definition(&self, document: &Url, position: Position) -> Option<Location> {
        let bundle = self.get_or_create(document).await;
        let result = self.latest_result(&bundle)?;
        bundle.definition(result.tree.as_deref()?, position)
    }

    pub async fn hover(&self, document: &Url, position: Position) -> Option<Hover> {
        let bundle = self.get_or_create(document).await;
        let result = self.latest_result(&bundle)?;
        bundle.hover(result.tree.as_deref()?, position)
    }

    pub fn invalidate(&self, document: &Url) {
        let document = self.context.paths.canonical_uri(document);
        if self.bundles.remove(&document).is_some() {
            log::trace!("Dropped resolver bundle for {}", document);
        }
    }

    pub fn invalidate_all(&self) {
        self.bundles.clear();
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Bundles built since startup.
    pub fn bundles_created(&self) -> u64 {
        self.bundles_created.load(Ordering::Relaxed)
    }
}
