//
// compilation.rs
//
// Published compilation results, one per main document
//

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use tower_lsp::lsp_types::Url;

use crate::diagnostics::CompilationError;
use crate::stats::Statistics;
use crate::syntax::SyntaxTree;

/// Outcome of one completed compile-and-diagnose cycle.
///
/// Immutable once stored; a newer compile replaces the whole `Arc`.
#[derive(Debug, Clone)]
pub struct CompilationResult {
    pub main_document: Url,
    pub tree: Option<Arc<SyntaxTree>>,
    /// Errors per file, in the order files first reported one.
    pub diagnostics: IndexMap<Url, Vec<CompilationError>>,
    pub statistics: Option<Statistics>,
    pub generation: u64,
}

impl CompilationResult {
    pub fn files_with_diagnostics(&self) -> impl Iterator<Item = &Url> {
        self.diagnostics.keys()
    }

    pub fn diagnostics_for(&self, file: &Url) -> &[CompilationError] {
        self.diagnostics.get(file).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Latest result per main document.
#[derive(Debug, Default)]
pub struct CompilationStore {
    results: RwLock<HashMap<Url, Arc<CompilationResult>>>,
}

impl CompilationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, main_document: &Url) -> Option<Arc<CompilationResult>> {
        self.results
            .read()
            .ok()
            .and_then(|results| results.get(main_document).cloned())
    }

    /// Store `result`, returning the one it replaced.
    pub fn insert(&self, result: Arc<CompilationResult>) -> Option<Arc<CompilationResult>> {
        if let Ok(mut results) = self.results.write() {
            return results.insert(result.main_document.clone(), result);
        }
        None
    }

    pub fn remove(&self, main_document: &Url) -> Option<Arc<CompilationResult>> {
        if let Ok(mut results) = self.results.write() {
            return results.remove(main_document);
        }
        None
    }

    /// Remove the stored result for `main_document` if it is `generation`.
    pub fn remove_generation(&self, main_document: &Url, generation: u64) -> bool {
        if let Ok(mut results) = self.results.write() {
            if results
                .get(main_document)
                .is_some_and(|result| result.generation == generation)
            {
                results.remove(main_document);
                return true;
            }
        }
        false
    }

    pub fn clear(&self) {
        if let Ok(mut results) = self.results.write() {
            results.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.results.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
