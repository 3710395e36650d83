//
// document_store.rs
//
// In-memory store for documents open in the editor
//

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use ropey::Rope;
use tower_lsp::lsp_types::Url;

// ============================================================================
// Metrics
// ============================================================================

/// Counters for DocumentStore activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStoreMetrics {
    /// Total number of documents opened
    pub documents_opened: u64,
    /// Total number of documents closed
    pub documents_closed: u64,
    /// Full-text replacements applied
    pub updates_applied: u64,
    /// Updates for documents that were not open
    pub updates_missed: u64,
}

#[derive(Debug, Default)]
struct MetricCounters {
    documents_opened: AtomicU64,
    documents_closed: AtomicU64,
    updates_applied: AtomicU64,
    updates_missed: AtomicU64,
}

// ============================================================================
// Document State
// ============================================================================

/// State for an open document
#[derive(Debug, Clone)]
pub struct DocumentState {
    /// Canonical document URI
    pub uri: Url,
    /// LSP document version
    pub version: i32,
    /// File content as a rope
    pub contents: Rope,
    /// Internal revision counter, bumped on every replacement
    pub revision: u64,
}

impl DocumentState {
    fn new(uri: Url, text: &str, version: i32) -> Self {
        Self {
            uri,
            version,
            contents: Rope::from_str(text),
            revision: 0,
        }
    }

    pub fn text(&self) -> String {
        self.contents.to_string()
    }
}

// ============================================================================
// Document Store
// ============================================================================

/// Open documents keyed by canonical URI.
///
/// The protocol only ever sends whole-document text, so updates replace the
/// content instead of applying ranges. Each entry is guarded by its own
/// shard lock.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, DocumentState>,
    counters: MetricCounters,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document, replacing any previous state for the same URI.
    pub fn open(&self, uri: Url, text: &str, version: i32) {
        log::trace!("Opening document {} (version {})", uri, version);
        self.counters.documents_opened.fetch_add(1, Ordering::Relaxed);
        self.documents
            .insert(uri.clone(), DocumentState::new(uri, text, version));
    }

    /// Replace the text of an open document.
    ///
    /// Returns false (and logs a warning) when the document is not open; an
    /// edit can race a close.
    pub fn update(&self, uri: &Url, text: &str, version: Option<i32>) -> bool {
        match self.documents.get_mut(uri) {
            Some(mut state) => {
                state.contents = Rope::from_str(text);
                state.revision += 1;
                if let Some(version) = version {
                    state.version = version;
                }
                self.counters.updates_applied.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => {
                log::warn!("Ignoring update for document that is not open: {}", uri);
                self.counters.updates_missed.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Close a document. Returns whether it was open.
    pub fn close(&self, uri: &Url) -> bool {
        let removed = self.documents.remove(uri).is_some();
        if removed {
            self.counters.documents_closed.fetch_add(1, Ordering::Relaxed);
        } else {
            log::debug!("Close for document that is not open: {}", uri);
        }
        removed
    }

    /// Current text of an open document.
    pub fn get(&self, uri: &Url) -> Option<String> {
        self.documents.get(uri).map(|state| state.text())
    }

    pub fn version(&self, uri: &Url) -> Option<i32> {
        self.documents.get(uri).map(|state| state.version)
    }

    pub fn revision(&self, uri: &Url) -> Option<u64> {
        self.documents.get(uri).map(|state| state.revision)
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn uris(&self) -> Vec<Url> {
        self.documents.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn metrics(&self) -> DocumentStoreMetrics {
        DocumentStoreMetrics {
            documents_opened: self.counters.documents_opened.load(Ordering::Relaxed),
            documents_closed: self.counters.documents_closed.load(Ordering::Relaxed),
            updates_applied: self.counters.updates_applied.load(Ordering::Relaxed),
            updates_missed: self.counters.updates_missed.load(Ordering::Relaxed),
        }
    }
}
