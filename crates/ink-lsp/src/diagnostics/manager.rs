//
// diagnostics/manager.rs
//
// Scheduling and ordered publication of compiles per main document
//

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Url;

use super::diagnostician::{publication_set, CompileError, CompilePhase, CompileRun, Diagnostician};
use super::publisher::StatisticsParams;
use crate::compilation::{CompilationResult, CompilationStore};
use crate::file_handler::{resolve_main_document, WorkspaceFileHandler};
use crate::perf::{CompileMetrics, CompileMetricsSnapshot};
use crate::state::WorkspaceContext;

/// How a scheduled compile ended.
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    /// Diagnostics were pushed and the result stored.
    Published(Arc<CompilationResult>),
    /// The run observed cancellation; nothing was published.
    Cancelled(CompilePhase),
    /// A newer generation had already been published.
    Superseded { generation: u64, published: u64 },
}

#[derive(Debug)]
struct PendingCompile {
    generation: u64,
    token: CancellationToken,
}

/// Tracks the in-flight compile per main document
#[derive(Debug, Default)]
pub struct CompileSchedule {
    pending: RwLock<HashMap<Url, PendingCompile>>,
    next_generation: AtomicU64,
}

impl CompileSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a compile, cancelling any pending one for the same key.
    /// Returns the new generation and its cancellation token.
    pub fn schedule(&self, uri: Url) -> (u64, CancellationToken) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        if let Ok(mut pending) = self.pending.write() {
            let previous = pending.insert(
                uri,
                PendingCompile {
                    generation,
                    token: token.clone(),
                },
            );
            if let Some(previous) = previous {
                log::trace!("Compile {} superseded by {}", previous.generation, generation);
                previous.token.cancel();
            }
        }
        (generation, token)
    }

    /// Mark a compile as finished. A newer pending compile is left alone.
    pub fn complete(&self, uri: &Url, generation: u64) {
        if let Ok(mut pending) = self.pending.write() {
            if pending.get(uri).is_some_and(|p| p.generation == generation) {
                pending.remove(uri);
            }
        }
    }

    /// Cancel the pending compile for a URI
    pub fn cancel(&self, uri: &Url) {
        if let Ok(mut pending) = self.pending.write() {
            if let Some(p) = pending.remove(uri) {
                p.token.cancel();
            }
        }
    }

    /// Cancel all pending compiles
    pub fn cancel_all(&self) {
        if let Ok(mut pending) = self.pending.write() {
            for (_, p) in pending.drain() {
                p.token.cancel();
            }
        }
    }

    pub fn is_pending(&self, uri: &Url) -> bool {
        self.pending
            .read()
            .map(|pending| pending.contains_key(uri))
            .unwrap_or(false)
    }
}

/// Runs compiles in the background and publishes their diagnostics in
/// generation order.
pub struct DiagnosticManager {
    context: Arc<WorkspaceContext>,
    schedule: CompileSchedule,
    /// Last published generation per main document. Publication happens
    /// while holding the key's lock.
    publish_gates: DashMap<Url, Arc<Mutex<u64>>>,
    metrics: CompileMetrics,
    started_at: Instant,
}

impl DiagnosticManager {
    pub fn new(context: Arc<WorkspaceContext>) -> Self {
        Self {
            context,
            schedule: CompileSchedule::new(),
            publish_gates: DashMap::new(),
            metrics: CompileMetrics::new(),
            started_at: Instant::now(),
        }
    }

    pub fn compilations(&self) -> &CompilationStore {
        &self.context.compilations
    }

    pub fn metrics(&self) -> CompileMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_pending(&self, main_document: &Url) -> bool {
        self.schedule.is_pending(main_document)
    }

    /// Compile the main document owning `document` and publish the result.
    pub async fn compile(&self, document: &Url) -> Result<CompileOutcome, CompileError> {
        let main_document = resolve_main_document(
            self.context.configuration.as_ref(),
            &self.context.paths,
            document,
        )
        .await;
        let files = Arc::new(WorkspaceFileHandler::new(
            self.context.clone(),
            main_document.clone(),
        ));
        let (generation, token) = self.schedule.schedule(main_document.clone());
        self.metrics.record_started();
        log::debug!(
            "Compile {} requested by {} (main document {})",
            generation,
            document,
            main_document
        );

        let mut diagnostician = Diagnostician::new(self.context.clone(), files, generation);
        let outcome = match diagnostician.compile_and_diagnose(&token).await {
            Ok(CompileRun::Completed(result)) => {
                Ok(self.publish(&mut diagnostician, result, &token).await)
            }
            Ok(CompileRun::Cancelled(phase)) => {
                log::debug!("Compile {} cancelled after {:?}", generation, phase);
                self.metrics.record_cancelled();
                Ok(CompileOutcome::Cancelled(phase))
            }
            Err(err) => {
                log::warn!("Compile {} of {} failed: {}", generation, main_document, err);
                self.metrics.record_failed();
                Err(err)
            }
        };
        self.schedule.complete(&main_document, generation);
        outcome
    }

    async fn publish(
        &self,
        diagnostician: &mut Diagnostician,
        result: CompilationResult,
        token: &CancellationToken,
    ) -> CompileOutcome {
        let main_document = result.main_document.clone();
        let gate = self
            .publish_gates
            .entry(main_document.clone())
            .or_default()
            .clone();
        let mut last_published = gate.lock().await;

        if token.is_cancelled() {
            log::debug!("Compile {} cancelled before publishing", result.generation);
            return self.drop_cancelled(diagnostician);
        }
        if self.context.documents.is_empty() {
            log::debug!(
                "Dropping compile {} for {}; no documents are open",
                result.generation,
                main_document
            );
            return self.drop_cancelled(diagnostician);
        }
        if result.generation < *last_published {
            log::debug!(
                "Dropping compile {} for {}; {} already published",
                result.generation,
                main_document,
                *last_published
            );
            self.metrics.record_superseded();
            return CompileOutcome::Superseded {
                generation: result.generation,
                published: *last_published,
            };
        }

        let publications = {
            let stored = self.context.compilations.get(&main_document);
            let previous: Vec<&CompilationResult> = diagnostician
                .previous()
                .map(Arc::as_ref)
                .into_iter()
                .chain(stored.as_deref())
                .collect();
            publication_set(&result, &previous)
        };

        let publisher = &self.context.publisher;
        for (uri, diagnostics) in publications {
            log::trace!("Publishing {} diagnostics for {}", diagnostics.len(), uri);
            publisher.publish_diagnostics(uri, diagnostics).await;
        }
        if let Some(statistics) = result.statistics {
            publisher
                .publish_statistics(StatisticsParams {
                    workspace_uri: self.context.environment.root_uri.clone(),
                    main_document_uri: main_document.clone(),
                    statistics,
                })
                .await;
        }

        let result = Arc::new(result);
        self.context.compilations.insert(result.clone());
        // Closing the last document cancels before it clears the store, so a
        // result stored after that clear is seen here. A cancel from a newer
        // edit keeps the result; the newer generation replaces it.
        if token.is_cancelled() && self.context.documents.is_empty() {
            log::debug!("Last document closed while publishing {}", result.generation);
            self.context
                .compilations
                .remove_generation(&main_document, result.generation);
            return self.drop_cancelled(diagnostician);
        }
        *last_published = result.generation;
        diagnostician.mark_published();
        self.metrics.record_published(self.started_at);
        log::debug!("Compile {} of {} published", result.generation, main_document);
        CompileOutcome::Published(result)
    }

    fn drop_cancelled(&self, diagnostician: &mut Diagnostician) -> CompileOutcome {
        diagnostician.mark_cancelled();
        self.metrics.record_cancelled();
        CompileOutcome::Cancelled(CompilePhase::CodeGenerating)
    }

    /// Cancel the pending compile keyed to `main_document` and release its
    /// publish gate unless a publication holds it.
    pub fn cancel(&self, main_document: &Url) {
        self.schedule.cancel(main_document);
        self.publish_gates
            .remove_if(main_document, |_, gate| gate.try_lock().is_ok());
    }

    pub fn cancel_all(&self) {
        self.schedule.cancel_all();
        self.publish_gates.retain(|_, gate| gate.try_lock().is_err());
    }

    pub fn log_summary(&self) {
        self.metrics.log_summary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    use crate::config::StaticConfiguration;
    use crate::diagnostics::{CompilationError, Severity};
    use crate::test_utils::{
        test_context_parts, MemoryFileLoader, RecordingPublisher, Script, ScriptedCompilerFactory,
    };

    fn test_uri(name: &str) -> Url {
        Url::parse(&format!("file:///{}", name)).unwrap()
    }

    fn main_uri() -> Url {
        Url::parse("file:///w/main.ink").unwrap()
    }

    fn manager() -> (DiagnosticManager, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let context = test_context_parts(
            "/w",
            MemoryFileLoader::default(),
            Arc::new(ScriptedCompilerFactory::new(Script::new())),
            Arc::new(StaticConfiguration::default()),
            publisher.clone(),
        );
        context.documents.open(main_uri(), "text", 1);
        (DiagnosticManager::new(context), publisher)
    }

    fn diagnostician(manager: &DiagnosticManager, generation: u64) -> Diagnostician {
        let files = Arc::new(WorkspaceFileHandler::new(manager.context.clone(), main_uri()));
        Diagnostician::new(manager.context.clone(), files, generation)
    }

    /// A completed run reporting one error with `message` on line 1.
    fn completed(generation: u64, message: &str) -> CompilationResult {
        let mut diagnostics = IndexMap::new();
        diagnostics.insert(
            main_uri(),
            vec![CompilationError {
                severity: Severity::Error,
                line: 1,
                message: message.to_string(),
            }],
        );
        CompilationResult {
            main_document: main_uri(),
            tree: None,
            diagnostics,
            statistics: None,
            generation,
        }
    }

    async fn publish(manager: &DiagnosticManager, result: CompilationResult, token: &CancellationToken) -> CompileOutcome {
        let mut run = diagnostician(manager, result.generation);
        manager.publish(&mut run, result, token).await
    }

    fn published_messages(publisher: &RecordingPublisher) -> Vec<String> {
        publisher
            .diagnostics()
            .into_iter()
            .flat_map(|(_, diagnostics)| diagnostics)
            .map(|d| d.message)
            .collect()
    }

    #[tokio::test]
    async fn test_older_generation_is_superseded() {
        let (manager, publisher) = manager();
        let token = CancellationToken::new();

        let newer = publish(&manager, completed(5, "newer"), &token).await;
        assert!(matches!(newer, CompileOutcome::Published(ref r) if r.generation == 5));

        let older = publish(&manager, completed(3, "older"), &token).await;
        assert!(matches!(
            older,
            CompileOutcome::Superseded {
                generation: 3,
                published: 5
            }
        ));
        assert_eq!(published_messages(&publisher), vec!["newer".to_string()]);
        assert_eq!(manager.compilations().get(&main_uri()).unwrap().generation, 5);
        assert_eq!(manager.metrics().superseded, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_publish_keeps_earlier_diagnostics() {
        let (manager, publisher) = manager();
        publish(&manager, completed(1, "first"), &CancellationToken::new()).await;

        let token = CancellationToken::new();
        token.cancel();
        let mut run = diagnostician(&manager, 2);
        let outcome = manager.publish(&mut run, completed(2, "second"), &token).await;

        assert!(matches!(outcome, CompileOutcome::Cancelled(CompilePhase::CodeGenerating)));
        assert_eq!(run.phase(), CompilePhase::Cancelled);
        assert_eq!(publisher.diagnostics().len(), 1);
        assert_eq!(published_messages(&publisher), vec!["first".to_string()]);
        assert_eq!(manager.compilations().get(&main_uri()).unwrap().generation, 1);
    }

    #[tokio::test]
    async fn test_nothing_published_without_open_documents() {
        let (manager, publisher) = manager();
        manager.context.documents.close(&main_uri());

        let outcome = publish(&manager, completed(1, "late"), &CancellationToken::new()).await;
        assert!(matches!(outcome, CompileOutcome::Cancelled(_)));
        assert!(publisher.diagnostics().is_empty());
        assert!(manager.compilations().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_releases_publish_gate() {
        let (manager, _) = manager();
        publish(&manager, completed(1, "one"), &CancellationToken::new()).await;
        assert_eq!(manager.publish_gates.len(), 1);

        manager.cancel(&main_uri());
        assert!(manager.publish_gates.is_empty());

        publish(&manager, completed(2, "two"), &CancellationToken::new()).await;
        publish(&manager, completed(3, "three"), &CancellationToken::new()).await;
        manager.cancel_all();
        assert!(manager.publish_gates.is_empty());
    }

    #[tokio::test]
    async fn test_held_gate_survives_cancel() {
        let (manager, _) = manager();
        publish(&manager, completed(1, "one"), &CancellationToken::new()).await;
        let gate = manager.publish_gates.get(&main_uri()).unwrap().clone();
        let _held = gate.lock().await;

        manager.cancel(&main_uri());
        assert_eq!(manager.publish_gates.len(), 1);
    }

    #[test]
    fn test_schedule_cancels_previous() {
        let schedule = CompileSchedule::new();
        let uri = test_uri("main.ink");

        let (first, token1) = schedule.schedule(uri.clone());
        assert!(!token1.is_cancelled());

        let (second, token2) = schedule.schedule(uri.clone());
        assert!(token1.is_cancelled());
        assert!(!token2.is_cancelled());
        assert!(second > first);
    }

    #[test]
    fn test_complete_keeps_newer_pending() {
        let schedule = CompileSchedule::new();
        let uri = test_uri("main.ink");
        let (first, _) = schedule.schedule(uri.clone());
        let (second, _) = schedule.schedule(uri.clone());

        schedule.complete(&uri, first);
        assert!(schedule.is_pending(&uri));
        schedule.complete(&uri, second);
        assert!(!schedule.is_pending(&uri));
    }

    #[test]
    fn test_cancel_and_cancel_all() {
        let schedule = CompileSchedule::new();
        let (_, a) = schedule.schedule(test_uri("a.ink"));
        let (_, b) = schedule.schedule(test_uri("b.ink"));
        schedule.cancel(&test_uri("a.ink"));
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        schedule.cancel_all();
        assert!(b.is_cancelled());
    }

    #[test]
    fn test_generations_are_unique_across_keys() {
        let schedule = CompileSchedule::new();
        let (a, _) = schedule.schedule(test_uri("a.ink"));
        let (b, _) = schedule.schedule(test_uri("b.ink"));
        assert_ne!(a, b);
    }
}
