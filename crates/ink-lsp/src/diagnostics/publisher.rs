//
// diagnostics/publisher.rs
//
// Outbound notifications produced by a compile
//

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};
use tower_lsp::Client;

use crate::stats::Statistics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsParams {
    pub workspace_uri: Url,
    pub main_document_uri: Url,
    pub statistics: Statistics,
}

/// `story/statistics` notification.
pub enum StoryStatistics {}

impl Notification for StoryStatistics {
    type Params = StatisticsParams;
    const METHOD: &'static str = "story/statistics";
}

#[async_trait]
pub trait DiagnosticsPublisher: Send + Sync {
    /// Replace the diagnostics shown for `uri`; an empty list clears them.
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>);

    async fn publish_statistics(&self, params: StatisticsParams);

    /// Surface a failure in the client's output channel.
    async fn log_message(&self, typ: MessageType, message: String);
}

#[async_trait]
impl DiagnosticsPublisher for Client {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        Client::publish_diagnostics(self, uri, diagnostics, None).await;
    }

    async fn publish_statistics(&self, params: StatisticsParams) {
        self.send_notification::<StoryStatistics>(params).await;
    }

    async fn log_message(&self, typ: MessageType, message: String) {
        Client::log_message(self, typ, message).await;
    }
}
