//
// backend.rs
//
// The tower-lsp `LanguageServer` implementation
//

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tower_lsp::LanguageServer;
use tower_lsp::LspService;
use tower_lsp::Server;

use crate::compiler::CompilerFactory;
use crate::config::{parse_ink_config, ConfigurationSource, InkConfig, CONFIGURATION_SECTION};
use crate::file_handler::DiskFileLoader;
use crate::state::{InkWorkspace, LanguageServerEnvironment, WorkspaceContext, WorkspaceServices};

/// Asks the client for the `ink` section, scoped to a document.
pub struct ClientConfiguration {
    client: Client,
}

impl ClientConfiguration {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigurationSource for ClientConfiguration {
    async fn ink_configuration(&self, scope: &Url) -> InkConfig {
        let item = ConfigurationItem {
            scope_uri: Some(scope.clone()),
            section: Some(CONFIGURATION_SECTION.to_string()),
        };
        match self.client.configuration(vec![item]).await {
            Ok(values) => values.first().map(parse_ink_config).unwrap_or_default(),
            Err(e) => {
                log::warn!("workspace/configuration failed for {}: {}", scope, e);
                InkConfig::default()
            }
        }
    }
}

pub struct Backend {
    client: Client,
    compiler: Arc<dyn CompilerFactory>,
    workspace: RwLock<Option<Arc<InkWorkspace>>>,
}

impl Backend {
    pub fn new(client: Client, compiler: Arc<dyn CompilerFactory>) -> Self {
        Self {
            client,
            compiler,
            workspace: RwLock::new(None),
        }
    }

    async fn workspace(&self) -> Option<Arc<InkWorkspace>> {
        let workspace = self.workspace.read().await.clone();
        if workspace.is_none() {
            log::warn!("Request received before initialize");
        }
        workspace
    }

    fn build_workspace(&self, environment: LanguageServerEnvironment) -> InkWorkspace {
        let context = WorkspaceContext::new(
            environment,
            WorkspaceServices {
                compiler: self.compiler.clone(),
                loader: Arc::new(DiskFileLoader),
                configuration: Arc::new(ClientConfiguration::new(self.client.clone())),
                publisher: Arc::new(self.client.clone()),
            },
        );
        InkWorkspace::new(Arc::new(context))
    }
}

/// Root from `rootUri`, then the first workspace folder, then the current
/// directory.
fn workspace_root(params: &InitializeParams) -> Option<LanguageServerEnvironment> {
    #[allow(deprecated)]
    let root_uri = params.root_uri.clone().or_else(|| {
        params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| folder.uri.clone())
    });

    match root_uri {
        Some(uri) => Some(LanguageServerEnvironment::new(uri)),
        None => {
            let cwd = std::env::current_dir().ok()?;
            LanguageServerEnvironment::from_path(&cwd)
        }
    }
}

fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                ..Default::default()
            },
        )),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        definition_provider: Some(OneOf::Left(true)),
        ..Default::default()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!("Initializing ink-lsp");

        let Some(environment) = workspace_root(&params) else {
            return Err(tower_lsp::jsonrpc::Error::invalid_params(
                "No workspace root and no current directory",
            ));
        };
        log::info!("Workspace root: {}", environment.root_uri);
        let workspace = self.build_workspace(environment);
        *self.workspace.write().await = Some(Arc::new(workspace));

        Ok(InitializeResult {
            capabilities: server_capabilities(),
            server_info: Some(ServerInfo {
                name: String::from("ink-lsp"),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("ink-lsp initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("ink-lsp shutting down");
        if let Some(workspace) = self.workspace.read().await.as_ref() {
            workspace.shutdown();
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(workspace) = self.workspace().await else {
            return;
        };
        let document = params.text_document;
        log::trace!("didOpen {} (version {})", document.uri, document.version);
        workspace.open_document(&document.uri, &document.text, document.version);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(workspace) = self.workspace().await else {
            return;
        };
        let uri = params.text_document.uri;
        // Full sync: the last change carries the whole text.
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        if change.range.is_some() {
            log::warn!("Ignoring ranged change for {}", uri);
            return;
        }
        workspace.change_document(&uri, &change.text, Some(params.text_document.version));
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let Some(workspace) = self.workspace().await else {
            return;
        };
        workspace.close_document(&params.text_document.uri);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        log::trace!("didSave {}", params.text_document.uri);
    }

    async fn did_change_configuration(&self, _: DidChangeConfigurationParams) {
        log::info!("Configuration changed");
        if let Some(workspace) = self.workspace().await {
            workspace.configuration_changed();
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let Some(workspace) = self.workspace().await else {
            return Ok(None);
        };
        let position = params.text_document_position_params;
        Ok(workspace
            .hover(&position.text_document.uri, position.position)
            .await)
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let Some(workspace) = self.workspace().await else {
            return Ok(None);
        };
        let position = params.text_document_position_params;
        Ok(workspace
            .definition(&position.text_document.uri, position.position)
            .await
            .map(GotoDefinitionResponse::Scalar))
    }
}

pub async fn start_lsp(compiler: Arc<dyn CompilerFactory>) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(move |client| Backend::new(client, compiler));
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(deprecated)]
    fn test_root_prefers_root_uri() {
        let params = InitializeParams {
            root_uri: Some(Url::parse("file:///story/").unwrap()),
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: Url::parse("file:///other/").unwrap(),
                name: "other".into(),
            }]),
            ..Default::default()
        };
        let environment = workspace_root(&params).unwrap();
        assert_eq!(environment.root_uri.as_str(), "file:///story/");
    }

    #[test]
    fn test_root_falls_back_to_first_folder() {
        let params = InitializeParams {
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: Url::parse("file:///other/").unwrap(),
                name: "other".into(),
            }]),
            ..Default::default()
        };
        let environment = workspace_root(&params).unwrap();
        assert_eq!(environment.root_uri.as_str(), "file:///other/");
    }

    #[test]
    fn test_root_falls_back_to_current_directory() {
        let environment = workspace_root(&InitializeParams::default()).unwrap();
        assert_eq!(environment.root_path(), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_capabilities() {
        let capabilities = server_capabilities();
        assert_eq!(
            capabilities.hover_provider,
            Some(HoverProviderCapability::Simple(true))
        );
        assert_eq!(capabilities.definition_provider, Some(OneOf::Left(true)));
        match capabilities.text_document_sync {
            Some(TextDocumentSyncCapability::Options(options)) => {
                assert_eq!(options.change, Some(TextDocumentSyncKind::FULL));
                assert_eq!(options.open_close, Some(true));
            }
            other => panic!("unexpected sync capability {other:?}"),
        }
    }
}
