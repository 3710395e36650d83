//
// config.rs
//
// The `ink` configuration section
//

use async_trait::async_trait;
use tower_lsp::lsp_types::Url;

/// Section requested with `workspace/configuration`.
pub const CONFIGURATION_SECTION: &str = "ink";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InkConfig {
    /// Story entry point, relative to the workspace root. When set, every
    /// document in scope compiles through this file.
    pub main_file_path: Option<String>,
}

impl InkConfig {
    pub fn main_file_path(&self) -> Option<&str> {
        self.main_file_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }

    pub fn is_main_story_defined(&self) -> bool {
        self.main_file_path().is_some()
    }
}

/// Parse the settings object returned for the `ink` section.
///
/// Accepts `{"languageServer": {"mainFilePath": ...}}`, the flat
/// `{"mainFilePath": ...}`, and either form wrapped in `{"ink": ...}` as sent
/// by `workspace/didChangeConfiguration`.
pub fn parse_ink_config(settings: &serde_json::Value) -> InkConfig {
    let section = settings.get(CONFIGURATION_SECTION).unwrap_or(settings);

    let main_file_path = section
        .get("languageServer")
        .and_then(|v| v.get("mainFilePath"))
        .or_else(|| section.get("mainFilePath"))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(String::from);

    if let Some(path) = &main_file_path {
        log::trace!("Configured main story file: {}", path);
    }

    InkConfig { main_file_path }
}

/// Where per-document configuration comes from.
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    /// Configuration scoped to `scope`. Implementations fall back to the
    /// default configuration instead of failing.
    async fn ink_configuration(&self, scope: &Url) -> InkConfig;
}

/// Fixed configuration, used when the client cannot be asked.
#[derive(Debug, Clone, Default)]
pub struct StaticConfiguration(pub InkConfig);

#[async_trait]
impl ConfigurationSource for StaticConfiguration {
    async fn ink_configuration(&self, _scope: &Url) -> InkConfig {
        self.0.clone()
    }
}
