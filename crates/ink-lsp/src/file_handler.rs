//
// file_handler.rs
//
// Serving story files to the compiler and resolvers
//

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tower_lsp::lsp_types::Url;

use crate::compiler::InkFileHandler;
use crate::config::ConfigurationSource;
use crate::path_resolve::PathResolver;
use crate::state::WorkspaceContext;

#[derive(Debug, Error)]
pub enum FileAccessError {
    #[error("{0} is outside the workspace root")]
    OutsideWorkspace(Url),
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} is not a local file")]
    InvalidUri(Url),
}

/// Reads files that are not open in the editor.
pub trait FileLoader: Send + Sync {
    fn load(&self, path: &Path) -> io::Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileLoader;

impl FileLoader for DiskFileLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Maps file names found in debug metadata back to document identities.
pub trait SourceFileResolver: Send + Sync {
    fn resolve_source_uri(&self, file_name: &str) -> Option<Url>;
}

/// File access scoped to one main document.
///
/// Include names resolve against the main document's directory; content
/// comes from the open documents first and from the [`FileLoader`]
/// otherwise. Nothing outside the workspace root is ever served.
pub struct WorkspaceFileHandler {
    context: Arc<WorkspaceContext>,
    main_document: Url,
    main_directory: PathBuf,
}

impl WorkspaceFileHandler {
    pub fn new(context: Arc<WorkspaceContext>, main_document: Url) -> Self {
        let main_directory = context
            .paths
            .uri_to_path(&main_document)
            .and_then(|path| path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| context.paths.root().to_path_buf());
        Self {
            context,
            main_document,
            main_directory,
        }
    }

    pub fn main_document(&self) -> &Url {
        &self.main_document
    }

    pub fn main_directory(&self) -> &Path {
        &self.main_directory
    }

    /// Main document as a file name, the form the compiler reports back in
    /// debug metadata.
    pub fn main_path_name(&self) -> String {
        self.context
            .paths
            .uri_to_path(&self.main_document)
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.main_document.to_string())
    }

    pub fn paths(&self) -> &PathResolver {
        &self.context.paths
    }

    pub fn resolve_ink_path(&self, include_name: &str) -> PathBuf {
        self.context
            .paths
            .resolve_path(include_name, Some(&self.main_directory))
    }

    pub fn resolve_ink_file_uri(&self, include_name: &str) -> Option<Url> {
        self.context
            .paths
            .resolve(include_name, Some(&self.main_directory))
    }

    /// Text of `uri`, from the editor buffer if open, else from disk.
    pub fn load_document_content(&self, uri: &Url) -> Result<String, FileAccessError> {
        let paths = &self.context.paths;
        if !paths.contains(uri) {
            return Err(FileAccessError::OutsideWorkspace(uri.clone()));
        }

        let uri = paths.canonical_uri(uri);
        if let Some(text) = self.context.documents.get(&uri) {
            log::trace!("Serving {} from memory", uri);
            return Ok(text);
        }

        let path = paths
            .uri_to_path(&uri)
            .ok_or_else(|| FileAccessError::InvalidUri(uri.clone()))?;
        log::trace!("Loading {} from disk", path.display());
        self.context.loader.load(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                FileAccessError::NotFound(path)
            } else {
                FileAccessError::Io { path, source }
            }
        })
    }
}

impl InkFileHandler for WorkspaceFileHandler {
    fn resolve_ink_filename(&self, include_name: &str) -> String {
        self.resolve_ink_path(include_name)
            .to_string_lossy()
            .into_owned()
    }

    fn load_ink_file_contents(&self, full_filename: &str) -> Result<String, FileAccessError> {
        let path = self.resolve_ink_path(full_filename);
        let uri = Url::from_file_path(&path).map_err(|_| FileAccessError::NotFound(path))?;
        self.load_document_content(&uri)
    }
}

impl SourceFileResolver for WorkspaceFileHandler {
    fn resolve_source_uri(&self, file_name: &str) -> Option<Url> {
        self.resolve_ink_file_uri(file_name)
    }
}

impl SourceFileResolver for PathResolver {
    fn resolve_source_uri(&self, file_name: &str) -> Option<Url> {
        self.resolve(file_name, None)
    }
}

/// Identity of the main document owning `document`.
///
/// A configured `mainFilePath` resolves against the workspace root and wins;
/// otherwise the document is its own main document.
pub async fn resolve_main_document(
    configuration: &dyn ConfigurationSource,
    paths: &PathResolver,
    document: &Url,
) -> Url {
    let config = configuration.ink_configuration(document).await;
    match config.main_file_path().and_then(|path| paths.resolve(path, None)) {
        Some(main) => {
            log::trace!("Main document for {} is {}", document, main);
            main
        }
        None => document.clone(),
    }
}
