//! The storage contract consumed by routes and template rendering.

use axum::Router;
use inkwell_core::storage::{AssetStore, DocumentApi, StagedUpload, StorageError};

use crate::serve;

/// Options for [`FileStore::serve`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ServeOptions {
    /// Serve theme-archive downloads instead of plain assets.
    pub is_theme: bool,
}

/// The four-operation storage contract.
///
/// Implemented by the Couch-backed store here; a future variant (local
/// filesystem, another object store) implements the same surface and the
/// rest of the application is unaffected.
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// Persist a staged upload and return its public URL. Resolves only
    /// after the write is durably acknowledged.
    async fn save(&self, upload: &StagedUpload) -> Result<String, StorageError>;

    /// Whether the named asset is present. Connection failures propagate
    /// as errors, never as `false`.
    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Remove the local artifact for `name`; idempotent.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// Build the request-handling capability for this store's content:
    /// plain asset serving, or theme-archive downloads when
    /// [`ServeOptions::is_theme`] is set.
    fn serve(&self, options: &ServeOptions) -> Router;
}

#[async_trait::async_trait]
impl<C: DocumentApi + 'static> FileStore for AssetStore<C> {
    async fn save(&self, upload: &StagedUpload) -> Result<String, StorageError> {
        AssetStore::save(self, upload).await
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        AssetStore::exists(self, name).await
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        AssetStore::delete(self, name).await
    }

    fn serve(&self, options: &ServeOptions) -> Router {
        if options.is_theme {
            serve::themes_router(self.paths().themes_dir())
        } else {
            serve::assets_router(self.paths().images_dir())
        }
    }
}
