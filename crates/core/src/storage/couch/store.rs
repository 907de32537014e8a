//! The asset store facade.
//!
//! Orchestrates a save: resolve a unique on-disk target, copy the staged
//! bytes there, derive the remote address (logical name + attachment key),
//! hand off to the reconciler, and only then release the staging file.
//! Construction is cheap; the remote bootstrap runs in an explicit
//! `initialize` step, and calls that touch the store before it completes
//! fail fast instead of racing an uninitialized connection.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tracing::{info, warn};

use inkwell_shared::{CouchConfig, PathsConfig};

use crate::storage::content_type::content_type_for;
use crate::storage::error::StorageError;
use crate::storage::paths;
use crate::storage::types::{AssetRef, StagedUpload};

use super::client::{CouchClient, DocumentApi};
use super::reconciler::Reconciler;

/// Document-store-backed asset storage.
///
/// Generic over the wire client so the full save/exists/delete surface is
/// testable against an in-memory store.
#[derive(Debug)]
pub struct AssetStore<C: DocumentApi> {
    api: Arc<C>,
    reconciler: Reconciler<C>,
    paths: PathsConfig,
    public_base_url: String,
    ready: AtomicBool,
}

/// The production store: [`AssetStore`] over the Couch wire client.
pub type CouchAssetStore = AssetStore<CouchClient>;

impl CouchAssetStore {
    /// Build the production store from configuration. Cheap; the remote
    /// bootstrap happens in [`AssetStore::initialize`].
    pub fn from_config(paths: PathsConfig, couch: &CouchConfig) -> Result<Self, StorageError> {
        let public_base_url = couch.public_base_url();
        Ok(Self::new(CouchClient::new(couch)?, paths, public_base_url))
    }
}

impl<C: DocumentApi> AssetStore<C> {
    /// Create a store over a wire client. Performs no I/O.
    #[must_use]
    pub fn new(api: C, paths: PathsConfig, public_base_url: String) -> Self {
        let api = Arc::new(api);
        Self {
            reconciler: Reconciler::new(Arc::clone(&api)),
            api,
            paths,
            public_base_url,
            ready: AtomicBool::new(false),
        }
    }

    /// Runs the one-time bootstrap: ensure the target database exists (with
    /// its public-read policy) and mark the store ready. Until this
    /// completes, `save` and `exists` fail fast with `NotReady`.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        self.api.ensure_database().await?;
        self.ready.store(true, Ordering::Release);
        info!("Asset store initialized");
        Ok(())
    }

    /// Whether the bootstrap has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Content path configuration this store serves from.
    #[must_use]
    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    fn require_ready(&self) -> Result<(), StorageError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(StorageError::NotReady)
        }
    }

    /// Saves a staged upload and returns its public URL.
    ///
    /// The URL is returned only after the remote write is acknowledged; the
    /// staging file is removed on success and retained on failure so the
    /// upload can be retried.
    pub async fn save(&self, upload: &StagedUpload) -> Result<String, StorageError> {
        self.require_ready()?;

        if upload.original_name.is_empty() {
            return Err(StorageError::validation("upload has no filename"));
        }

        let images_dir = self.paths.images_dir();
        let dir = paths::target_dir(&images_dir).await?;
        let target = paths::unique_target(&dir, &upload.original_name).await?;

        tokio::fs::copy(&upload.source, &target).await?;

        let relative_url = paths::relative_url(&images_dir, &target, &self.paths.public_subdir)?;
        let asset = AssetRef::from_relative_url(&relative_url);
        let content_type = content_type_for(&target);
        let bytes = Bytes::from(tokio::fs::read(&target).await?);

        if let Err(e) = self
            .reconciler
            .upsert(&asset.logical_name, &asset.attachment_name, content_type, bytes)
            .await
        {
            // The reserved target is dropped so a retry does not burn
            // another unique name; the staging file stays for the retry.
            if let Err(cleanup) = tokio::fs::remove_file(&target).await {
                warn!(target = %target.display(), error = %cleanup, "Failed to drop target after save failure");
            }
            return Err(e);
        }

        if let Err(e) = remove_if_present(&upload.source).await {
            // The remote write is durable; a lingering staging file is not
            // worth failing the save over.
            warn!(staging = %upload.source.display(), error = %e, "Failed to remove staging file");
        }

        let url = format!(
            "{}/{}{}",
            self.public_base_url, asset.logical_name, asset.attachment_name
        );
        info!(
            document = %asset.logical_name,
            attachment = %asset.attachment_name,
            "Asset saved"
        );
        Ok(url)
    }

    /// Whether an asset is present remotely: true only if both the document
    /// and the specific attachment exist. Connection failures propagate,
    /// they are never reported as "absent".
    pub async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        self.require_ready()?;
        let (_, asset) = self.resolve(name)?;
        self.reconciler
            .query(&asset.logical_name, &asset.attachment_name)
            .await
    }

    /// Removes the local artifact for `name`. Idempotent: an already-absent
    /// file is success. Remote documents and attachments are not touched.
    pub async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let (path, _) = self.resolve(name)?;
        remove_if_present(&path).await?;
        Ok(())
    }

    /// Resolves a caller-supplied name to the on-disk path and remote
    /// address it denotes. Bare filenames resolve into the current date
    /// bucket; names carrying a path (optionally prefixed with the public
    /// subdirectory) resolve relative to the asset root.
    fn resolve(&self, name: &str) -> Result<(PathBuf, AssetRef), StorageError> {
        let relative = name.trim_start_matches('/');
        let subdir = self.paths.public_subdir.trim_matches('/');
        let relative = relative
            .strip_prefix(subdir)
            .map_or(relative, |rest| rest.trim_start_matches('/'));

        if relative.is_empty() {
            return Err(StorageError::validation("empty asset name"));
        }

        let images_dir = self.paths.images_dir();
        let path = if relative.contains('/') {
            images_dir.join(relative)
        } else {
            paths::current_bucket(&images_dir).join(relative)
        };

        let relative_url = paths::relative_url(&images_dir, &path, &self.paths.public_subdir)?;
        Ok((path, AssetRef::from_relative_url(&relative_url)))
    }
}

async fn remove_if_present(path: &std::path::Path) -> Result<(), StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
