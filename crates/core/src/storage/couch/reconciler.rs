//! Document/attachment upsert reconciler.
//!
//! Drives a single asset write through the store's document+attachment
//! model. Correctness under concurrent saves of the same logical name
//! rests entirely on the store's revision-conflict signal plus bounded
//! retries; no locks, no delays.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::storage::error::StorageError;

use super::client::DocumentApi;

/// Reconciles asset writes against the document store.
#[derive(Debug)]
pub struct Reconciler<C: DocumentApi> {
    api: Arc<C>,
}

impl<C: DocumentApi> Reconciler<C> {
    /// Create a reconciler over a shared store client.
    #[must_use]
    pub fn new(api: Arc<C>) -> Self {
        Self { api }
    }

    /// Upserts `bytes` as the attachment `attachment_name` on the document
    /// `logical_name`, creating the document on first save.
    ///
    /// Protocol:
    /// 1. fetch the document head for a fresh revision;
    /// 2. on miss, create the document — a create conflict means a
    ///    concurrent save won the race, so re-fetch and continue on the
    ///    existing-document path;
    /// 3. attach under the freshest revision — an attach conflict means the
    ///    revision went stale between fetch and attach, so re-fetch and
    ///    retry exactly once.
    ///
    /// Returns the acknowledged revision. Resolves only after the store has
    /// confirmed the write.
    pub async fn upsert(
        &self,
        logical_name: &str,
        attachment_name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, StorageError> {
        let rev = match self.api.fetch(logical_name).await {
            Ok(head) => head.rev,
            Err(StorageError::NotFound(_)) => {
                debug!(document = %logical_name, "Creating asset document on first save");
                match self.api.create(logical_name).await {
                    Ok(rev) => rev,
                    Err(StorageError::Conflict(_)) => {
                        debug!(
                            document = %logical_name,
                            "Lost document-create race, re-fetching revision"
                        );
                        self.api.fetch(logical_name).await?.rev
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        match self
            .api
            .put_attachment(
                logical_name,
                attachment_name,
                &rev,
                content_type,
                bytes.clone(),
            )
            .await
        {
            Ok(rev) => Ok(rev),
            Err(StorageError::Conflict(_)) => {
                debug!(
                    document = %logical_name,
                    attachment = %attachment_name,
                    "Revision went stale before attach, retrying once"
                );
                let rev = self.api.fetch(logical_name).await?.rev;
                self.api
                    .put_attachment(logical_name, attachment_name, &rev, content_type, bytes)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Whether both the document and the specific attachment are present.
    ///
    /// Only a genuine "not found" maps to `false`; any other failure (store
    /// unreachable, protocol error) propagates.
    pub async fn query(
        &self,
        logical_name: &str,
        attachment_name: &str,
    ) -> Result<bool, StorageError> {
        match self.api.fetch(logical_name).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        }

        match self.api.attachment_meta(logical_name, attachment_name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
