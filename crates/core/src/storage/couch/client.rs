//! CouchDB/Cloudant wire protocol client.
//!
//! Thin HTTP layer over the store's document interface:
//!
//! ```text
//! GET  /{db}/{id}                    fetch document head (id + revision)
//! PUT  /{db}/{id}                    create document ({"type": "asset"})
//! PUT  /{db}/{id}/{name}?rev=        upsert attachment (binary body)
//! HEAD /{db}/{id}/{name}             attachment metadata
//! GET  /{db}/{id}/{name}             attachment bytes
//! HEAD /{db}  /  PUT /{db}           database existence / creation
//! PUT  /{db}/_security               access-control policy
//! ```
//!
//! All calls carry basic auth and the configured timeout. Revision tokens
//! are returned to the caller and never cached here.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use inkwell_shared::CouchConfig;

use crate::storage::content_type::GENERIC_CONTENT_TYPE;
use crate::storage::error::StorageError;

/// Current head of an asset document: its id and revision token.
///
/// The revision is the store's optimistic-concurrency token; every mutation
/// must carry the revision obtained immediately beforehand.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentHead {
    /// Document id (the asset's logical name).
    #[serde(rename = "_id")]
    pub id: String,
    /// Opaque revision token.
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Attachment metadata from a HEAD probe.
#[derive(Debug, Clone)]
pub struct AttachmentMeta {
    /// Declared content type, when the store reports one.
    pub content_type: Option<String>,
    /// Attachment size in bytes.
    pub content_length: u64,
}

/// Write acknowledgment from document and attachment mutations.
#[derive(Debug, Deserialize)]
struct WriteAck {
    rev: String,
}

/// The document-store operations the reconciler and asset store depend on.
///
/// Implemented by [`CouchClient`] for the real wire protocol and by an
/// in-memory fake in tests.
pub trait DocumentApi: Send + Sync {
    /// Ensure the target database exists, creating it (with a public-read
    /// access policy) if absent. Runs once at adapter bootstrap.
    fn ensure_database(&self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Fetch a document's current head by id.
    fn fetch(&self, id: &str) -> impl Future<Output = Result<DocumentHead, StorageError>> + Send;

    /// Create a new document with a minimal type marker; returns its revision.
    fn create(&self, id: &str) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Upsert an attachment under `name` using `rev`; returns the new revision.
    fn put_attachment(
        &self,
        id: &str,
        name: &str,
        rev: &str,
        content_type: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Probe an attachment's metadata without transferring its body.
    fn attachment_meta(
        &self,
        id: &str,
        name: &str,
    ) -> impl Future<Output = Result<AttachmentMeta, StorageError>> + Send;

    /// Fetch an attachment's bytes and declared content type.
    fn fetch_attachment(
        &self,
        id: &str,
        name: &str,
    ) -> impl Future<Output = Result<(Bytes, String), StorageError>> + Send;
}

/// Reqwest-backed client of the Couch wire protocol.
///
/// Built once at bootstrap and shared process-wide; never re-initialized
/// per request.
#[derive(Debug, Clone)]
pub struct CouchClient {
    http: Client,
    base: Url,
    db: String,
    username: String,
    password: String,
}

impl CouchClient {
    /// Build a client from configuration. Cheap; performs no I/O.
    pub fn new(config: &CouchConfig) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::connection(e.to_string()))?;

        let base = Url::parse(&config.base_url())
            .map_err(|e| StorageError::validation(format!("invalid store URL: {e}")))?;

        Ok(Self {
            http,
            base,
            db: config.database_name(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// The database this client targets.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.db
    }

    /// Builds a URL from path segments, percent-encoding each segment.
    /// Attachment names containing slashes stay a single segment.
    fn url(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = self.base.clone();
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|()| StorageError::Unexpected("store URL cannot hold a path".into()))?;
            for segment in segments {
                parts.push(segment);
            }
        }
        Ok(url)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.username, Some(&self.password))
    }

    async fn create_database(&self) -> Result<(), StorageError> {
        let response = self
            .authed(self.http.put(self.url(&[&self.db])?))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => {
                info!(db = %self.db, "Created asset database");
                self.put_security().await
            }
            // Another process created it between our check and this PUT.
            StatusCode::PRECONDITION_FAILED => {
                debug!(db = %self.db, "Asset database already exists");
                Ok(())
            }
            s => Err(unexpected_status("create database", s)),
        }
    }

    /// Grants anonymous read access so served asset URLs are publicly
    /// fetchable: an empty members list makes the database world-readable.
    async fn put_security(&self) -> Result<(), StorageError> {
        let policy = json!({
            "admins": { "names": [], "roles": [] },
            "members": { "names": [], "roles": [] },
        });

        let response = self
            .authed(self.http.put(self.url(&[&self.db, "_security"])?))
            .json(&policy)
            .send()
            .await
            .map_err(transport)?;

        if response.status().is_success() {
            info!(db = %self.db, "Granted anonymous read access");
            Ok(())
        } else {
            Err(unexpected_status("set security policy", response.status()))
        }
    }
}

impl DocumentApi for CouchClient {
    async fn ensure_database(&self) -> Result<(), StorageError> {
        let response = self
            .authed(self.http.head(self.url(&[&self.db])?))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => self.create_database().await,
            s => Err(unexpected_status("check database", s)),
        }
    }

    async fn fetch(&self, id: &str) -> Result<DocumentHead, StorageError> {
        let response = self
            .authed(self.http.get(self.url(&[&self.db, id])?))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => response
                .json::<DocumentHead>()
                .await
                .map_err(|e| StorageError::Unexpected(format!("malformed document body: {e}"))),
            StatusCode::NOT_FOUND => Err(StorageError::not_found(format!("document '{id}'"))),
            s => Err(unexpected_status("fetch document", s)),
        }
    }

    async fn create(&self, id: &str) -> Result<String, StorageError> {
        let response = self
            .authed(self.http.put(self.url(&[&self.db, id])?))
            .json(&json!({ "type": "asset" }))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => {
                let ack: WriteAck = response
                    .json()
                    .await
                    .map_err(|e| StorageError::Unexpected(format!("malformed write ack: {e}")))?;
                Ok(ack.rev)
            }
            StatusCode::CONFLICT => Err(StorageError::conflict(id)),
            s => Err(unexpected_status("create document", s)),
        }
    }

    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        rev: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, StorageError> {
        let response = self
            .authed(self.http.put(self.url(&[&self.db, id, name])?))
            .query(&[("rev", rev)])
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => {
                let ack: WriteAck = response
                    .json()
                    .await
                    .map_err(|e| StorageError::Unexpected(format!("malformed write ack: {e}")))?;
                Ok(ack.rev)
            }
            StatusCode::CONFLICT => Err(StorageError::conflict(id)),
            StatusCode::NOT_FOUND => Err(StorageError::not_found(format!("document '{id}'"))),
            s => Err(unexpected_status("put attachment", s)),
        }
    }

    async fn attachment_meta(&self, id: &str, name: &str) -> Result<AttachmentMeta, StorageError> {
        let response = self
            .authed(self.http.head(self.url(&[&self.db, id, name])?))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                let content_length = response
                    .headers()
                    .get(CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_default();
                Ok(AttachmentMeta {
                    content_type,
                    content_length,
                })
            }
            StatusCode::NOT_FOUND => Err(StorageError::not_found(format!(
                "attachment '{name}' on document '{id}'"
            ))),
            s => Err(unexpected_status("probe attachment", s)),
        }
    }

    async fn fetch_attachment(&self, id: &str, name: &str) -> Result<(Bytes, String), StorageError> {
        let response = self
            .authed(self.http.get(self.url(&[&self.db, id, name])?))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or(GENERIC_CONTENT_TYPE)
                    .to_string();
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| StorageError::Unexpected(format!("attachment body: {e}")))?;
                Ok((body, content_type))
            }
            StatusCode::NOT_FOUND => Err(StorageError::not_found(format!(
                "attachment '{name}' on document '{id}'"
            ))),
            s => Err(unexpected_status("fetch attachment", s)),
        }
    }
}

/// Maps transport-level failures: unreachable hosts and timeouts are
/// connection errors, everything else is outside the protocol.
fn transport(err: reqwest::Error) -> StorageError {
    if err.is_timeout() || err.is_connect() {
        StorageError::connection(err.to_string())
    } else {
        StorageError::Unexpected(err.to_string())
    }
}

fn unexpected_status(operation: &str, status: StatusCode) -> StorageError {
    StorageError::Unexpected(format!("{operation} returned HTTP {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CouchConfig {
        CouchConfig {
            url: "account.cloudant.com".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
            app_name: "myblog".to_string(),
            database_suffix: "-assets".to_string(),
            database: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_document_head_deserialization() {
        let head: DocumentHead =
            serde_json::from_str(r#"{"_id": "photo", "_rev": "3-a1b2", "type": "asset"}"#)
                .expect("head should parse");
        assert_eq!(head.id, "photo");
        assert_eq!(head.rev, "3-a1b2");
    }

    #[test]
    fn test_client_targets_derived_database() {
        let client = CouchClient::new(&config()).expect("client should build");
        assert_eq!(client.database(), "myblog-assets");
    }

    #[test]
    fn test_url_encodes_attachment_name_as_single_segment() {
        let client = CouchClient::new(&config()).expect("client should build");
        let url = client
            .url(&["myblog-assets", "photo", "/content/images/photo.png"])
            .expect("url should build");

        // Slashes inside the attachment name must not create path segments.
        assert_eq!(
            url.as_str(),
            "https://account.cloudant.com/myblog-assets/photo/%2Fcontent%2Fimages%2Fphoto.png"
        );
    }
}
