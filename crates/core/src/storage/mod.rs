//! Asset storage backed by a CouchDB/Cloudant-style document store.
//!
//! The store models one document per logical asset name, with the file
//! bytes held as a named attachment on that document:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ document "photo"                                             │
//! │   _rev: "3-a1b2…"          (optimistic-concurrency token)    │
//! │   type: "asset"                                              │
//! │   attachments:                                               │
//! │     "/content/images/2026/08/photo.png"  → bytes, image/png  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Re-uploading the same relative path updates the attachment in place;
//! concurrent saves of the same logical name are reconciled through the
//! store's revision-conflict signal, never through locks or delays.

mod content_type;
mod couch;
mod error;
mod paths;
mod types;

pub use content_type::{GENERIC_CONTENT_TYPE, content_type_for};
pub use couch::{
    AssetStore, AttachmentMeta, CouchAssetStore, CouchClient, DocumentApi, DocumentHead,
    Reconciler,
};
pub use error::StorageError;
pub use paths::{current_bucket, relative_url, target_dir, unique_target};
pub use types::{AssetRef, StagedUpload};
