//! Couch document-store backend: wire client, upsert reconciler, and the
//! asset store facade built on top of them.

mod client;
mod reconciler;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{AttachmentMeta, CouchClient, DocumentApi, DocumentHead};
pub use reconciler::Reconciler;
pub use store::{AssetStore, CouchAssetStore};
