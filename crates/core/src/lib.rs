//! Core storage logic for Inkwell.
//!
//! This crate contains the asset storage domain with zero web framework
//! dependencies:
//!
//! - `storage` - the document-store-backed asset adapter, its upsert
//!   reconciler, the Couch wire client, and path/content-type helpers

pub mod storage;
