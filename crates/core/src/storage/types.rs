//! Asset types shared across the storage adapter.

use std::path::{Path, PathBuf};

/// An uploaded payload staged on local disk, awaiting a `save`.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    /// Transient on-disk staging location of the uploaded bytes.
    pub source: PathBuf,
    /// The filename the client uploaded the payload under.
    pub original_name: String,
}

impl StagedUpload {
    /// Create a staged upload reference.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            original_name: original_name.into(),
        }
    }
}

/// The remote-store address of a stored asset: the document id it lives
/// under and the attachment key inside that document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Document id: the extension-stripped basename of the stored file.
    pub logical_name: String,
    /// Attachment key: the asset's public relative URL.
    pub attachment_name: String,
}

impl AssetRef {
    /// Derives the remote address from a stored file's relative URL.
    ///
    /// The logical name is the final path segment without its extension;
    /// the attachment key is the relative URL itself.
    #[must_use]
    pub fn from_relative_url(relative_url: &str) -> Self {
        let file_name = relative_url.rsplit('/').next().unwrap_or(relative_url);
        let logical_name = Path::new(file_name)
            .file_stem()
            .map_or_else(|| file_name.to_string(), |s| s.to_string_lossy().into_owned());

        Self {
            logical_name,
            attachment_name: relative_url.to_string(),
        }
    }
}
