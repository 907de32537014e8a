//! Target path resolution for stored assets.
//!
//! Uploads land in a date-bucketed directory under the asset root
//! (`root/YYYY/MM`), with filename collisions avoided by atomically
//! reserving the target name before any bytes are copied.

use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{Datelike, Utc};

use super::error::StorageError;

/// The date bucket new uploads currently resolve into: `root/YYYY/MM`.
/// Pure path computation; nothing is created.
#[must_use]
pub fn current_bucket(root: &Path) -> PathBuf {
    let now = Utc::now();
    root.join(now.year().to_string())
        .join(format!("{:02}", now.month()))
}

/// Resolves (and creates if absent) the target directory for new uploads.
pub async fn target_dir(root: &Path) -> io::Result<PathBuf> {
    let dir = current_bucket(root);
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// Reserves a collision-free target path for `original_name` inside `dir`.
///
/// The returned path is guaranteed not to have been in use at the moment of
/// reservation, even under concurrent uploads of the same original name:
/// each candidate is claimed with a create-new open, and `-1`, `-2`, …
/// suffixes are tried until one succeeds.
pub async fn unique_target(dir: &Path, original_name: &str) -> io::Result<PathBuf> {
    let sanitized = sanitize_filename(original_name);
    let (stem, extension) = split_name(&sanitized);

    let mut attempt: u64 = 0;
    loop {
        let candidate = if attempt == 0 {
            sanitized.clone()
        } else if extension.is_empty() {
            format!("{stem}-{attempt}")
        } else {
            format!("{stem}-{attempt}.{extension}")
        };
        let path = dir.join(candidate);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Computes the URI-style relative path an asset is addressed by: the
/// public subdirectory prefix plus the target's path relative to the asset
/// root, always with forward slashes.
pub fn relative_url(
    asset_root: &Path,
    target: &Path,
    public_subdir: &str,
) -> Result<String, StorageError> {
    let relative = target.strip_prefix(asset_root).map_err(|_| {
        StorageError::validation(format!(
            "target '{}' is outside the asset root",
            target.display()
        ))
    })?;

    let mut url = public_subdir.trim_end_matches('/').to_string();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                url.push('/');
                url.push_str(&part.to_string_lossy());
            }
            _ => {
                return Err(StorageError::validation(format!(
                    "target '{}' contains a non-normal path component",
                    target.display()
                )));
            }
        }
    }
    Ok(url)
}

/// Sanitizes a filename for use as a storage path component. Only ASCII
/// alphanumerics, dots, hyphens, and underscores survive.
fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(['.', '_']).is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

/// Splits a filename into stem and extension (without the dot).
fn split_name(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (name, ""),
    }
}
