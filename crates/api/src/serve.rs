//! Request-handling capabilities for stored content.
//!
//! Two variants, matching the storage contract's `serve` operation:
//! plain asset serving straight off the local asset directory, and
//! on-demand theme-archive downloads.

use std::path::{Path, PathBuf};

use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info};

use crate::archive;

/// Cache lifetime for served assets: stored content is immutable (re-uploads
/// land under fresh unique names), so clients may cache for a year.
const ASSET_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Serves stored assets from the local asset directory.
///
/// Misses are real 404s; there is no fallthrough to other handlers.
pub fn assets_router(assets_dir: PathBuf) -> Router {
    let service = ServeDir::new(assets_dir).append_index_html_on_directories(false);
    Router::new().fallback_service(service).layer(
        SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static(ASSET_CACHE_CONTROL),
        ),
    )
}

/// Serves theme directories as freshly packaged zip downloads at
/// `/{theme}/download`.
pub fn themes_router(themes_dir: PathBuf) -> Router {
    Router::new()
        .route("/{theme}/download", get(download_theme))
        .with_state(themes_dir)
}

/// GET `/{theme}/download`
///
/// Packages the theme directory into a zip inside a fresh temporary
/// directory and returns it. The temporary directory is removed on every
/// path, success or failure, by its RAII guard.
async fn download_theme(
    State(themes_dir): State<PathBuf>,
    UrlPath(theme): UrlPath<String>,
) -> Response {
    if theme.is_empty() || theme == "." || theme == ".." || theme.contains(['/', '\\']) {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "invalid_theme_name",
                "message": "Theme name must be a single path component"
            })),
        )
            .into_response();
    }

    let source = themes_dir.join(&theme);
    if !source.is_dir() {
        return (
            StatusCode::NOT_FOUND,
            axum::Json(json!({
                "error": "theme_not_found",
                "message": format!("Theme '{theme}' is not installed")
            })),
        )
            .into_response();
    }

    let archive_name = format!("{theme}.zip");
    let packaged = {
        let archive_name = archive_name.clone();
        tokio::task::spawn_blocking(move || package_theme(&source, &archive_name))
    }
    .await;

    match packaged {
        Ok(Ok(bytes)) => {
            info!(theme = %theme, size = bytes.len(), "Theme packaged for download");
            let disposition = format!("attachment; filename=\"{archive_name}\"");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::CONTENT_LENGTH, bytes.len().to_string()),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(Err(e)) => {
            error!(theme = %theme, error = %e, "Failed to package theme");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({
                    "error": "packaging_failed",
                    "message": "Failed to package theme for download"
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(theme = %theme, error = %e, "Theme packaging task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred"
                })),
            )
                .into_response()
        }
    }
}

/// Zips `source` into a scratch directory and reads the archive back.
/// The scratch directory lives exactly as long as this function.
fn package_theme(source: &Path, archive_name: &str) -> std::io::Result<Vec<u8>> {
    let scratch = tempfile::Builder::new()
        .prefix("inkwell-theme-")
        .tempdir()?;
    let zip_path = scratch.path().join(archive_name);
    archive::zip_directory(source, &zip_path)?;
    std::fs::read(&zip_path)
}
