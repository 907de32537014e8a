//! Image upload routes.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use inkwell_core::storage::{StagedUpload, StorageError};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::AppState;

/// Creates the upload routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/uploads", post(upload_image))
}

/// Response for a completed upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Public URL of the stored asset.
    pub url: String,
}

/// POST `/uploads`
/// Accept a multipart image upload, stage it locally, and persist it.
async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> impl IntoResponse {
    // Pull the first file field out of the multipart body.
    let (original_name, data) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(name) = field.file_name().map(String::from) else {
                    continue;
                };
                match field.bytes().await {
                    Ok(data) => break (name, data),
                    Err(e) => {
                        warn!(error = %e, "Failed to read upload field");
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({
                                "error": "invalid_upload",
                                "message": "Failed to read uploaded file"
                            })),
                        )
                            .into_response();
                    }
                }
            }
            Ok(None) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "missing_file",
                        "message": "Request must include a file field"
                    })),
                )
                    .into_response();
            }
            Err(e) => {
                warn!(error = %e, "Malformed multipart body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_upload",
                        "message": "Malformed multipart body"
                    })),
                )
                    .into_response();
            }
        }
    };

    // Stage the bytes to disk; the store moves them into place on save.
    let staging_dir = state.paths.staging_dir();
    if let Err(e) = tokio::fs::create_dir_all(&staging_dir).await {
        error!(error = %e, "Failed to create staging directory");
        return internal_error();
    }
    let staged_path = staging_dir.join(Uuid::new_v4().to_string());
    if let Err(e) = tokio::fs::write(&staged_path, &data).await {
        error!(error = %e, "Failed to stage upload");
        return internal_error();
    }

    let upload = StagedUpload::new(staged_path, original_name.clone());

    match state.storage.save(&upload).await {
        Ok(url) => {
            info!(name = %original_name, url = %url, "Upload stored");
            (StatusCode::CREATED, Json(UploadResponse { url })).into_response()
        }
        Err(e) => {
            error!(name = %original_name, error = %e, "Failed to store upload");
            storage_error_response(&e)
        }
    }
}

/// Maps a storage failure onto an HTTP response.
fn storage_error_response(error: &StorageError) -> axum::response::Response {
    match error {
        StorageError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "validation_failed",
                "message": msg
            })),
        )
            .into_response(),
        StorageError::NotReady => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "storage_not_ready",
                "message": "Storage backend has not been initialized"
            })),
        )
            .into_response(),
        StorageError::Connection(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "storage_unavailable",
                "message": "Storage backend is unreachable"
            })),
        )
            .into_response(),
        StorageError::NotFound(name) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "not_found",
                "message": format!("Asset '{name}' not found")
            })),
        )
            .into_response(),
        StorageError::Conflict(_) | StorageError::Io(_) | StorageError::Unexpected(_) => {
            internal_error()
        }
    }
}

fn internal_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": "An error occurred"
        })),
    )
        .into_response()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    use crate::store::{FileStore, ServeOptions};

    /// In-memory storage backend for route tests.
    pub(crate) struct TestStore {
        /// Original names passed to `save`, in call order.
        pub saved: Mutex<Vec<String>>,
        /// Whether `save` reports the backend as initialized.
        pub ready: AtomicBool,
    }

    impl Default for TestStore {
        fn default() -> Self {
            Self {
                saved: Mutex::new(Vec::new()),
                ready: AtomicBool::new(true),
            }
        }
    }

    #[async_trait::async_trait]
    impl FileStore for TestStore {
        async fn save(&self, upload: &StagedUpload) -> Result<String, StorageError> {
            if !self.ready.load(Ordering::Acquire) {
                return Err(StorageError::NotReady);
            }
            if upload.original_name.is_empty() {
                return Err(StorageError::validation("upload has no filename"));
            }
            self.saved
                .lock()
                .unwrap()
                .push(upload.original_name.clone());
            Ok(format!(
                "https://store.example/assets/{}",
                upload.original_name
            ))
        }

        async fn exists(&self, name: &str) -> Result<bool, StorageError> {
            Ok(self.saved.lock().unwrap().iter().any(|n| n == name))
        }

        async fn delete(&self, _name: &str) -> Result<(), StorageError> {
            Ok(())
        }

        fn serve(&self, _options: &ServeOptions) -> Router {
            Router::new()
        }
    }

    fn test_app(store: Arc<TestStore>) -> (Router, tempfile::TempDir) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let paths = inkwell_shared::PathsConfig {
            content_root: tmp.path().to_path_buf(),
            ..Default::default()
        };
        let state = AppState {
            storage: store,
            paths,
        };
        (routes().with_state(state), tmp)
    }

    fn multipart_request(filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/uploads")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_returns_url() {
        let store = Arc::new(TestStore::default());
        let (app, _tmp) = test_app(store.clone());

        let response = app
            .oneshot(multipart_request("photo.png", b"png bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["url"], "https://store.example/assets/photo.png");
        assert_eq!(*store.saved.lock().unwrap(), vec!["photo.png".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_400() {
        let (app, _tmp) = test_app(Arc::new(TestStore::default()));

        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/uploads")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "missing_file");
    }

    #[tokio::test]
    async fn test_upload_before_initialization_is_503() {
        let store = Arc::new(TestStore::default());
        store.ready.store(false, Ordering::Release);
        let (app, _tmp) = test_app(store);

        let response = app
            .oneshot(multipart_request("photo.png", b"png bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "storage_not_ready");
    }
}
