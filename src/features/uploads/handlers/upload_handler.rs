use axum::{
    body::Body,
    extract::{multipart::MultipartError, ConnectInfo, FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
};
use std::net::SocketAddr;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::features::uploads::dtos::{
    is_image_content_type, sanitize_file_name, ImageUpload, UploadedFile, AUTH_FIELD, FILE_FIELD,
    UPLOAD_SUCCESS_MESSAGE,
};
use crate::features::uploads::state::UploadState;
use crate::shared::security::tokens_match;

/// Fields collected from the multipart body
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    auth: Option<String>,
}

/// Upload an image
///
/// Accepts multipart/form-data with:
/// - `data`: the image file (required, `image/*` content type)
/// - `auth`: the shared secret (required)
///
/// The whole body is read before any field is checked, so an oversized body
/// is rejected ahead of every other validation.
pub async fn upload_image(
    State(state): State<UploadState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Result<&'static str> {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !has_multipart_boundary(request.headers()) {
        return Err(reject_non_multipart(request.into_body(), state.config.max_upload_size).await);
    }

    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| AppError::InvalidFile(format!("Not a multipart request: {}", e)))?;

    let form = read_upload_form(&mut multipart).await?;

    let file = form
        .file
        .ok_or_else(|| AppError::InvalidFile(format!("Missing `{}` file field", FILE_FIELD)))?;

    let file_name = file
        .file_name
        .as_deref()
        .and_then(sanitize_file_name)
        .ok_or_else(|| {
            AppError::InvalidFile(format!("Unusable filename: {:?}", file.file_name))
        })?
        .to_string();

    debug!("Received file '{}' with content type '{}'", file_name, file.content_type);

    if !is_image_content_type(&file.content_type) {
        return Err(AppError::Forbidden(format!(
            "Content type '{}' is not an image",
            file.content_type
        )));
    }

    let provided_token = form.auth.as_deref().unwrap_or_default();
    if !tokens_match(provided_token, &state.config.auth_token) {
        return Err(AppError::Forbidden("Auth token mismatch".to_string()));
    }

    state
        .service
        .store_upload(ImageUpload {
            file_name,
            content_type: file.content_type,
            data: file.data,
            ip_address: peer.to_string(),
            user_agent,
        })
        .await?;

    Ok(UPLOAD_SUCCESS_MESSAGE)
}

/// Any method other than POST on the upload route
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(format!("{} is not accepted on this route", method))
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            FILE_FIELD if form.file.is_none() => {
                let file_name = field.file_name().map(str::to_string);
                // Raw header value; `Field::content_type` lowercases it
                let content_type = field
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let data = field.bytes().await.map_err(multipart_error)?;

                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            AUTH_FIELD if form.auth.is_none() => {
                form.auth = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {
                // Unread fields are drained by the next `next_field` call,
                // which still counts them against the body limit
                debug!("Ignoring field: {}", field_name);
            }
        }
    }

    Ok(form)
}

fn has_multipart_boundary(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase())
        .is_some_and(|v| v.starts_with("multipart/form-data") && v.contains("boundary="))
}

/// Drain a body that cannot be multipart so the size limit is still checked first
async fn reject_non_multipart(body: Body, limit: usize) -> AppError {
    match axum::body::to_bytes(body, limit).await {
        Ok(_) => AppError::InvalidFile("Not a multipart/form-data request".to_string()),
        Err(e) => AppError::PayloadTooLarge(e.to_string()),
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidFile(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use crate::features::uploads::routes;
    use crate::shared::test_helpers::{
        body_text, test_state, FailingUploadRecordRepository, InMemoryUploadRecordRepository,
        MultipartBuilder,
    };
    use axum::{
        body::Body,
        extract::connect_info::MockConnectInfo,
        http::{header, Request, StatusCode},
        Router,
    };
    use std::net::SocketAddr;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::features::uploads::repositories::UploadRecordRepository;

    const PEER: ([u8; 4], u16) = ([203, 0, 113, 9], 54321);
    const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) upload-test";
    const LIMIT: usize = 8 * 1024;

    fn app(upload_dir: &Path, repository: Arc<dyn UploadRecordRepository>) -> Router {
        app_with_limit(upload_dir, repository, LIMIT)
    }

    fn app_with_limit(
        upload_dir: &Path,
        repository: Arc<dyn UploadRecordRepository>,
        limit: usize,
    ) -> Router {
        let state = test_state(
            upload_dir.to_path_buf(),
            PathBuf::from("templates/form.html"),
            limit,
            repository,
        );
        routes(state).layer(MockConnectInfo(SocketAddr::from(PEER)))
    }

    fn upload_request(body: MultipartBuilder) -> Request<Body> {
        let (content_type, bytes) = body.build();
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, content_type)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::from(bytes))
            .unwrap()
    }

    fn image_form(file_name: &str, content_type: &str, data: &[u8], auth: &str) -> MultipartBuilder {
        MultipartBuilder::new()
            .file("data", file_name, Some(content_type), data)
            .text("auth", auth)
    }

    fn dir_is_empty(dir: &Path) -> bool {
        match std::fs::read_dir(dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[tokio::test]
    async fn test_upload_valid_image() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");
        let repository = Arc::new(InMemoryUploadRecordRepository::default());
        let data = vec![0x89u8; 1024];

        let response = app(&upload_dir, repository.clone())
            .oneshot(upload_request(image_form("cat.png", "image/png", &data, "secret123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "File uploaded successfully");

        let stored = upload_dir.join("cat.png");
        assert_eq!(std::fs::read(&stored).unwrap(), data);

        let records = repository.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.file_name, "cat.png");
        assert_eq!(record.file_path, stored.to_string_lossy());
        assert_eq!(record.content_type, "image/png");
        assert_eq!(record.size, 1024);
        assert_eq!(record.ip_address, "203.0.113.9:54321");
        assert_eq!(record.user_agent, USER_AGENT);
    }

    #[tokio::test]
    async fn test_upload_accepts_uppercase_image_type() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let response = app(tmp.path(), repository.clone())
            .oneshot(upload_request(image_form("photo.jpg", "IMAGE/JPEG", b"jpeg", "secret123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(repository.records()[0].content_type, "IMAGE/JPEG");
    }

    #[tokio::test]
    async fn test_upload_wrong_auth_is_forbidden() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let response = app(&upload_dir, repository.clone())
            .oneshot(upload_request(image_form("cat.png", "image/png", &[1; 1024], "wrong")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_text(response).await,
            "Invalid request: file is not an image or invalid auth token"
        );
        assert!(dir_is_empty(&upload_dir));
        assert!(repository.records().is_empty());
    }

    #[tokio::test]
    async fn test_upload_missing_auth_is_forbidden() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());
        let form = MultipartBuilder::new().file("data", "cat.png", Some("image/png"), b"png");

        let response = app(tmp.path(), repository.clone())
            .oneshot(upload_request(form))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(repository.records().is_empty());
    }

    #[tokio::test]
    async fn test_upload_non_image_is_forbidden_regardless_of_auth() {
        for auth in ["secret123", "wrong"] {
            let tmp = tempfile::tempdir().unwrap();
            let upload_dir = tmp.path().join("uploads");
            let repository = Arc::new(InMemoryUploadRecordRepository::default());

            let response = app(&upload_dir, repository.clone())
                .oneshot(upload_request(image_form(
                    "report.pdf",
                    "application/pdf",
                    b"%PDF-1.7",
                    auth,
                )))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::FORBIDDEN, "auth={}", auth);
            assert!(dir_is_empty(&upload_dir));
            assert!(repository.records().is_empty());
        }
    }

    #[tokio::test]
    async fn test_upload_without_content_type_is_forbidden() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());
        let form = MultipartBuilder::new()
            .file("data", "cat.png", None, b"png")
            .text("auth", "secret123");

        let response = app(tmp.path(), repository.clone())
            .oneshot(upload_request(form))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(repository.records().is_empty());
    }

    #[tokio::test]
    async fn test_upload_oversized_body_is_forbidden() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let response = app_with_limit(&upload_dir, repository.clone(), 1024)
            .oneshot(upload_request(image_form(
                "big.png",
                "image/png",
                &vec![7u8; 4096],
                "secret123",
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_text(response).await,
            "Invalid request: file size too large"
        );
        assert!(dir_is_empty(&upload_dir));
        assert!(repository.records().is_empty());
    }

    #[tokio::test]
    async fn test_upload_size_check_runs_before_type_and_auth() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let response = app_with_limit(tmp.path(), repository.clone(), 512)
            .oneshot(upload_request(image_form(
                "big.pdf",
                "application/pdf",
                &vec![7u8; 2048],
                "wrong",
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_text(response).await,
            "Invalid request: file size too large"
        );
    }

    #[tokio::test]
    async fn test_upload_non_post_methods_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");
        let repository = Arc::new(InMemoryUploadRecordRepository::default());
        let app = app(&upload_dir, repository.clone());

        for method in ["GET", "PUT", "DELETE", "PATCH"] {
            let (content_type, bytes) =
                image_form("cat.png", "image/png", b"png", "secret123").build();
            let request = Request::builder()
                .method(method)
                .uri("/upload")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(bytes))
                .unwrap();

            let response = app.clone().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
            assert_eq!(body_text(response).await, "Invalid request method");
        }

        assert!(dir_is_empty(&upload_dir));
        assert!(repository.records().is_empty());
    }

    #[tokio::test]
    async fn test_upload_non_multipart_body_is_invalid_file() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"auth":"secret123"}"#))
            .unwrap();

        let response = app(tmp.path(), repository.clone())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Invalid file. Check logs");
        assert!(repository.records().is_empty());
    }

    #[tokio::test]
    async fn test_upload_oversized_non_multipart_body_is_too_large() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(vec![0u8; 4096]))
            .unwrap();

        let response = app_with_limit(&upload_dir, repository.clone(), 1024)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_text(response).await,
            "Invalid request: file size too large"
        );
        assert!(dir_is_empty(&upload_dir));
        assert!(repository.records().is_empty());
    }

    #[tokio::test]
    async fn test_upload_records_content_type_as_declared() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let response = app(tmp.path(), repository.clone())
            .oneshot(upload_request(image_form("cat.png", "Image/PNG", b"png", "secret123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(repository.records()[0].content_type, "Image/PNG");
    }

    #[tokio::test]
    async fn test_upload_missing_file_field_is_invalid_file() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());
        let form = MultipartBuilder::new()
            .file("image", "cat.png", Some("image/png"), b"png")
            .text("auth", "secret123");

        let response = app(tmp.path(), repository.clone())
            .oneshot(upload_request(form))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Invalid file. Check logs");
    }

    #[tokio::test]
    async fn test_upload_data_as_plain_value_is_invalid_file() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());
        let form = MultipartBuilder::new()
            .text("data", "not a file")
            .text("auth", "secret123");

        let response = app(tmp.path(), repository.clone())
            .oneshot(upload_request(form))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Invalid file. Check logs");
    }

    #[tokio::test]
    async fn test_upload_auth_before_file_field() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());
        let form = MultipartBuilder::new()
            .text("auth", "secret123")
            .file("data", "cat.png", Some("image/png"), b"png");

        let response = app(tmp.path(), repository.clone())
            .oneshot(upload_request(form))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(repository.records().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_same_name_twice_overwrites_file_and_keeps_both_records() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");
        let repository = Arc::new(InMemoryUploadRecordRepository::default());
        let app = app(&upload_dir, repository.clone());

        let first = app
            .clone()
            .oneshot(upload_request(image_form("cat.png", "image/png", b"first upload", "secret123")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(upload_request(image_form("cat.png", "image/gif", b"second", "secret123")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        let stored = upload_dir.join("cat.png");
        assert_eq!(std::fs::read(&stored).unwrap(), b"second");

        let records = repository.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file_path, records[1].file_path);
        assert_eq!(records[0].size, 12);
        assert_eq!(records[0].content_type, "image/png");
        assert_eq!(records[1].size, 6);
        assert_eq!(records[1].content_type, "image/gif");
        assert_ne!(records[0].id, records[1].id);
    }

    #[tokio::test]
    async fn test_upload_path_traversal_stays_in_upload_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let response = app(&upload_dir, repository.clone())
            .oneshot(upload_request(image_form(
                "../escape.png",
                "image/png",
                b"png",
                "secret123",
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(upload_dir.join("escape.png").exists());
        assert!(!tmp.path().join("escape.png").exists());
        assert_eq!(repository.records()[0].file_name, "escape.png");
    }

    #[tokio::test]
    async fn test_upload_unusable_filename_is_invalid_file() {
        let tmp = tempfile::tempdir().unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let response = app(tmp.path(), repository.clone())
            .oneshot(upload_request(image_form("..", "image/png", b"png", "secret123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Invalid file. Check logs");
    }

    #[tokio::test]
    async fn test_upload_database_failure_leaves_file_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");

        let response = app(&upload_dir, Arc::new(FailingUploadRecordRepository))
            .oneshot(upload_request(image_form("cat.png", "image/png", b"png", "secret123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Unable to save upload. Check logs");
        assert!(upload_dir.join("cat.png").exists());
    }

    #[tokio::test]
    async fn test_upload_disk_failure_is_internal_error() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");
        std::fs::write(&upload_dir, b"a file where the directory should be").unwrap();
        let repository = Arc::new(InMemoryUploadRecordRepository::default());

        let response = app(&upload_dir, repository.clone())
            .oneshot(upload_request(image_form("cat.png", "image/png", b"png", "secret123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Unable to write file. Check logs");
        assert!(repository.records().is_empty());
    }
}
