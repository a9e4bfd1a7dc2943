//! HTTP surface for docqa.
//!
//! All routes live under `/api` except the metrics endpoint:
//!
//! - `POST /api/upload` – multipart `files[]`; saves files and queues an ingestion job.
//! - `GET /api/status`, `GET /api/status/:job_id` – job progress (`total`, `current`,
//!   `processing`, `error`).
//! - `POST /api/modify_learning` – `{"files": [...]}`; forget files.
//! - `POST /api/clear` – drop every indexed entry and uploaded file.
//! - `POST /api/query` – form or JSON `query`; returns `{answer, page_number, file_name}`.
//! - `GET /api/data` – uploaded file names.
//! - `GET /api/registry` – per-file record of indexed identifiers.
//! - `GET /metrics` – ingestion and query counters.
//!
//! Failures are reported as `{"error": "..."}` with a matching status code.

use crate::extract::{ALLOWED_EXTENSIONS, SourceKind};
use crate::metrics::MetricsSnapshot;
use crate::processing::{Answer, FileRecord, JobError, JobStatus, ProcessingApi, QueryError};
use crate::store::StoreError;
use async_trait::async_trait;
use axum::{
    Form, Json, Router,
    extract::{
        DefaultBodyLimit, FromRequest, Multipart, Path as UrlPath, Request, State,
        multipart::MultipartError,
    },
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

/// Where uploads are written and how large a request may be.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Directory receiving uploaded files.
    pub dir: PathBuf,
    /// Maximum request body size in bytes.
    pub max_bytes: usize,
}

impl UploadSettings {
    /// Settings derived from the loaded configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            dir: PathBuf::from(&config.upload_dir),
            max_bytes: config.max_upload_mb.saturating_mul(1024 * 1024),
        }
    }
}

struct AppState<S> {
    service: Arc<S>,
    uploads: Arc<UploadSettings>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            uploads: self.uploads.clone(),
        }
    }
}

/// Build the HTTP router exposing the document QA surface.
pub fn create_router<S>(service: Arc<S>, uploads: UploadSettings) -> Router
where
    S: ProcessingApi + 'static,
{
    let max_bytes = uploads.max_bytes;
    let state = AppState {
        service,
        uploads: Arc::new(uploads),
    };

    Router::new()
        .route("/api/upload", post(upload_files::<S>))
        .route("/api/status", get(latest_status::<S>))
        .route("/api/status/:job_id", get(job_status::<S>))
        .route("/api/modify_learning", post(modify_learning::<S>))
        .route("/api/clear", post(clear_all::<S>))
        .route("/api/query", post(query::<S>))
        .route("/api/data", get(list_uploads::<S>))
        .route("/api/registry", get(registry::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(max_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Response body for `POST /api/upload`.
#[derive(Serialize)]
struct UploadResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<Uuid>,
}

/// Save uploaded files and queue the ones not yet ingested.
///
/// Every name is checked against the extension allow-list before anything is written, so a
/// request with one unsupported file stores and queues nothing.
async fn upload_files<S>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: ProcessingApi,
{
    let mut files: Vec<(String, axum::body::Bytes)> = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let name = sanitize_file_name(&raw_name)
            .ok_or_else(|| AppError::bad_request(format!("Invalid file name: {raw_name}")))?;
        if SourceKind::from_path(Path::new(&name)).is_none() {
            tracing::warn!(file = %name, allowed = ?ALLOWED_EXTENSIONS, "Rejected upload");
            return Err(AppError::bad_request(format!("Unsupported file type: {name}")));
        }
        let data = field.bytes().await?;
        files.push((name, data));
    }

    if files.is_empty() {
        return Err(AppError::bad_request("No files provided".into()));
    }

    tokio::fs::create_dir_all(&state.uploads.dir).await?;
    let mut pending = Vec::new();
    for (name, data) in files {
        let path = state.uploads.dir.join(&name);
        tokio::fs::write(&path, &data).await?;
        if state.service.is_registered(&name).await {
            tracing::info!(file = %name, "File already processed; not queued");
        } else if state.service.is_pending(&name) {
            tracing::info!(file = %name, "File already queued; not queued again");
        } else {
            pending.push(path);
        }
    }

    if pending.is_empty() {
        return Ok(Json(UploadResponse {
            status: "nothing to process",
            job_id: None,
        }));
    }

    let job_id = state.service.submit(pending)?;
    Ok(Json(UploadResponse {
        status: "processing started",
        job_id: Some(job_id),
    }))
}

/// Status of the newest job, or an idle status when none was submitted.
async fn latest_status<S>(State(state): State<AppState<S>>) -> Json<JobStatus>
where
    S: ProcessingApi,
{
    Json(state.service.job_status(None).unwrap_or_default())
}

async fn job_status<S>(
    State(state): State<AppState<S>>,
    UrlPath(job_id): UrlPath<Uuid>,
) -> Result<Json<JobStatus>, AppError>
where
    S: ProcessingApi,
{
    state
        .service
        .job_status(Some(job_id))
        .map(Json)
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, format!("Unknown job: {job_id}")))
}

/// Request body for `POST /api/modify_learning`.
#[derive(Deserialize)]
struct ModifyLearningRequest {
    files: Vec<String>,
}

/// Forget the listed files.
async fn modify_learning<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<ModifyLearningRequest>,
) -> Response
where
    S: ProcessingApi,
{
    let outcome = state.service.forget(request.files).await;
    if outcome.failed.is_empty() {
        return Json(json!({
            "status": "files forgotten",
            "forgotten": outcome.forgotten,
        }))
        .into_response();
    }

    let failed: BTreeMap<String, String> = outcome.failed.into_iter().collect();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Failed to forget some files",
            "failed": failed,
            "forgotten": outcome.forgotten,
        })),
    )
        .into_response()
}

/// Drop every indexed entry, the registry and the uploaded files.
async fn clear_all<S>(State(state): State<AppState<S>>) -> Result<Json<serde_json::Value>, AppError>
where
    S: ProcessingApi,
{
    state.service.clear().await?;
    let dir = &state.uploads.dir;
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => return Err(error.into()),
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(Json(json!({ "status": "cleared" })))
}

/// Question payload accepted as JSON or as a urlencoded form.
#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

struct QueryInput(QueryRequest);

#[async_trait]
impl<S> FromRequest<S> for QueryInput
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        let request = if is_json {
            let Json(request) = Json::<QueryRequest>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
            request
        } else {
            let Form(request) = Form::<QueryRequest>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
            request
        };
        Ok(Self(request))
    }
}

/// Answer a question from the indexed documents.
async fn query<S>(
    State(state): State<AppState<S>>,
    QueryInput(request): QueryInput,
) -> Result<Json<Answer>, AppError>
where
    S: ProcessingApi,
{
    let question = request.query.trim();
    if question.is_empty() {
        return Err(AppError::bad_request("Query must not be empty".into()));
    }
    let answer = state.service.query(question).await?;
    tracing::info!(contexts = answer.file_name.len(), "Query answered");
    Ok(Json(answer))
}

/// Response body for `GET /api/data`.
#[derive(Serialize)]
struct UploadsResponse {
    files: Vec<String>,
}

/// List uploaded files by name.
async fn list_uploads<S>(State(state): State<AppState<S>>) -> Result<Json<UploadsResponse>, AppError>
where
    S: ProcessingApi,
{
    let mut files = Vec::new();
    let mut entries = match tokio::fs::read_dir(&state.uploads.dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Json(UploadsResponse { files }));
        }
        Err(error) => return Err(error.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(Json(UploadsResponse { files }))
}

async fn registry<S>(State(state): State<AppState<S>>) -> Json<BTreeMap<String, FileRecord>>
where
    S: ProcessingApi,
{
    Json(state.service.registry().await)
}

/// Return ingestion and query counters.
async fn get_metrics<S>(State(state): State<AppState<S>>) -> Json<MetricsSnapshot>
where
    S: ProcessingApi,
{
    Json(state.service.metrics_snapshot())
}

/// Reduce a client-supplied name to a safe base name.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]` becomes `_`. Returns
/// `None` when nothing usable remains.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        None
    } else {
        Some(cleaned)
    }
}

/// Error response rendered as `{"error": message}`.
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, message: String) -> Self {
        Self { status, message }
    }

    fn bad_request(message: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(inner: QueryError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, inner.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(inner: StoreError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, inner.to_string())
    }
}

impl From<JobError> for AppError {
    fn from(inner: JobError) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, inner.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::new(inner.status(), inner.body_text())
    }
}

impl From<std::io::Error> for AppError {
    fn from(inner: std::io::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, inner.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{UploadSettings, create_router, sanitize_file_name};
    use crate::extract::SourceKind;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        Answer, FileRecord, ForgetOutcome, JobError, JobState, JobStatus, ProcessingApi,
        QueryError,
    };
    use crate::store::StoreError;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "docqa-test-boundary";

    #[derive(Default)]
    struct StubProcessingService {
        submitted: Mutex<Vec<Vec<PathBuf>>>,
        questions: Mutex<Vec<String>>,
        registered: Vec<String>,
        pending: Vec<String>,
        forget_fails: bool,
        job: Option<JobStatus>,
    }

    #[async_trait]
    impl ProcessingApi for StubProcessingService {
        fn submit(&self, paths: Vec<PathBuf>) -> Result<Uuid, JobError> {
            self.submitted.lock().expect("lock").push(paths);
            Ok(Uuid::nil())
        }

        fn job_status(&self, job_id: Option<Uuid>) -> Option<JobStatus> {
            match job_id {
                None => Some(self.job.clone().unwrap_or_default()),
                Some(id) => self.job.clone().filter(|job| job.job_id == Some(id)),
            }
        }

        async fn is_registered(&self, file_name: &str) -> bool {
            self.registered.iter().any(|name| name == file_name)
        }

        fn is_pending(&self, file_name: &str) -> bool {
            self.pending.iter().any(|name| name == file_name)
        }

        async fn forget(&self, file_names: Vec<String>) -> ForgetOutcome {
            if self.forget_fails {
                ForgetOutcome {
                    forgotten: Vec::new(),
                    failed: file_names
                        .into_iter()
                        .map(|name| (name, "index unavailable".to_string()))
                        .collect(),
                }
            } else {
                ForgetOutcome {
                    forgotten: file_names,
                    failed: Vec::new(),
                }
            }
        }

        async fn clear(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn query(&self, question: &str) -> Result<Answer, QueryError> {
            self.questions.lock().expect("lock").push(question.to_string());
            Ok(Answer {
                answer: "Forty-two.".into(),
                page_number: vec![Some(3)],
                file_name: vec!["guide.pdf".into()],
            })
        }

        async fn registry(&self) -> BTreeMap<String, FileRecord> {
            self.registered
                .iter()
                .map(|name| {
                    (
                        name.clone(),
                        FileRecord {
                            file_name: name.clone(),
                            kind: SourceKind::Text,
                            segment_ids: vec!["id-1".into()],
                        },
                    )
                })
                .collect()
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }
    }

    fn app(service: Arc<StubProcessingService>, uploads: &TempDir) -> Router {
        create_router(
            service,
            UploadSettings {
                dir: uploads.path().to_path_buf(),
                max_bytes: 1024 * 1024,
            },
        )
    }

    fn multipart_request(files: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, contents) in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files[]\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{contents}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::builder()
            .method(Method::POST)
            .uri("/api/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn upload_rejects_disallowed_extension_without_side_effects() {
        let uploads = tempdir().expect("uploads");
        let service = Arc::new(StubProcessingService::default());

        let response = app(service.clone(), &uploads)
            .oneshot(multipart_request(&[
                ("notes.txt", "fine"),
                ("payload.exe", "MZ"),
            ]))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Unsupported file type: payload.exe");
        assert!(service.submitted.lock().expect("lock").is_empty());
        assert_eq!(std::fs::read_dir(uploads.path()).expect("dir").count(), 0);
    }

    #[tokio::test]
    async fn upload_saves_files_and_queues_new_ones() {
        let uploads = tempdir().expect("uploads");
        let service = Arc::new(StubProcessingService {
            registered: vec!["old.txt".into()],
            ..StubProcessingService::default()
        });

        let response = app(service.clone(), &uploads)
            .oneshot(multipart_request(&[
                ("../notes.TXT", "Tokio schedules tasks."),
                ("old.txt", "Seen before."),
            ]))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "processing started");
        assert_eq!(json["job_id"], Uuid::nil().to_string());

        let saved = uploads.path().join("notes.TXT");
        assert_eq!(
            std::fs::read_to_string(&saved).expect("saved"),
            "Tokio schedules tasks."
        );
        assert!(uploads.path().join("old.txt").exists());
        let submitted = service.submitted.lock().expect("lock").clone();
        assert_eq!(submitted, vec![vec![saved]]);
    }

    #[tokio::test]
    async fn upload_of_processed_files_queues_nothing() {
        let uploads = tempdir().expect("uploads");
        let service = Arc::new(StubProcessingService {
            registered: vec!["old.txt".into()],
            ..StubProcessingService::default()
        });

        let response = app(service.clone(), &uploads)
            .oneshot(multipart_request(&[("old.txt", "Seen before.")]))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "nothing to process");
        assert!(json.get("job_id").is_none());
        assert!(service.submitted.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn upload_of_queued_file_is_not_queued_again() {
        let uploads = tempdir().expect("uploads");
        let service = Arc::new(StubProcessingService {
            pending: vec!["report.pdf".into()],
            ..StubProcessingService::default()
        });

        let response = app(service.clone(), &uploads)
            .oneshot(multipart_request(&[
                ("report.pdf", "%PDF-1.5"),
                ("notes.txt", "New notes."),
            ]))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let submitted = service.submitted.lock().expect("lock").clone();
        assert_eq!(submitted, vec![vec![uploads.path().join("notes.txt")]]);
    }

    #[tokio::test]
    async fn query_accepts_json_and_form() {
        let uploads = tempdir().expect("uploads");
        let service = Arc::new(StubProcessingService::default());

        let json_response = app(service.clone(), &uploads)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/query")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"What is the answer?"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(json_response.status(), StatusCode::OK);
        let json = json_body(json_response).await;
        assert_eq!(json["answer"], "Forty-two.");
        assert_eq!(json["page_number"][0], 3);
        assert_eq!(json["file_name"][0], "guide.pdf");

        let form_response = app(service.clone(), &uploads)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/query")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("query=Where+is+it%3F"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(form_response.status(), StatusCode::OK);

        let questions = service.questions.lock().expect("lock").clone();
        assert_eq!(questions, vec!["What is the answer?", "Where is it?"]);
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let uploads = tempdir().expect("uploads");
        let response = app(Arc::new(StubProcessingService::default()), &uploads)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/query")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"   "}"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_routes_report_latest_and_unknown_jobs() {
        let uploads = tempdir().expect("uploads");
        let job_id = Uuid::new_v4();
        let service = Arc::new(StubProcessingService {
            job: Some(JobStatus {
                job_id: Some(job_id),
                state: JobState::Running,
                total: 3,
                current: 1,
                processing: true,
                ..JobStatus::default()
            }),
            ..StubProcessingService::default()
        });

        let latest = app(service.clone(), &uploads)
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let json = json_body(latest).await;
        assert_eq!(json["total"], 3);
        assert_eq!(json["current"], 1);
        assert_eq!(json["processing"], true);
        assert_eq!(json["state"], "running");

        let unknown = app(service.clone(), &uploads)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/status/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert!(json_body(unknown).await["error"]
            .as_str()
            .is_some_and(|message| message.starts_with("Unknown job")));
    }

    #[tokio::test]
    async fn modify_learning_reports_failures() {
        let uploads = tempdir().expect("uploads");
        let request = || {
            Request::builder()
                .method(Method::POST)
                .uri("/api/modify_learning")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"files":["notes.txt"]}"#))
                .expect("request")
        };

        let ok = app(Arc::new(StubProcessingService::default()), &uploads)
            .oneshot(request())
            .await
            .expect("response");
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(json_body(ok).await["forgotten"][0], "notes.txt");

        let failing = Arc::new(StubProcessingService {
            forget_fails: true,
            ..StubProcessingService::default()
        });
        let failed = app(failing, &uploads)
            .oneshot(request())
            .await
            .expect("response");
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(failed).await;
        assert_eq!(json["failed"]["notes.txt"], "index unavailable");
    }

    #[tokio::test]
    async fn clear_removes_uploaded_files_and_data_lists_them() {
        let uploads = tempdir().expect("uploads");
        std::fs::write(uploads.path().join("b.txt"), "b").expect("write");
        std::fs::write(uploads.path().join("a.pdf"), "a").expect("write");
        let service = Arc::new(StubProcessingService::default());

        let listed = app(service.clone(), &uploads)
            .oneshot(
                Request::builder()
                    .uri("/api/data")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let json = json_body(listed).await;
        assert_eq!(json["files"], serde_json::json!(["a.pdf", "b.txt"]));

        let cleared = app(service, &uploads)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/clear")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(cleared.status(), StatusCode::OK);
        assert!(uploads.path().exists());
        assert_eq!(std::fs::read_dir(uploads.path()).expect("dir").count(), 0);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            sanitize_file_name("../../etc/passwd.txt").as_deref(),
            Some("passwd.txt")
        );
        assert_eq!(
            sanitize_file_name("C:\\Users\\me\\My Scan.png").as_deref(),
            Some("My_Scan.png")
        );
        assert_eq!(sanitize_file_name(".hidden.txt").as_deref(), Some("hidden.txt"));
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("   "), None);
    }
}
