//! Request handlers.
//!
//! Service calls block on the filesystem and on the `SQLite` connection
//! mutex, so every one of them runs on the blocking pool through
//! [`blocking`].

use super::AppState;
use crate::{Error, Result};
use crate::models::ImportJobId;
use crate::storage::Download;
use crate::translation::EXCEPTIONS_DOMAIN;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

/// Filename stem of template downloads: `import-template-file.{ext}`.
pub const TEMPLATE_FILE_PREFIX: &str = "import-template-file.";

/// Route parameters of derived import routes.
#[derive(Debug, Deserialize)]
pub struct OrganizationPath {
    /// Tenant segment.
    pub organization: String,
}

/// Query parameters of an import request.
///
/// The body is the raw file; its format comes from `ext` or, failing that,
/// from the extension of `filename`.
#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    /// File extension.
    pub ext: Option<String>,
    /// Original filename.
    pub filename: Option<String>,
}

impl ImportQuery {
    fn extension(&self) -> Option<String> {
        self.ext.clone().or_else(|| {
            self.filename
                .as_deref()
                .and_then(|name| std::path::Path::new(name).extension())
                .and_then(|ext| ext.to_str())
                .map(str::to_string)
        })
    }
}

pub(super) async fn create_import(
    state: AppState,
    target: Arc<str>,
    organization: String,
    query: ImportQuery,
    body: Bytes,
) -> Response {
    let Some(extension) = query.extension() else {
        return error_response(
            &state,
            &Error::InvalidInput("missing file extension (ext or filename)".to_string()),
        );
    };

    let imports = state.imports.clone();
    let created = blocking(move || {
        imports.create_import(&target, &organization, &body, &extension)
    })
    .await;
    match created {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(e) => error_response(&state, &e),
    }
}

pub(super) async fn show_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let imports = state.imports.clone();
    match blocking(move || imports.get(id.parse()?)).await {
        Ok(job) => Json(job).into_response(),
        Err(e) => error_response(&state, &e),
    }
}

pub(super) async fn retry_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let imports = state.imports.clone();
    match blocking(move || imports.retry(id.parse()?)).await {
        Ok(job) => Json(job).into_response(),
        Err(e) => error_response(&state, &e),
    }
}

pub(super) async fn download_original(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let imports = state.imports.clone();
    match blocking(move || imports.download_original(id.parse()?)).await {
        Ok(download) => attachment(download),
        Err(e) => error_response(&state, &e),
    }
}

pub(super) async fn download_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let imports = state.imports.clone();
    match blocking(move || imports.download_result(id.parse()?)).await {
        Ok(download) => attachment(download),
        Err(e) => error_response(&state, &e),
    }
}

pub(super) async fn download_template(
    State(state): State<AppState>,
    Path((name, file)): Path<(String, String)>,
) -> Response {
    let Some(extension) = file.strip_prefix(TEMPLATE_FILE_PREFIX).map(str::to_string) else {
        return error_response(&state, &Error::not_found("template file", file));
    };

    let imports = state.imports.clone();
    match blocking(move || imports.download_template(&name, &extension)).await {
        Ok(template) => {
            let disposition = template.content_disposition();
            (
                [
                    (header::CONTENT_TYPE, header_value(template.content_type)),
                    (header::CACHE_CONTROL, header_value(template.cache_control)),
                    (header::CONTENT_DISPOSITION, header_value(&disposition)),
                ],
                template.bytes,
            )
                .into_response()
        },
        Err(e) => error_response(&state, &e),
    }
}

/// Runs a blocking service call on the blocking pool.
///
/// # Errors
///
/// Returns the call's own error, or [`Error::Internal`] if the task panicked
/// or was cancelled.
async fn blocking<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| Error::internal("blocking_task", e))?
}

fn attachment(download: Download) -> Response {
    let disposition = format!("attachment;filename=\"{}\"", download.filename);
    (
        [
            (header::CONTENT_TYPE, header_value(download.content_type)),
            (header::CONTENT_DISPOSITION, header_value(&disposition)),
        ],
        download.bytes,
    )
        .into_response()
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
}

/// Converts an error into a JSON response with a translated message.
///
/// The status follows [`Error::status_code`]; causes of internal failures are
/// logged, never returned.
pub fn error_response(state: &AppState, error: &Error) -> Response {
    let (key, format, reason) = match error {
        Error::NotFound { .. } => ("import.not_found", "", String::new()),
        Error::UnsupportedFormat(format) => {
            ("import.invalid_format", format.as_str(), String::new())
        },
        Error::AccessDenied(_) => ("import.access_denied", "", String::new()),
        Error::InvalidInput(reason) => ("import.invalid_input", "", reason.clone()),
        Error::OperationFailed { .. } | Error::Internal { .. } => {
            ("import.error", "", String::new())
        },
    };
    let message = state.translator.trans(
        key,
        &[("format", format), ("reason", reason.as_str())],
        Some(EXCEPTIONS_DOMAIN),
    );

    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(error = %error, "Import request failed");
    } else {
        tracing::debug!(error = %error, status = status.as_u16(), "Import request rejected");
    }

    (
        status,
        Json(serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
            }
        })),
    )
        .into_response()
}
