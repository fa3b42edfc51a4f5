//! POST /api/v1/analyze — runs the pipeline and streams snapshots as server-sent events.
//!
//! Event sequence: zero or more `snapshot` events, at most one terminal `error` event,
//! then always `done`. Each snapshot carries the full answer so far, not a delta.

use std::convert::Infallible;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::future::ready;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::pipeline::{run_analysis, PipelineOutcome};
use crate::errors::PipelineError;
use crate::render::render_markdown;
use crate::state::AppState;

const JOB_TEXT_FIELD: &str = "job_text";
const CV_FILE_FIELD: &str = "cv_file";

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

/// One form submission. The spooled CV file is deleted when this is dropped.
struct Submission {
    job_text: String,
    cv_file: Option<NamedTempFile>,
}

pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Sse<EventStream> {
    let request_id = Uuid::new_v4();
    let span = info_span!("analyze", %request_id);

    let outcome = async {
        info!("Analysis requested");
        let multipart = match multipart {
            Ok(m) => m,
            Err(e) => return PipelineOutcome::Failure(PipelineError::Unexpected(e.body_text())),
        };
        match read_submission(multipart, state.config.max_upload_bytes).await {
            Ok(submission) => {
                let cv_path = submission.cv_file.as_ref().map(|f| f.path());
                run_analysis(&submission.job_text, cv_path, state.completions.as_ref()).await
            }
            Err(e) => PipelineOutcome::Failure(e),
        }
    }
    .instrument(span)
    .await;

    Sse::new(render_events(outcome)).keep_alive(KeepAlive::default())
}

async fn read_submission(
    mut multipart: Multipart,
    upload_limit: usize,
) -> Result<Submission, PipelineError> {
    let mut submission = Submission {
        job_text: String::new(),
        cv_file: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error(e, upload_limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            JOB_TEXT_FIELD => {
                submission.job_text = field
                    .text()
                    .await
                    .map_err(|e| form_error(e, upload_limit))?;
            }
            CV_FILE_FIELD => {
                // Browsers send an empty, unnamed part when no file was chosen
                let has_file_name = field.file_name().is_some_and(|n| !n.is_empty());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| form_error(e, upload_limit))?;
                if has_file_name && !bytes.is_empty() {
                    submission.cv_file = Some(spool_upload(&bytes).await?);
                }
            }
            _ => {}
        }
    }

    Ok(submission)
}

fn form_error(error: MultipartError, upload_limit: usize) -> PipelineError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PipelineError::Unexpected(format!(
            "upload exceeds the {upload_limit} byte limit ({})",
            error.body_text()
        ))
    } else {
        PipelineError::Unexpected(format!("invalid form data: {}", error.body_text()))
    }
}

async fn spool_upload(bytes: &[u8]) -> Result<NamedTempFile, PipelineError> {
    let file = tempfile::Builder::new()
        .prefix("cv-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| PipelineError::Unexpected(format!("could not store upload: {e}")))?;
    tokio::fs::write(file.path(), bytes)
        .await
        .map_err(|e| PipelineError::Unexpected(format!("could not store upload: {e}")))?;
    Ok(file)
}

fn render_events(outcome: PipelineOutcome) -> EventStream {
    let done = stream::once(ready(Ok::<_, Infallible>(
        Event::default().event("done").data(""),
    )));

    match outcome {
        PipelineOutcome::Success(snapshots) => snapshots
            .map(|item| {
                Ok::<_, Infallible>(match item {
                    Ok(text) => snapshot_event(&text),
                    Err(e) => error_event(&e),
                })
            })
            .chain(done)
            .boxed(),
        PipelineOutcome::Failure(e) => stream::once(ready(Ok(error_event(&e))))
            .chain(done)
            .boxed(),
    }
}

fn snapshot_event(markdown: &str) -> Event {
    let body = json!({
        "markdown": markdown,
        "html": render_markdown(markdown),
    });
    Event::default().event("snapshot").data(body.to_string())
}

fn error_event(error: &PipelineError) -> Event {
    match error {
        PipelineError::MissingInput => debug!("Rejected submission: missing input"),
        PipelineError::Extraction(e) => warn!("Extraction error: {e}"),
        PipelineError::RemoteApi(e) => error!("LLM error: {e}"),
        PipelineError::Unexpected(msg) => error!("Unexpected error: {msg}"),
    }

    let mut body = error.to_json();
    body["html"] = render_markdown(&error.user_message()).into();
    Event::default().event("error").data(body.to_string())
}
