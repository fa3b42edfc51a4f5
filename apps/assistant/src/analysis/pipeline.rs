//! Analysis pipeline — guard → extract → build prompt → open stream → accumulate.
//!
//! Nothing is sent to the model unless every earlier step succeeded. The outcome is an
//! explicit `PipelineOutcome`; callers match on it rather than catching errors.

use std::path::Path;

use futures_util::future::ready;
use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info};

use crate::analysis::prompts::build_prompt;
use crate::errors::PipelineError;
use crate::extractor::extract_text_blocking;
use crate::llm_client::{CompletionBackend, DeltaStream};

/// Cumulative response text so far. An `Err` is always the last item.
pub type SnapshotStream = BoxStream<'static, Result<String, PipelineError>>;

pub enum PipelineOutcome {
    /// The model stream was opened; snapshots follow.
    Success(SnapshotStream),
    /// Stopped before any stream was opened.
    Failure(PipelineError),
}

impl PipelineOutcome {
    /// Flattens the outcome into the plain sequence of strings shown to the user.
    /// A failure is exactly one string.
    pub fn into_messages(self) -> BoxStream<'static, String> {
        match self {
            PipelineOutcome::Success(snapshots) => snapshots
                .map(|item| match item {
                    Ok(text) => text,
                    Err(e) => e.user_message(),
                })
                .boxed(),
            PipelineOutcome::Failure(e) => stream::once(ready(e.user_message())).boxed(),
        }
    }
}

/// Runs one analysis for a job description and an optional uploaded CV file.
pub async fn run_analysis(
    job_text: &str,
    cv_path: Option<&Path>,
    backend: &dyn CompletionBackend,
) -> PipelineOutcome {
    match open_analysis(job_text, cv_path, backend).await {
        Ok(deltas) => PipelineOutcome::Success(accumulate(deltas)),
        Err(e) => PipelineOutcome::Failure(e),
    }
}

async fn open_analysis(
    job_text: &str,
    cv_path: Option<&Path>,
    backend: &dyn CompletionBackend,
) -> Result<DeltaStream, PipelineError> {
    if job_text.is_empty() {
        return Err(PipelineError::MissingInput);
    }
    let cv_path = cv_path.ok_or(PipelineError::MissingInput)?;

    let cv_text = extract_text_blocking(cv_path.to_path_buf()).await?;
    if cv_text.is_empty() {
        debug!("CV has no extractable text");
        return Err(PipelineError::MissingInput);
    }
    info!(
        "Extracted CV text: {} chars, job description: {} chars",
        cv_text.len(),
        job_text.len()
    );

    let prompt = build_prompt(job_text, &cv_text);
    let deltas = backend.open_stream(&prompt).await?;
    info!("Analysis stream opened");

    Ok(deltas)
}

/// Converts content deltas into cumulative snapshots.
/// The last successful snapshot equals the concatenation of every delta.
pub fn accumulate(deltas: DeltaStream) -> SnapshotStream {
    deltas
        .scan((String::new(), false), |(buffer, failed), item| {
            if *failed {
                return ready(None);
            }
            let next = match item {
                Ok(delta) => {
                    buffer.push_str(&delta);
                    Ok(buffer.clone())
                }
                Err(e) => {
                    *failed = true;
                    Err(PipelineError::Unexpected(e.to_string()))
                }
            };
            ready(Some(next))
        })
        .boxed()
}
