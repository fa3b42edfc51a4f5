//! Scripted `CompletionBackend` for pipeline and route tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use super::{CompletionBackend, DeltaStream, LlmError};
use crate::analysis::prompts::PromptPair;

#[derive(Debug, Clone)]
pub enum Script {
    /// Yields each delta, then ends.
    Deltas(Vec<&'static str>),
    /// Fails before any stream exists.
    OpenFailure { status: u16, message: &'static str },
    /// Yields the deltas, then one mid-stream error.
    BreaksAfter(Vec<&'static str>),
}

pub struct ScriptedBackend {
    script: Script,
    opened: AtomicUsize,
    last_prompt: Mutex<Option<PromptPair>>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            opened: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Number of `open_stream` calls made so far.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<PromptPair> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn open_stream(&self, prompt: &PromptPair) -> Result<DeltaStream, LlmError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());

        match &self.script {
            Script::Deltas(deltas) => {
                let items: Vec<Result<String, LlmError>> =
                    deltas.iter().map(|d| Ok(d.to_string())).collect();
                Ok(stream::iter(items).boxed())
            }
            Script::OpenFailure { status, message } => Err(LlmError::Api {
                status: *status,
                message: message.to_string(),
            }),
            Script::BreaksAfter(deltas) => {
                let mut items: Vec<Result<String, LlmError>> =
                    deltas.iter().map(|d| Ok(d.to_string())).collect();
                items.push(Err(LlmError::Api {
                    status: 200,
                    message: "connection reset".to_string(),
                }));
                Ok(stream::iter(items).boxed())
            }
        }
    }
}
