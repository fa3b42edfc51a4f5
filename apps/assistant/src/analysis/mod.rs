// Job/CV analysis: prompt construction and the extraction → prompt → stream pipeline.
// All model calls go through llm_client::CompletionBackend.

pub mod pipeline;
pub mod prompts;
