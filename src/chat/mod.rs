//! Chat model boundary
//!
//! Mirrors the transcription boundary: the pipeline talks to a `ChatModel`
//! trait and production wires in the OpenAI chat-completions client.

mod openai;

use std::future::Future;

pub use openai::{ChatClient, ChatError};

use crate::compose::ComposedPrompt;

/// One composed prompt in, response text out.
pub trait ChatModel: Send + Sync + 'static {
    fn complete(
        &self,
        prompt: &ComposedPrompt,
    ) -> impl Future<Output = Result<String, ChatError>> + Send;
}
