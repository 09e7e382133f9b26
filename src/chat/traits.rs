use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use crate::error::DifyError;
use crate::ToolCall;

use super::message::ChatMessage;
use super::stream::StreamDelta;
use super::tool::Tool;

/// A normalized chat response: plain text, or empty text plus tool calls.
pub trait ChatResponse: std::fmt::Debug + std::fmt::Display + Send + Sync {
    fn text(&self) -> Option<String>;
    fn tool_calls(&self) -> Option<Vec<ToolCall>>;
}

/// Trait for providers that support chat-style interactions.
#[async_trait]
pub trait ChatProvider: Sync + Send {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, DifyError> {
        self.chat_with_tools(messages, None).await
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<Box<dyn ChatResponse>, DifyError>;

    /// Stream content deltas for a tool-free conversation.
    ///
    /// There is no streaming-with-tools variant: tool calls are recovered by
    /// parsing the complete answer text, which only exists once the response
    /// has been fully received.
    async fn chat_stream(
        &self,
        _messages: &[ChatMessage],
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamDelta, DifyError>> + Send>>, DifyError>
    {
        Err(DifyError::Generic(
            "Streaming not supported for this provider".to_string(),
        ))
    }
}
