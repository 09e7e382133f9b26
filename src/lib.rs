//! Dify adapter exposing conventional chat and tool-call abstractions.
//!
//! Dify's chat-messages endpoint accepts a single opaque `query` string per
//! call and has no native function calling. This crate serializes the whole
//! conversation history into that string, and layers a synthetic tool-call
//! protocol on top: tool schemas are injected through `inputs.tools` together
//! with a fixed instruction block, and calls are recovered by parsing the
//! model's answer as a `tool_calls` JSON envelope.
//!
//! ```no_run
//! use dify_llm::backends::dify::{Dify, DifySession};
//! use dify_llm::chat::{ChatMessage, ChatResponse};
//!
//! # async fn run() -> Result<(), dify_llm::error::DifyError> {
//! let client = Dify::new(Some("app-xxxxxxxx".into()), "alice", None, false, None)?;
//! let mut session = DifySession::new();
//! let messages = vec![ChatMessage::user().content("Why is the sky blue?").build()];
//! let response = client.chat_in(&mut session, &messages, None).await?;
//! println!("{}", response.text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod backends;
pub mod chat;
pub mod error;

pub use chat::{
    ChatMessage, ChatMessageBuilder, ChatProvider, ChatResponse, ChatRole, FunctionTool,
    MessageType, ParameterProperty, ParametersSchema, StreamDelta, Tool,
};
pub use error::DifyError;

/// A tool call recovered from model output.
///
/// The provider never emits these natively; they are parsed out of the
/// model's answer text by the tool-call protocol layer. `args` holds the
/// fully parsed argument object, not the wire-level JSON string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Model-generated identifier, e.g. `call_a1b2c3`
    pub id: String,
    /// Always `"tool_call"`
    #[serde(rename = "type")]
    pub call_type: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Parsed JSON arguments
    pub args: serde_json::Value,
}

/// Initialize env_logger for diagnostics when the `logging` feature is on.
#[cfg(feature = "logging")]
pub fn init_logging() {
    let _ = env_logger::try_init();
}
