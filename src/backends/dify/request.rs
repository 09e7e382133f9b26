//! Request assembly for the Dify chat-messages endpoint.
//!
//! Dify accepts a single opaque `query` string per call, not a structured
//! message list, so the whole conversation history is serialized as a JSON
//! array of `{role, content, tool_calls?}` objects and sent as that string.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::chat::{ChatMessage, ChatRole, MessageType, Tool};
use crate::error::DifyError;
use crate::ToolCall;

use super::tool_protocol::TOOL_CALL_INSTRUCTION;

/// Response mode requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// One complete JSON response per call
    Blocking,
    /// Newline-delimited JSON events over one response body
    Streaming,
}

/// Request payload for the chat-messages endpoint.
#[derive(Serialize, Debug)]
pub struct DifyChatRequest<'a> {
    pub response_mode: ResponseMode,
    pub user: &'a str,
    /// Free-form inputs map; carries the tool instruction text under
    /// `tools` when tools are bound
    pub inputs: Map<String, Value>,
    /// The entire conversation history as a JSON-encoded array
    pub query: String,
}

#[derive(Serialize)]
struct QueryMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<&'a [ToolCall]>,
}

/// Build the provider request from a message history and optional bound
/// tools. Pure transform over caller-supplied state.
pub(crate) fn build_chat_request<'a>(
    user: &'a str,
    messages: &'a [ChatMessage],
    tools: Option<&[Tool]>,
    mode: ResponseMode,
) -> Result<DifyChatRequest<'a>, DifyError> {
    let mut inputs = Map::new();
    if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
        let schema = serde_json::to_string(tools)?;
        inputs.insert(
            "tools".to_string(),
            Value::String(format!("{TOOL_CALL_INSTRUCTION}{schema}")),
        );
    }

    let entries: Vec<QueryMessage> = messages
        .iter()
        .map(|msg| QueryMessage {
            role: msg.role.as_provider_str(),
            content: &msg.content,
            // Prior assistant tool calls are echoed back for context.
            tool_calls: match (&msg.role, &msg.message_type) {
                (ChatRole::Assistant, MessageType::ToolUse(calls)) => Some(calls.as_slice()),
                _ => None,
            },
        })
        .collect();

    Ok(DifyChatRequest {
        response_mode: mode,
        user,
        inputs,
        query: serde_json::to_string(&entries)?,
    })
}
