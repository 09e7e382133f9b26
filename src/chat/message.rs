use crate::ToolCall;

/// Role of a participant in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// System instructions shaping the model's behavior
    System,
    /// The user/human participant in the conversation
    User,
    /// The AI assistant participant in the conversation
    Assistant,
    /// The result of a tool invocation, fed back to the model
    Tool,
}

impl ChatRole {
    /// Role name as serialized into the provider's query string.
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }
}

/// The type of a message in a chat conversation.
#[derive(Debug, Clone, Default)]
pub enum MessageType {
    /// A text message
    #[default]
    Text,
    /// An assistant turn that requested tool invocations
    ToolUse(Vec<ToolCall>),
    /// Tool output, tied to the calls that produced it
    ToolResult(Vec<ToolCall>),
}

/// A single message in a chat conversation.
///
/// Owned by the caller; the adapter only ever borrows it.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// The role of who sent this message
    pub role: ChatRole,
    /// The type of the message (text or tool traffic)
    pub message_type: MessageType,
    /// The text content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new builder for a system message
    pub fn system() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::System)
    }

    /// Create a new builder for a user message
    pub fn user() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::User)
    }

    /// Create a new builder for an assistant message
    pub fn assistant() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::Assistant)
    }

    /// Create a new builder for a tool-result message
    pub fn tool() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::Tool)
    }

    /// Tool calls attached to this message, if any.
    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        match &self.message_type {
            MessageType::ToolUse(calls) | MessageType::ToolResult(calls) => Some(calls),
            MessageType::Text => None,
        }
    }
}

/// Builder for ChatMessage
#[derive(Debug)]
pub struct ChatMessageBuilder {
    role: ChatRole,
    message_type: MessageType,
    content: String,
}

impl ChatMessageBuilder {
    /// Create a new ChatMessageBuilder with specified role
    pub fn new(role: ChatRole) -> Self {
        Self {
            role,
            message_type: MessageType::default(),
            content: String::new(),
        }
    }

    /// Set the message content
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the message type as ToolUse
    pub fn tool_use(mut self, calls: Vec<ToolCall>) -> Self {
        self.message_type = MessageType::ToolUse(calls);
        self
    }

    /// Set the message type as ToolResult
    pub fn tool_result(mut self, calls: Vec<ToolCall>) -> Self {
        self.message_type = MessageType::ToolResult(calls);
        self
    }

    /// Build the ChatMessage
    pub fn build(self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            message_type: self.message_type,
            content: self.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_role_and_content() {
        let msg = ChatMessage::user().content("hello").build();
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.content, "hello");
        assert!(msg.tool_calls().is_none());
    }

    #[test]
    fn tool_use_attaches_calls() {
        let call = ToolCall {
            id: "call_1".into(),
            call_type: "tool_call".into(),
            name: "add".into(),
            args: serde_json::json!({"a": 1}),
        };
        let msg = ChatMessage::assistant().tool_use(vec![call]).build();
        assert_eq!(msg.tool_calls().map(|c| c.len()), Some(1));
    }

    #[test]
    fn provider_role_names() {
        assert_eq!(ChatRole::User.as_provider_str(), "user");
        assert_eq!(ChatRole::Assistant.as_provider_str(), "assistant");
        assert_eq!(ChatRole::System.as_provider_str(), "system");
        assert_eq!(ChatRole::Tool.as_provider_str(), "tool");
    }
}
