/// One incremental content delta from a streaming response.
///
/// Delta texts concatenate in receipt order into the same final text the
/// blocking path would produce for an equivalent complete answer. Each delta
/// carries the conversation id of the event it came from so the caller can
/// thread it into a session (see `DifySession::absorb`).
#[derive(Debug, Clone)]
pub struct StreamDelta {
    /// The incremental answer text. Empty when the event only carried
    /// conversation state, as Dify's terminal `message_end` event does.
    pub text: String,
    /// Conversation id reported by the event, if any
    pub conversation_id: Option<String>,
}
