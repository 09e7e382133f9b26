//! Dify chat-messages API client.
//!
//! Dify accepts one opaque query string per call, so the whole message
//! history is serialized into the request; tool calling is synthetic (see
//! `tool_protocol`). Streaming and tool calling are mutually exclusive:
//! calls are recovered by parsing the complete answer text, which does not
//! exist until the response has been fully received.

mod request;
mod response;
mod stream;
mod tool_protocol;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;

use crate::chat::{ChatMessage, ChatProvider, ChatResponse, StreamDelta, Tool};
use crate::error::DifyError;

use request::{build_chat_request, DifyChatRequest, ResponseMode};
use response::{decode_blocking, RawReply};
use stream::create_delta_stream;

pub use response::{AnswerPayload, DifyChatResponse};

const DEFAULT_BASE_URL: &str = "https://api.dify.ai/v1/chat-messages";
const API_KEY_ENV: &str = "DIFY_API_KEY";

/// Configuration for the Dify client.
#[derive(Debug)]
pub struct DifyConfig {
    /// API key for authentication with Dify
    pub api_key: String,
    /// End-user identifier forwarded to Dify on every call
    pub user: String,
    /// Full chat-messages endpoint URL
    pub base_url: String,
    /// Whether tool-free calls should stream
    pub stream: bool,
    /// Request timeout in seconds
    pub timeout_seconds: Option<u64>,
}

/// Caller-owned conversation state.
///
/// The adapter itself is stateless: each blocking call overwrites (or
/// clears) the session's conversation id, and each streaming delta carries
/// the id for the caller to `absorb`. Concurrent isolated conversations use
/// separate sessions, not separate clients.
#[derive(Debug, Clone, Default)]
pub struct DifySession {
    conversation_id: Option<String>,
}

impl DifySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation id of the most recently processed response, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Thread a streaming delta's conversation id into this session.
    pub fn absorb(&mut self, delta: &StreamDelta) {
        self.conversation_id = delta.conversation_id.clone();
    }

    fn observe(&mut self, id: Option<&str>) {
        self.conversation_id = id.filter(|id| !id.is_empty()).map(str::to_owned);
    }
}

/// Client for the Dify chat-messages API.
///
/// The client uses `Arc` internally for configuration, making cloning cheap.
#[derive(Debug, Clone)]
pub struct Dify {
    /// Shared configuration wrapped in Arc for cheap cloning
    pub config: Arc<DifyConfig>,
    /// HTTP client for making requests
    pub client: Client,
}

impl Dify {
    /// Creates a new Dify client.
    ///
    /// The API key falls back to the `DIFY_API_KEY` environment variable;
    /// absence of both is an immediate error, no network attempt is made.
    pub fn new(
        api_key: Option<String>,
        user: impl Into<String>,
        base_url: Option<String>,
        streaming: bool,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, DifyError> {
        let mut builder = Client::builder();
        if let Some(sec) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(sec));
        }
        let client = builder
            .build()
            .map_err(|e| DifyError::HttpError(e.to_string()))?;
        Self::with_client(client, api_key, user, base_url, streaming, timeout_seconds)
    }

    /// Creates a new Dify client with a custom HTTP client.
    pub fn with_client(
        client: Client,
        api_key: Option<String>,
        user: impl Into<String>,
        base_url: Option<String>,
        streaming: bool,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, DifyError> {
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| {
                DifyError::AuthError(format!(
                    "Dify API key not found. Set the {API_KEY_ENV} environment variable or pass the key explicitly."
                ))
            })?;

        Ok(Self {
            config: Arc::new(DifyConfig {
                api_key,
                user: user.into(),
                base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                stream: streaming,
                timeout_seconds,
            }),
            client,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    pub fn user(&self) -> &str {
        &self.config.user
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn streaming(&self) -> bool {
        self.config.stream
    }

    pub fn timeout_seconds(&self) -> Option<u64> {
        self.config.timeout_seconds
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn allow_stream(&self, tools: Option<&[Tool]>) -> bool {
        self.config.stream && tools.map_or(true, |tools| tools.is_empty())
    }

    fn response_mode(&self, tools: Option<&[Tool]>) -> ResponseMode {
        if self.allow_stream(tools) {
            ResponseMode::Streaming
        } else {
            ResponseMode::Blocking
        }
    }

    async fn post_chat(&self, body: &DifyChatRequest<'_>) -> Result<reqwest::Response, DifyError> {
        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(body) {
                log::trace!("Dify request payload: {json}");
            }
        }

        let mut request = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.config.api_key)
            .json(body);

        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(Duration::from_secs(timeout));
        }

        let resp = request.send().await?;

        log::debug!("Dify HTTP status: {}", resp.status());

        Ok(resp)
    }

    /// Sends a chat request, threading conversation state through `session`.
    ///
    /// When the client is configured for streaming and no tools are bound,
    /// the stream is drained and its deltas concatenated into the final
    /// message; otherwise one blocking round-trip is made.
    pub async fn chat_in(
        &self,
        session: &mut DifySession,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<DifyChatResponse, DifyError> {
        if self.allow_stream(tools) {
            return self.aggregate_stream(session, messages).await;
        }

        let body = build_chat_request(
            &self.config.user,
            messages,
            tools,
            self.response_mode(tools),
        )?;
        let resp = self.post_chat(&body).await?;
        let status = resp.status();
        let text = resp.text().await?;

        let response = decode_blocking(RawReply { status, body: text })?;
        session.observe(response.conversation_id.as_deref());
        Ok(response)
    }

    /// Opens a streaming chat request and returns its content-delta stream.
    ///
    /// Always streaming mode; tools cannot be bound on this path. The stream
    /// is finite, forward-only and not restartable. Dropping it abandons the
    /// underlying connection.
    pub async fn stream_in(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamDelta, DifyError>> + Send>>, DifyError>
    {
        let body = build_chat_request(&self.config.user, messages, None, ResponseMode::Streaming)?;
        let resp = self.post_chat(&body).await?;
        Ok(create_delta_stream(resp))
    }

    async fn aggregate_stream(
        &self,
        session: &mut DifySession,
        messages: &[ChatMessage],
    ) -> Result<DifyChatResponse, DifyError> {
        let mut stream = self.stream_in(messages).await?;

        let mut text = String::new();
        let mut saw_content = false;
        while let Some(delta) = stream.next().await {
            let delta = delta?;
            session.absorb(&delta);
            // Text-less deltas only carry conversation state and do not
            // count as an answer.
            saw_content |= !delta.text.is_empty();
            text.push_str(&delta.text);
        }

        if !saw_content {
            return Err(DifyError::Generic(
                "No chunks returned from the Dify API".to_string(),
            ));
        }

        Ok(DifyChatResponse {
            id: None,
            conversation_id: session.conversation_id().map(str::to_owned),
            payload: AnswerPayload::Plain(text),
        })
    }
}

#[async_trait]
impl ChatProvider for Dify {
    /// Sends a chat request with optional tools, using a throwaway session.
    ///
    /// Callers that need conversation continuity should use [`Dify::chat_in`]
    /// with an explicit [`DifySession`].
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<Box<dyn ChatResponse>, DifyError> {
        let mut session = DifySession::new();
        let response = self.chat_in(&mut session, messages, tools).await?;
        Ok(Box::new(response))
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamDelta, DifyError>> + Send>>, DifyError>
    {
        self.stream_in(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(streaming: bool) -> Dify {
        Dify::new(Some("app-test".into()), "alice", None, streaming, None).unwrap()
    }

    fn some_tools() -> Vec<Tool> {
        vec![Tool::function("add", "Add numbers", json!({"type": "object"}))]
    }

    #[test]
    fn tools_force_blocking_mode_even_when_streaming_configured() {
        let dify = client(true);
        let tools = some_tools();
        assert_eq!(dify.response_mode(Some(&tools)), ResponseMode::Blocking);
    }

    #[test]
    fn streaming_configured_without_tools_streams() {
        let dify = client(true);
        assert_eq!(dify.response_mode(None), ResponseMode::Streaming);
        assert_eq!(dify.response_mode(Some(&[])), ResponseMode::Streaming);
    }

    #[test]
    fn blocking_configured_never_streams() {
        let dify = client(false);
        assert_eq!(dify.response_mode(None), ResponseMode::Blocking);
    }

    #[test]
    fn missing_api_key_fails_at_construction() {
        // No explicit key, and the fallback variable must not leak in from
        // the test environment.
        std::env::remove_var(API_KEY_ENV);
        let err = Dify::new(None, "alice", None, false, None).unwrap_err();
        assert!(matches!(err, DifyError::AuthError(_)));
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        std::env::remove_var(API_KEY_ENV);
        let err = Dify::new(Some(String::new()), "alice", None, false, None).unwrap_err();
        assert!(matches!(err, DifyError::AuthError(_)));
    }

    #[test]
    fn default_base_url_applies() {
        let dify = client(false);
        assert_eq!(dify.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn session_absorbs_and_clears_conversation_id() {
        let mut session = DifySession::new();
        assert!(session.conversation_id().is_none());

        session.absorb(&StreamDelta {
            text: "hi".into(),
            conversation_id: Some("conv-1".into()),
        });
        assert_eq!(session.conversation_id(), Some("conv-1"));

        session.absorb(&StreamDelta {
            text: "again".into(),
            conversation_id: None,
        });
        assert!(session.conversation_id().is_none());

        session.observe(Some("conv-2"));
        assert_eq!(session.conversation_id(), Some("conv-2"));
        session.observe(Some(""));
        assert!(session.conversation_id().is_none());
    }
}
