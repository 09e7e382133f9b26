//! Blocking-mode response decoding.

use serde::Deserialize;

use crate::chat::ChatResponse;
use crate::error::DifyError;
use crate::ToolCall;

use super::tool_protocol::parse_tool_calls;

/// Raw HTTP outcome of a blocking call, before the salvage policy runs.
pub(crate) struct RawReply {
    pub status: reqwest::StatusCode,
    pub body: String,
}

#[derive(Deserialize, Debug)]
struct DifyBlockingBody {
    answer: Option<String>,
    conversation_id: Option<String>,
    id: Option<String>,
}

/// The model's answer, classified by the tool-call protocol layer.
#[derive(Debug, Clone)]
pub enum AnswerPayload {
    /// A natural-language answer
    Plain(String),
    /// A recovered tool-call request; the message text is empty
    ToolCalls(Vec<ToolCall>),
}

/// Decoded blocking response.
#[derive(Debug)]
pub struct DifyChatResponse {
    /// Message id assigned by Dify
    pub id: Option<String>,
    /// Conversation id reported by Dify, absent when the response omitted it
    pub conversation_id: Option<String>,
    /// The classified answer
    pub payload: AnswerPayload,
}

fn usable_body(body: DifyBlockingBody) -> Option<DifyBlockingBody> {
    match body.answer.as_deref() {
        Some(answer) if !answer.is_empty() => Some(body),
        _ => None,
    }
}

/// Apply the salvage policy and classify the answer.
///
/// Dify quirk, preserved deliberately: some error statuses still ship a
/// complete `answer` in the body, and those decode as success. This is
/// provider-specific tolerance, not general HTTP semantics. A non-success
/// status without a usable answer fails with the raw body attached; a
/// success status without one is a format error.
pub(crate) fn decode_blocking(reply: RawReply) -> Result<DifyChatResponse, DifyError> {
    let body = serde_json::from_str::<DifyBlockingBody>(&reply.body)
        .ok()
        .and_then(usable_body);

    let Some(body) = body else {
        if reply.status.is_success() {
            return Err(DifyError::ResponseFormatError {
                message: "Dify response carried no usable answer".to_string(),
                raw_response: reply.body,
            });
        }
        return Err(DifyError::ProviderError {
            status: reply.status.as_u16(),
            body: reply.body,
        });
    };

    let answer = body.answer.unwrap_or_default();
    Ok(DifyChatResponse {
        id: body.id,
        conversation_id: body.conversation_id.filter(|id| !id.is_empty()),
        payload: classify_answer(answer),
    })
}

fn classify_answer(answer: String) -> AnswerPayload {
    // A malformed envelope is not an error: the model simply answered in
    // prose, or botched the protocol, and the caller gets the raw text.
    match parse_tool_calls(&answer) {
        Ok(calls) if !calls.is_empty() => AnswerPayload::ToolCalls(calls),
        _ => AnswerPayload::Plain(answer),
    }
}

impl std::fmt::Display for DifyChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.payload {
            AnswerPayload::Plain(text) => write!(f, "{text}"),
            AnswerPayload::ToolCalls(calls) => write!(f, "{calls:?}"),
        }
    }
}

impl ChatResponse for DifyChatResponse {
    fn text(&self) -> Option<String> {
        match &self.payload {
            AnswerPayload::Plain(text) => Some(text.clone()),
            AnswerPayload::ToolCalls(_) => None,
        }
    }

    fn tool_calls(&self) -> Option<Vec<ToolCall>> {
        match &self.payload {
            AnswerPayload::ToolCalls(calls) => Some(calls.clone()),
            AnswerPayload::Plain(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    fn reply(status: u16, body: &str) -> RawReply {
        RawReply {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn plain_answer_decodes_to_text() {
        let body = json!({
            "answer": "The sky is blue because of Rayleigh scattering.",
            "conversation_id": "conv-1",
            "id": "msg-1"
        })
        .to_string();

        let response = decode_blocking(reply(200, &body)).unwrap();
        assert_eq!(
            response.text().as_deref(),
            Some("The sky is blue because of Rayleigh scattering.")
        );
        assert!(response.tool_calls().is_none());
        assert_eq!(response.conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(response.id.as_deref(), Some("msg-1"));
    }

    #[test]
    fn tool_call_envelope_decodes_to_calls_with_empty_text() {
        let envelope =
            r#"{"tool_calls":[{"id":"call_1","function":{"name":"add","arguments":"{\"a\":1,\"b\":2}"}}]}"#;
        let body = json!({"answer": envelope, "conversation_id": "conv-2", "id": "msg-2"})
            .to_string();

        let response = decode_blocking(reply(200, &body)).unwrap();
        assert!(response.text().is_none());
        let calls = response.tool_calls().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "add");
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].args, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn json_answer_without_tool_calls_is_plain_text() {
        let answer = r#"{"role":"assistant","content":"hello"}"#;
        let body = json!({"answer": answer}).to_string();

        let response = decode_blocking(reply(200, &body)).unwrap();
        assert_eq!(response.text().as_deref(), Some(answer));
    }

    #[test]
    fn malformed_envelope_falls_back_to_plain_text() {
        let answer = r#"{"tool_calls":[{"id":"call_1"}]}"#;
        let body = json!({"answer": answer}).to_string();

        let response = decode_blocking(reply(200, &body)).unwrap();
        assert_eq!(response.text().as_deref(), Some(answer));
        assert!(response.tool_calls().is_none());
    }

    #[test]
    fn error_status_with_usable_answer_is_salvaged() {
        let body = json!({"answer": "still here", "conversation_id": "conv-3"}).to_string();

        let response = decode_blocking(reply(500, &body)).unwrap();
        assert_eq!(response.text().as_deref(), Some("still here"));
    }

    #[test]
    fn error_status_with_unparsable_body_fails() {
        let err = decode_blocking(reply(502, "<html>bad gateway</html>")).unwrap_err();
        match err {
            DifyError::ProviderError { status, body } => {
                assert_eq!(status, 502);
                assert!(body.contains("bad gateway"));
            }
            other => panic!("expected ProviderError, got {other:?}"),
        }
    }

    #[test]
    fn error_status_with_empty_answer_fails() {
        let body = json!({"answer": "", "conversation_id": "conv-4"}).to_string();
        assert!(matches!(
            decode_blocking(reply(400, &body)),
            Err(DifyError::ProviderError { status: 400, .. })
        ));
    }

    #[test]
    fn success_without_answer_is_a_format_error() {
        let body = json!({"conversation_id": "conv-5"}).to_string();
        assert!(matches!(
            decode_blocking(reply(200, &body)),
            Err(DifyError::ResponseFormatError { .. })
        ));
    }

    #[test]
    fn empty_conversation_id_is_cleared() {
        let body = json!({"answer": "hi", "conversation_id": ""}).to_string();
        let response = decode_blocking(reply(200, &body)).unwrap();
        assert!(response.conversation_id.is_none());
    }
}
