//! Synthetic tool-call protocol.
//!
//! Dify has no native function calling. When tools are bound, a fixed
//! instruction block plus the tool schema JSON is injected through
//! `inputs.tools`, directing the model to answer with a single JSON object
//! carrying a `tool_calls` array. Calls are then recovered by parsing the
//! answer text. If the provider ever gains native tool support, this module
//! is the only thing that needs replacing.

use serde::Deserialize;

use crate::ToolCall;

/// Instruction block transmitted verbatim ahead of the tool schema JSON.
pub(crate) const TOOL_CALL_INSTRUCTION: &str = r#"
You must follow OpenAI's function calling protocol strictly.

- If you need to call a tool, output ONLY a JSON object matching the OpenAI assistant message format with "tool_calls".
- The "arguments" field must be a STRING containing valid JSON (escaped properly).
- Generate a random unique "id" like "call_xxx" (e.g., "call_w9f3k2").
- NEVER add natural language, markdown, or extra fields.
- If no tool is needed, respond normally with natural language.

Example correct output of tool call:
{"role": "assistant", "tool_calls": [{"id": "call_a1b2c3", "type": "function", "function": {"name": "add", "arguments": "{"a": 5, "b": 3}"}}]}

Follow are tools available to you:
"#;

#[derive(Deserialize)]
struct ToolCallEnvelope {
    #[serde(default)]
    tool_calls: Vec<RawToolCall>,
}

#[derive(Deserialize)]
struct RawToolCall {
    id: String,
    function: RawFunction,
}

#[derive(Deserialize)]
struct RawFunction {
    name: String,
    arguments: String,
}

/// Parse an answer string as a tool-call envelope.
///
/// All-or-nothing per response: any entry missing its required shape, or
/// carrying an `arguments` string that is not itself valid JSON, fails the
/// whole parse. The blocking decoder catches that failure and falls back to
/// plain-text treatment. An answer that is valid JSON but has no
/// `tool_calls` field parses to an empty list.
pub(crate) fn parse_tool_calls(answer: &str) -> Result<Vec<ToolCall>, serde_json::Error> {
    let envelope: ToolCallEnvelope = serde_json::from_str(answer)?;

    let mut calls = Vec::with_capacity(envelope.tool_calls.len());
    for raw in envelope.tool_calls {
        let args: serde_json::Value = serde_json::from_str(&raw.function.arguments)?;
        calls.push(ToolCall {
            id: raw.id,
            call_type: "tool_call".to_string(),
            name: raw.function.name,
            args,
        });
    }

    Ok(calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_single_call_with_nested_arguments() {
        let answer =
            r#"{"tool_calls":[{"id":"call_1","function":{"name":"add","arguments":"{\"a\":1,\"b\":2}"}}]}"#;
        let calls = parse_tool_calls(answer).unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "add");
        assert_eq!(calls[0].call_type, "tool_call");
        assert_eq!(calls[0].args, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn parses_multiple_calls() {
        let answer = r#"{"role":"assistant","tool_calls":[
            {"id":"call_a","type":"function","function":{"name":"fetch_weather","arguments":"{\"location\":\"Boston\"}"}},
            {"id":"call_b","type":"function","function":{"name":"fetch_weather","arguments":"{\"location\":\"Hangzhou\"}"}}
        ]}"#;
        let calls = parse_tool_calls(answer).unwrap();

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].args["location"], "Hangzhou");
    }

    #[test]
    fn json_without_tool_calls_yields_empty_list() {
        let calls = parse_tool_calls(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn natural_language_fails_parse() {
        assert!(parse_tool_calls("The sky is blue.").is_err());
    }

    #[test]
    fn malformed_entry_fails_whole_parse() {
        // Second entry lacks `function`; nothing is recovered.
        let answer = r#"{"tool_calls":[
            {"id":"call_a","function":{"name":"add","arguments":"{}"}},
            {"id":"call_b"}
        ]}"#;
        assert!(parse_tool_calls(answer).is_err());
    }

    #[test]
    fn non_json_arguments_fail_whole_parse() {
        let answer =
            r#"{"tool_calls":[{"id":"call_1","function":{"name":"add","arguments":"a=1"}}]}"#;
        assert!(parse_tool_calls(answer).is_err());
    }
}
