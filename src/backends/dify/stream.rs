//! Streaming-mode event decoding.
//!
//! Dify streams one JSON event per line, optionally `data: `-prefixed.
//! Partial frames are expected protocol noise; transport failures are not.

use std::pin::Pin;

use futures::stream::Stream;

use crate::chat::{create_line_stream, StreamDelta};
use crate::error::DifyError;

use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct DifyStreamEvent {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
}

/// Per-line decode outcome. `Ignored` covers expected noise (blank and
/// comment lines, partial JSON frames, events carrying neither answer text
/// nor a conversation id); fatal failures travel through the `Result`
/// instead.
#[derive(Debug)]
pub(crate) enum LineOutcome {
    Delta(StreamDelta),
    Ignored,
}

pub(crate) fn decode_line(line: &str) -> Result<LineOutcome, DifyError> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Ok(LineOutcome::Ignored);
    }
    // SSE comment/keep-alive line
    if line.starts_with(':') {
        return Ok(LineOutcome::Ignored);
    }

    let json = line.strip_prefix("data: ").unwrap_or(line);

    // A line that does not parse is treated as a frame that never completed
    // validly, and dropped rather than retried.
    let event: DifyStreamEvent = match serde_json::from_str(json) {
        Ok(event) => event,
        Err(_) => return Ok(LineOutcome::Ignored),
    };

    let conversation_id = event.conversation_id.filter(|id| !id.is_empty());
    match event.answer {
        Some(text) if !text.is_empty() => Ok(LineOutcome::Delta(StreamDelta {
            text,
            conversation_id,
        })),
        // Conversation state is carried by every event, not only the
        // content-bearing ones: on a fresh conversation the id often arrives
        // solely on the terminal `message_end` event. Such events surface as
        // text-less deltas so the caller's session still sees the id.
        _ if conversation_id.is_some() => Ok(LineOutcome::Delta(StreamDelta {
            text: String::new(),
            conversation_id,
        })),
        _ => Ok(LineOutcome::Ignored),
    }
}

/// Wire the stateful line splitter to the Dify event decoder.
pub(crate) fn create_delta_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamDelta, DifyError>> + Send>> {
    create_line_stream(response, |line| match decode_line(line)? {
        LineOutcome::Delta(delta) => Ok(Some(delta)),
        LineOutcome::Ignored => Ok(None),
    })
}
