use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};

use crate::error::DifyError;

/// Turns a response body into a stream of parsed items, one line at a time.
///
/// Dify streams newline-delimited JSON events, so lines (not `\n\n` SSE
/// frames) are the unit of work. The splitter is stateful across reads: a
/// network read may end mid-character or mid-line, so undecodable UTF-8
/// tails and the trailing unterminated line are carried into the next read.
/// When the body ends, whatever is still buffered goes through the parser
/// once more.
///
/// The parser decides per line: `Ok(Some(item))` to emit, `Ok(None)` to
/// ignore, `Err` to surface a fatal failure.
///
/// A transport error is emitted once and ends the stream; no further reads
/// are attempted on a broken connection.
pub(crate) fn create_line_stream<T, F>(
    response: reqwest::Response,
    parser: F,
) -> Pin<Box<dyn Stream<Item = Result<T, DifyError>> + Send>>
where
    T: Send + 'static,
    F: Fn(&str) -> Result<Option<T>, DifyError> + Send + 'static,
{
    // A terminal marker lets the same scan state handle the end-of-stream
    // flush.
    let stream = response
        .bytes_stream()
        .map(Some)
        .chain(futures::stream::iter([None]))
        .scan(LineState::default(), move |state, item| {
            let results = if state.failed {
                None
            } else {
                Some(match item {
                    Some(chunk) => handle_chunk(state, chunk, &parser),
                    None => state.flush(&parser),
                })
            };
            async move { results }
        })
        .flat_map(futures::stream::iter);

    Box::pin(stream)
}

#[derive(Default)]
struct LineState {
    buffer: String,
    utf8_buffer: Vec<u8>,
    failed: bool,
}

fn handle_chunk<T, F>(
    state: &mut LineState,
    chunk: Result<Bytes, reqwest::Error>,
    parser: &F,
) -> Vec<Result<T, DifyError>>
where
    F: Fn(&str) -> Result<Option<T>, DifyError>,
{
    let bytes = match chunk {
        Ok(bytes) => bytes,
        Err(err) => {
            state.failed = true;
            return vec![Err(DifyError::HttpError(err.to_string()))];
        }
    };

    state.push_bytes(&bytes);
    state.drain_lines(parser)
}

impl LineState {
    fn push_bytes(&mut self, bytes: &[u8]) {
        self.utf8_buffer.extend_from_slice(bytes);
        match std::str::from_utf8(&self.utf8_buffer) {
            Ok(text) => {
                self.buffer.push_str(text);
                self.utf8_buffer.clear();
            }
            Err(err) => self.consume_valid_prefix(err.valid_up_to()),
        }
    }

    fn consume_valid_prefix(&mut self, valid_up_to: usize) {
        if valid_up_to == 0 {
            return;
        }

        let valid = String::from_utf8_lossy(&self.utf8_buffer[..valid_up_to]);
        self.buffer.push_str(&valid);
        self.utf8_buffer.drain(..valid_up_to);
    }

    fn drain_lines<T, F>(&mut self, parser: &F) -> Vec<Result<T, DifyError>>
    where
        F: Fn(&str) -> Result<Option<T>, DifyError>,
    {
        let mut results = Vec::new();
        while let Some(line) = self.next_line() {
            match parser(&line) {
                Ok(Some(item)) => results.push(Ok(item)),
                Ok(None) => {}
                Err(err) => results.push(Err(err)),
            }
        }
        results
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.find('\n')?;
        let line = self.buffer[..pos].to_string();
        self.buffer.drain(..=pos);
        Some(line)
    }

    fn flush<T, F>(&mut self, parser: &F) -> Vec<Result<T, DifyError>>
    where
        F: Fn(&str) -> Result<Option<T>, DifyError>,
    {
        if self.buffer.is_empty() {
            return Vec::new();
        }

        let line = std::mem::take(&mut self.buffer);
        match parser(&line) {
            Ok(Some(item)) => vec![Ok(item)],
            Ok(None) => Vec::new(),
            Err(err) => vec![Err(err)],
        }
    }
}

#[cfg(test)]
#[path = "lines_tests.rs"]
mod tests;
