//! Shared HTTP client construction, error extraction and SSE decoding.

use std::time::Duration;

use async_stream::stream;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Deserialize;
use serde_json::Value;

use crate::error::RemoteCallError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_client() -> Result<reqwest::Client, RemoteCallError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| RemoteCallError::Transport(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    code: Option<Value>,
}

/// Turns a non-success response into [`RemoteCallError::Status`], keeping the
/// service's own error message when the body carries one.
pub(crate) async fn status_error(response: reqwest::Response) -> RemoteCallError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(parsed) => {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| "unknown service error".to_string());
            match parsed.error.code {
                Some(Value::String(code)) => format!("{code}: {message}"),
                Some(Value::Null) | None => message,
                Some(other) => format!("{other}: {message}"),
            }
        }
        Err(_) if body.is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body,
    };

    RemoteCallError::Status {
        status: status.as_u16(),
        message,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    pub fn is_done(&self) -> bool {
        self.data == "[DONE]" || self.event.as_deref() == Some("done")
    }
}

/// Incremental `text/event-stream` decoder.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode correctly.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw = self.buffer.drain(..=pos).collect::<Vec<_>>();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.line(line) {
                events.push(event);
            }
        }

        events
    }

    /// Flushes an event left open when the body ends without a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw).trim_end().to_string();
            if let Some(event) = self.line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() && self.event.is_none() {
            return None;
        }
        let event = SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        };
        Some(event)
    }
}

/// Decodes a streaming response body into SSE events, in arrival order.
pub(crate) fn sse_events(
    response: reqwest::Response,
) -> BoxStream<'static, Result<SseEvent, RemoteCallError>> {
    let body = response.bytes_stream();

    let events = stream! {
        futures_util::pin_mut!(body);
        let mut decoder = SseDecoder::default();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in decoder.push(&bytes) {
                        yield Ok(event);
                    }
                }
                Err(err) => {
                    yield Err(RemoteCallError::from(err));
                    return;
                }
            }
        }
        if let Some(event) = decoder.finish() {
            yield Ok(event);
        }
    };

    events.boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_splits_events_on_blank_lines() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(
            b"event: thread.message.delta\ndata: {\"a\":1}\n\n: keep-alive\n\ndata: [DONE]\n\n",
        );

        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: Some("thread.message.delta".to_string()),
                    data: "{\"a\":1}".to_string(),
                },
                SseEvent {
                    event: None,
                    data: "[DONE]".to_string(),
                },
            ]
        );
        assert!(events[1].is_done());
    }

    #[test]
    fn decoder_handles_chunk_boundaries_inside_lines_and_characters() {
        let payload = "data: {\"text\":\"café\"}\r\n\r\n".as_bytes();
        let split = payload
            .iter()
            .position(|byte| *byte == 0xC3)
            .expect("multibyte char present")
            + 1;

        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&payload[..split]).is_empty());
        let events = decoder.push(&payload[split..]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"text\":\"café\"}");
    }

    #[test]
    fn decoder_joins_multiline_data_and_flushes_on_finish() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: one\ndata: two\n").is_empty());

        let event = decoder.finish().expect("pending event");
        assert_eq!(event.data, "one\ntwo");
        assert!(decoder.finish().is_none());
    }
}
