//! Console output for agent answers.
//!
//! Text comes first, then one line per citation in the order the service
//! reported them.

use std::io::{self, Write};

use futures_util::StreamExt;

use crate::agent::{AgentResponse, AgentStream, AgentUpdate};
use crate::error::AgentError;
use crate::message::Citation;

pub fn write_response<W: Write>(response: &AgentResponse, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{}", response.text)?;
    write_citations(&response.citations, writer)
}

/// Writes text fragments as they arrive and returns the assembled response.
///
/// Output already written stays written when the stream fails part-way.
pub async fn write_stream<W: Write>(
    mut stream: AgentStream<'_>,
    writer: &mut W,
) -> Result<AgentResponse, AgentError> {
    let mut response = AgentResponse::default();
    while let Some(update) = stream.next().await {
        let update = update?;
        if let AgentUpdate::Text(text) = &update {
            write!(writer, "{text}")?;
            writer.flush()?;
        }
        response.apply(&update);
    }

    writeln!(writer)?;
    write_citations(&response.citations, writer)?;
    Ok(response)
}

fn write_citations<W: Write>(citations: &[Citation], writer: &mut W) -> io::Result<()> {
    for citation in citations {
        writeln!(writer, "{citation}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;
    use crate::error::RemoteCallError;
    use crate::message::CitationSource;

    fn citation() -> Citation {
        Citation {
            text: Some("【3:0†source】".to_string()),
            source: CitationSource::Url {
                url: "https://example.com/weather".to_string(),
                title: Some("Weather".to_string()),
            },
        }
    }

    #[test]
    fn response_prints_text_then_citations() {
        let response = AgentResponse {
            text: "Sunny today.".to_string(),
            citations: vec![citation()],
            usage: None,
        };
        let mut out = Vec::new();
        write_response(&response, &mut out).expect("writes");

        let printed = String::from_utf8(out).expect("utf8");
        let lines = printed.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Sunny today.");
        assert_eq!(lines[1], citation().to_string());
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn stream_prints_fragments_in_order() {
        let updates = stream::iter(vec![
            Ok(AgentUpdate::Text("Clam ".to_string())),
            Ok(AgentUpdate::Citation(citation())),
            Ok(AgentUpdate::Text("Chowder".to_string())),
        ])
        .boxed();

        let mut out = Vec::new();
        let response = write_stream(updates, &mut out).await.expect("streams");

        let printed = String::from_utf8(out).expect("utf8");
        assert!(printed.starts_with("Clam Chowder\n"));
        assert!(printed.contains("https://example.com/weather"));
        assert_eq!(response.text, "Clam Chowder");
        assert_eq!(response.citations.len(), 1);
    }

    #[tokio::test]
    async fn stream_error_keeps_earlier_output() {
        let updates = stream::iter(vec![
            Ok(AgentUpdate::Text("partial".to_string())),
            Err(AgentError::RemoteCall(RemoteCallError::Transport(
                "connection reset".to_string(),
            ))),
        ])
        .boxed();

        let mut out = Vec::new();
        let err = write_stream(updates, &mut out).await.expect_err("fails");

        assert!(matches!(err, AgentError::RemoteCall(_)));
        assert_eq!(String::from_utf8(out).expect("utf8"), "partial");
    }
}
