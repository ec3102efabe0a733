mod anthropic;
mod openai;

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use serde_json::{Value, json};

use crate::error::RemoteCallError;
use crate::message::{ChatMessage, Citation, ContentPart, Role};

pub use anthropic::{AnthropicModel, AnthropicModelConfig};
pub use openai::{OpenAiChatModel, OpenAiConfig, OpenAiEndpoint};

#[derive(Clone, Debug, PartialEq)]
#[doc(hidden)]
pub enum ModelMessage {
    System(String),
    User(Vec<ContentPart>),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ModelToolCall>,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        content: String,
        is_error: bool,
    },
}

impl From<&ChatMessage> for ModelMessage {
    fn from(message: &ChatMessage) -> Self {
        match message.role {
            Role::User => ModelMessage::User(message.contents.clone()),
            Role::Assistant => ModelMessage::Assistant {
                content: Some(message.text()),
                tool_calls: Vec::new(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[doc(hidden)]
pub struct ModelToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug)]
#[doc(hidden)]
pub struct ModelToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[doc(hidden)]
pub enum ModelToolChoice {
    Auto,
    None,
}

/// Per-call sampling settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelSettings {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Clone, Copy, Debug)]
#[doc(hidden)]
pub struct ModelRequest<'a> {
    pub messages: &'a [ModelMessage],
    pub tools: &'a [ModelToolDefinition],
    pub tool_choice: &'a ModelToolChoice,
    pub settings: &'a ModelSettings,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[doc(hidden)]
pub struct ModelCompletion {
    pub text: Option<String>,
    pub tool_calls: Vec<ModelToolCall>,
    pub citations: Vec<Citation>,
    pub usage: Option<ModelUsage>,
}

impl ModelCompletion {
    /// Replays a finished completion as stream chunks.
    pub fn into_chunks(self) -> Vec<ModelChunk> {
        let mut chunks = Vec::new();
        if let Some(text) = self.text.filter(|text| !text.is_empty()) {
            chunks.push(ModelChunk::Text(text));
        }
        for (index, call) in self.tool_calls.into_iter().enumerate() {
            chunks.push(ModelChunk::ToolCallDelta {
                index,
                id: Some(call.id),
                name: Some(call.name),
                arguments: call.arguments.to_string(),
            });
        }
        chunks.extend(self.citations.into_iter().map(ModelChunk::Citation));
        if let Some(usage) = self.usage {
            chunks.push(ModelChunk::Usage(usage));
        }
        chunks
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl ModelUsage {
    pub fn add(&mut self, other: &ModelUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// One streamed fragment of a model turn.
#[derive(Clone, Debug, PartialEq)]
#[doc(hidden)]
pub enum ModelChunk {
    Text(String),
    /// Fragment of a tool call; fragments sharing `index` belong to one call.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: String,
    },
    Citation(Citation),
    Usage(ModelUsage),
}

pub type ModelChunkStream = BoxStream<'static, Result<ModelChunk, RemoteCallError>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<ModelCompletion, RemoteCallError>;

    /// Streams one model turn. Backends without native streaming replay
    /// [`ChatModel::invoke`].
    async fn invoke_stream(
        &self,
        request: ModelRequest<'_>,
    ) -> Result<ModelChunkStream, RemoteCallError> {
        let completion = self.invoke(request).await?;
        Ok(stream::iter(completion.into_chunks().into_iter().map(Ok)).boxed())
    }
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Folds [`ModelChunk`]s back into a [`ModelCompletion`].
#[derive(Default)]
#[doc(hidden)]
pub struct ChunkAccumulator {
    text: String,
    tool_calls: BTreeMap<usize, PartialToolCall>,
    citations: Vec<Citation>,
    usage: Option<ModelUsage>,
}

impl ChunkAccumulator {
    pub fn push(&mut self, chunk: ModelChunk) {
        match chunk {
            ModelChunk::Text(text) => self.text.push_str(&text),
            ModelChunk::ToolCallDelta {
                index,
                id,
                name,
                arguments,
            } => {
                let call = self.tool_calls.entry(index).or_default();
                if let Some(id) = id {
                    call.id = id;
                }
                if let Some(name) = name {
                    call.name.push_str(&name);
                }
                call.arguments.push_str(&arguments);
            }
            ModelChunk::Citation(citation) => self.citations.push(citation),
            ModelChunk::Usage(usage) => {
                self.usage.get_or_insert_with(ModelUsage::default).add(&usage)
            }
        }
    }

    pub fn finish(self) -> Result<ModelCompletion, RemoteCallError> {
        let mut tool_calls = Vec::with_capacity(self.tool_calls.len());
        for (_, call) in self.tool_calls {
            tool_calls.push(ModelToolCall {
                arguments: parse_tool_arguments(&call.name, &call.arguments)?,
                id: call.id,
                name: call.name,
            });
        }

        Ok(ModelCompletion {
            text: if self.text.is_empty() {
                None
            } else {
                Some(self.text)
            },
            tool_calls,
            citations: self.citations,
            usage: self.usage,
        })
    }
}

pub(crate) fn parse_tool_arguments(tool: &str, raw: &str) -> Result<Value, RemoteCallError> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str::<Value>(raw).map_err(|err| {
        RemoteCallError::Response(format!(
            "tool call arguments for '{tool}' are not valid JSON: {err}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CitationSource;

    #[test]
    fn accumulator_reassembles_split_tool_arguments() {
        let mut acc = ChunkAccumulator::default();
        acc.push(ModelChunk::Text("Checking ".to_string()));
        acc.push(ModelChunk::ToolCallDelta {
            index: 0,
            id: Some("call_1".to_string()),
            name: Some("GetItemPrice".to_string()),
            arguments: "{\"menuIt".to_string(),
        });
        acc.push(ModelChunk::Text("the menu".to_string()));
        acc.push(ModelChunk::ToolCallDelta {
            index: 0,
            id: None,
            name: None,
            arguments: "em\":\"Chai Tea\"}".to_string(),
        });
        acc.push(ModelChunk::Usage(ModelUsage {
            input_tokens: 3,
            output_tokens: 2,
        }));
        acc.push(ModelChunk::Usage(ModelUsage {
            input_tokens: 1,
            output_tokens: 1,
        }));

        let completion = acc.finish().expect("valid arguments");
        assert_eq!(completion.text.as_deref(), Some("Checking the menu"));
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].id, "call_1");
        assert_eq!(
            completion.tool_calls[0].arguments,
            json!({"menuItem": "Chai Tea"})
        );
        assert_eq!(
            completion.usage,
            Some(ModelUsage {
                input_tokens: 4,
                output_tokens: 3,
            })
        );
    }

    #[test]
    fn accumulator_rejects_broken_arguments() {
        let mut acc = ChunkAccumulator::default();
        acc.push(ModelChunk::ToolCallDelta {
            index: 2,
            id: Some("call_x".to_string()),
            name: Some("lookup".to_string()),
            arguments: "{not json".to_string(),
        });

        let err = acc.finish().expect_err("must fail");
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn completion_replays_as_chunks_in_order() {
        let citation = Citation {
            text: None,
            source: CitationSource::Url {
                url: "https://example.test".to_string(),
                title: None,
            },
        };
        let completion = ModelCompletion {
            text: Some("hi".to_string()),
            tool_calls: vec![ModelToolCall {
                id: "c".to_string(),
                name: "t".to_string(),
                arguments: json!({"a": 1}),
            }],
            citations: vec![citation.clone()],
            usage: None,
        };

        let mut acc = ChunkAccumulator::default();
        for chunk in completion.clone().into_chunks() {
            acc.push(chunk);
        }
        assert_eq!(acc.finish().expect("replays"), completion);
    }

    #[test]
    fn assistant_chat_message_maps_to_assistant_turn() {
        let message = ChatMessage::assistant("earlier answer");
        assert_eq!(
            ModelMessage::from(&message),
            ModelMessage::Assistant {
                content: Some("earlier answer".to_string()),
                tool_calls: Vec::new(),
            }
        );
    }
}
