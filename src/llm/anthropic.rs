use anthropic_ai_sdk::client::AnthropicClient;
use anthropic_ai_sdk::types::message::{
    ContentBlock, CreateMessageParams, CreateMessageResponse, Message, MessageClient, MessageError,
    RequiredMessageParams, Role, Tool, ToolChoice,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{ANTHROPIC_API_KEY, ANTHROPIC_MODEL, EnvConfig};
use crate::error::{AgentError, ConfigurationError, RemoteCallError};
use crate::llm::{
    ChatModel, ModelCompletion, ModelMessage, ModelRequest, ModelToolCall, ModelToolChoice,
    ModelUsage,
};
use crate::message::ContentPart;

const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Clone)]
/// Runtime configuration for [`AnthropicModel`].
pub struct AnthropicModelConfig {
    /// Anthropic API key.
    pub api_key: String,
    /// Model id (for example `claude-sonnet-4-5`).
    pub model: String,
    /// Anthropic API version header value.
    pub api_version: String,
    /// Optional base URL override for proxies or compatible endpoints.
    pub api_base_url: Option<String>,
    /// Maximum output tokens per call, unless the run overrides it.
    pub max_tokens: u32,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

impl AnthropicModelConfig {
    /// Creates a config with sensible defaults.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_version: AnthropicClient::DEFAULT_API_VERSION.to_string(),
            api_base_url: None,
            max_tokens: 4096,
            temperature: None,
        }
    }

    /// Reads `ANTHROPIC_API_KEY` (required) and `ANTHROPIC_MODEL`.
    pub fn from_config(config: &EnvConfig) -> Result<Self, ConfigurationError> {
        let api_key = config.require(ANTHROPIC_API_KEY)?;
        Ok(Self::new(
            api_key,
            config.or_default(ANTHROPIC_MODEL, DEFAULT_MODEL),
        ))
    }
}

#[derive(Debug, Clone)]
/// Anthropic adapter implementing [`ChatModel`].
///
/// Requests are non-streaming; `invoke_stream` replays the finished turn.
pub struct AnthropicModel {
    client: AnthropicClient,
    config: AnthropicModelConfig,
}

impl AnthropicModel {
    /// Creates a model adapter from explicit config.
    pub fn new(config: AnthropicModelConfig) -> Result<Self, RemoteCallError> {
        let mut builder =
            AnthropicClient::builder(config.api_key.clone(), config.api_version.clone());
        if let Some(url) = &config.api_base_url {
            builder = builder.with_api_base_url(url.clone());
        }

        let client = builder
            .build::<MessageError>()
            .map_err(|err| RemoteCallError::Transport(err.to_string()))?;

        Ok(Self { client, config })
    }

    /// Creates a model adapter from `ANTHROPIC_API_KEY` / `ANTHROPIC_MODEL`.
    pub fn from_env() -> Result<Self, AgentError> {
        let config = AnthropicModelConfig::from_config(&EnvConfig::from_env())?;
        Ok(Self::new(config)?)
    }
}

#[async_trait]
impl ChatModel for AnthropicModel {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<ModelCompletion, RemoteCallError> {
        let (history, system) = to_anthropic_messages(request.messages);

        let required = RequiredMessageParams {
            model: self.config.model.clone(),
            messages: history,
            max_tokens: request.settings.max_tokens.unwrap_or(self.config.max_tokens),
        };

        let mut params = CreateMessageParams::new(required).with_stream(false);

        if let Some(system_prompt) = system {
            params = params.with_system(system_prompt);
        }

        if let Some(temperature) = request.settings.temperature.or(self.config.temperature) {
            params = params.with_temperature(temperature);
        }

        if !request.tools.is_empty() {
            let anthropic_tools = request
                .tools
                .iter()
                .map(|tool| Tool {
                    name: tool.name.clone(),
                    description: Some(tool.description.clone()),
                    input_schema: tool.parameters.clone(),
                })
                .collect::<Vec<_>>();

            params = params.with_tools(anthropic_tools);
            params = params.with_tool_choice(match request.tool_choice {
                ModelToolChoice::Auto => ToolChoice::Auto,
                ModelToolChoice::None => ToolChoice::None,
            });
        }

        debug!(model = %self.config.model, "anthropic message request");

        let response = self
            .client
            .create_message(Some(&params))
            .await
            .map_err(|err| RemoteCallError::Transport(err.to_string()))?;

        Ok(normalize_response(&response))
    }
}

fn to_anthropic_messages(messages: &[ModelMessage]) -> (Vec<Message>, Option<String>) {
    let mut system_lines = Vec::new();
    let mut anthropic_messages = Vec::new();

    for message in messages {
        match message {
            ModelMessage::System(content) => system_lines.push(content.clone()),
            ModelMessage::User(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        ContentPart::Text(fragment) => text.push_str(fragment),
                        ContentPart::Image { .. } | ContentPart::ImageUrl(_) => {
                            warn!("anthropic adapter skips image content");
                        }
                    }
                }
                if !text.is_empty() {
                    anthropic_messages.push(Message::new_text(Role::User, text));
                }
            }
            ModelMessage::Assistant {
                content,
                tool_calls,
            } => {
                let mut blocks = Vec::new();
                if let Some(content) = content {
                    if !content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: content.clone(),
                        });
                    }
                }
                for call in tool_calls {
                    blocks.push(ContentBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.arguments.clone(),
                    });
                }
                if !blocks.is_empty() {
                    anthropic_messages.push(Message::new_blocks(Role::Assistant, blocks));
                }
            }
            ModelMessage::ToolResult {
                tool_call_id,
                tool_name: _,
                content,
                is_error,
            } => {
                let rendered = if *is_error {
                    format!("Error: {content}")
                } else {
                    content.clone()
                };
                anthropic_messages.push(Message::new_blocks(
                    Role::User,
                    vec![ContentBlock::ToolResult {
                        tool_use_id: tool_call_id.clone(),
                        content: rendered,
                    }],
                ));
            }
        }
    }

    let system = if system_lines.is_empty() {
        None
    } else {
        Some(system_lines.join("\n\n"))
    };

    (anthropic_messages, system)
}

fn normalize_response(response: &CreateMessageResponse) -> ModelCompletion {
    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in &response.content {
        match block {
            ContentBlock::Text { text } => text_parts.push(text.clone()),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(ModelToolCall {
                id: id.clone(),
                name: name.clone(),
                arguments: input.clone(),
            }),
            _ => {}
        }
    }

    let text = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join("\n"))
    };

    ModelCompletion {
        text,
        tool_calls,
        citations: Vec::new(),
        usage: Some(ModelUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        }),
    }
}
