use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{
    AZURE_OPENAI_API_KEY, AZURE_OPENAI_API_VERSION, AZURE_OPENAI_DEPLOYMENT_NAME,
    AZURE_OPENAI_ENDPOINT, EnvConfig, OPENAI_API_KEY, OPENAI_BASE_URL, OPENAI_CHAT_MODEL_NAME,
};
use crate::error::{AgentError, ConfigurationError, RemoteCallError};
use crate::http::{build_client, sse_events, status_error};
use crate::llm::{
    ChatModel, ModelChunk, ModelChunkStream, ModelCompletion, ModelMessage, ModelRequest,
    ModelToolCall, ModelToolChoice, ModelUsage, parse_tool_arguments,
};
use crate::message::{Citation, CitationSource, ContentPart};

const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";

/// Where chat completion requests go and how they authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAiEndpoint {
    /// `Authorization: Bearer` against `{base_url}/chat/completions`.
    OpenAi { base_url: String },
    /// `api-key` header against an Azure OpenAI deployment.
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: OpenAiEndpoint,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OpenAiEndpoint::OpenAi {
                base_url: DEFAULT_API_BASE_URL.to_string(),
            },
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }

    pub fn azure(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let deployment = deployment.into();
        Self {
            api_key: api_key.into(),
            model: deployment.clone(),
            endpoint: OpenAiEndpoint::Azure {
                endpoint: endpoint.into().trim_end_matches('/').to_string(),
                deployment,
                api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            },
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.endpoint = OpenAiEndpoint::OpenAi {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        };
        self
    }

    /// Reads `OPENAI_API_KEY` (required), `OPENAI_CHAT_MODEL_NAME` and
    /// `OPENAI_BASE_URL`.
    pub fn from_config(config: &EnvConfig) -> Result<Self, ConfigurationError> {
        let api_key = config.require(OPENAI_API_KEY)?;
        let model = config.or_default(OPENAI_CHAT_MODEL_NAME, DEFAULT_MODEL);
        let mut resolved = Self::new(api_key, model);
        if config.optional(OPENAI_BASE_URL).is_some() {
            resolved = resolved.with_base_url(config.parse_url(OPENAI_BASE_URL)?);
        }
        Ok(resolved)
    }

    /// Reads `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_DEPLOYMENT_NAME`,
    /// `AZURE_OPENAI_API_KEY` (all required) and `AZURE_OPENAI_API_VERSION`.
    pub fn azure_from_config(config: &EnvConfig) -> Result<Self, ConfigurationError> {
        let endpoint = config.parse_url(AZURE_OPENAI_ENDPOINT)?;
        let deployment = config.require(AZURE_OPENAI_DEPLOYMENT_NAME)?;
        let api_key = config.require(AZURE_OPENAI_API_KEY)?;
        let mut resolved = Self::azure(endpoint, deployment, api_key);
        if let (Some(version), OpenAiEndpoint::Azure { api_version, .. }) = (
            config.optional(AZURE_OPENAI_API_VERSION),
            &mut resolved.endpoint,
        ) {
            *api_version = version.to_string();
        }
        Ok(resolved)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> Result<Self, RemoteCallError> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    pub fn from_env() -> Result<Self, AgentError> {
        let config = OpenAiConfig::from_config(&EnvConfig::from_env())?;
        Ok(Self::new(config)?)
    }

    pub fn azure_from_env() -> Result<Self, AgentError> {
        let config = OpenAiConfig::azure_from_config(&EnvConfig::from_env())?;
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn url(&self) -> String {
        match &self.config.endpoint {
            OpenAiEndpoint::OpenAi { base_url } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
            OpenAiEndpoint::Azure {
                endpoint,
                deployment,
                api_version,
            } => format!(
                "{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={api_version}"
            ),
        }
    }

    async fn send(&self, body: &ChatCompletionRequest) -> Result<reqwest::Response, RemoteCallError> {
        debug!(model = %self.config.model, stream = body.stream, "chat completion request");

        let request = self.client.post(self.url()).json(body);
        let request = match &self.config.endpoint {
            OpenAiEndpoint::OpenAi { .. } => request.bearer_auth(&self.config.api_key),
            OpenAiEndpoint::Azure { .. } => request.header("api-key", &self.config.api_key),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<ModelCompletion, RemoteCallError> {
        let body = build_request(request, &self.config, false);
        let payload = self
            .send(&body)
            .await?
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|err| RemoteCallError::Response(err.to_string()))?;

        normalize_response(payload)
    }

    async fn invoke_stream(
        &self,
        request: ModelRequest<'_>,
    ) -> Result<ModelChunkStream, RemoteCallError> {
        let body = build_request(request, &self.config, true);
        let mut events = sse_events(self.send(&body).await?);

        let chunks = async_stream::try_stream! {
            // Set by `[DONE]` or a finish reason; a body that ends without
            // either was cut off.
            let mut finished = false;
            while let Some(event) = events.next().await {
                let event = event?;
                if event.is_done() {
                    finished = true;
                    break;
                }
                let chunk = serde_json::from_str::<ChatCompletionChunk>(&event.data)
                    .map_err(|err| RemoteCallError::Response(format!("invalid stream chunk: {err}")))?;
                finished |= chunk
                    .choices
                    .iter()
                    .any(|choice| choice.finish_reason.is_some());
                for item in normalize_chunk(chunk) {
                    yield item;
                }
            }
            if !finished {
                Err::<(), RemoteCallError>(RemoteCallError::Response(
                    "stream ended before completion".to_string(),
                ))?;
            }
        };

        Ok(chunks.boxed())
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum RequestMessage {
    System {
        content: String,
    },
    User {
        content: UserContent,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<RequestToolCall>>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum UserContent {
    Text(String),
    Parts(Vec<UserContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum UserContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ToolDefinition {
    #[serde(rename = "type")]
    type_: &'static str,
    function: ToolFunctionDefinition,
}

#[derive(Debug, Serialize)]
struct ToolFunctionDefinition {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct RequestToolCall {
    id: String,
    #[serde(rename = "type")]
    type_: String,
    function: ToolCallFunction,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<AssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    tool_calls: Option<Vec<RequestToolCall>>,
    annotations: Option<Vec<Annotation>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Annotation {
    UrlCitation { url_citation: UrlCitation },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct UrlCitation {
    url: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
    annotations: Option<Vec<Annotation>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

fn build_request(
    request: ModelRequest<'_>,
    config: &OpenAiConfig,
    stream: bool,
) -> ChatCompletionRequest {
    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(|tool| ToolDefinition {
                    type_: "function",
                    function: ToolFunctionDefinition {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect::<Vec<_>>(),
        )
    };

    let tool_choice = tools.as_ref().map(|_| match request.tool_choice {
        ModelToolChoice::Auto => "auto",
        ModelToolChoice::None => "none",
    });

    ChatCompletionRequest {
        model: config.model.clone(),
        messages: to_request_messages(request.messages),
        tools,
        tool_choice,
        temperature: request.settings.temperature.or(config.temperature),
        top_p: config.top_p,
        max_tokens: request.settings.max_tokens.or(config.max_tokens),
        stream,
        stream_options: stream.then_some(StreamOptions {
            include_usage: true,
        }),
    }
}

fn to_request_messages(messages: &[ModelMessage]) -> Vec<RequestMessage> {
    let mut request_messages = Vec::new();

    for message in messages {
        match message {
            ModelMessage::System(content) => {
                if content.is_empty() {
                    continue;
                }
                request_messages.push(RequestMessage::System {
                    content: content.clone(),
                });
            }
            ModelMessage::User(parts) => {
                if let Some(content) = to_user_content(parts) {
                    request_messages.push(RequestMessage::User { content });
                }
            }
            ModelMessage::Assistant {
                content,
                tool_calls,
            } => {
                let serialized_tool_calls = tool_calls
                    .iter()
                    .map(|tool_call| RequestToolCall {
                        id: tool_call.id.clone(),
                        type_: "function".to_string(),
                        function: ToolCallFunction {
                            name: tool_call.name.clone(),
                            arguments: tool_call.arguments.to_string(),
                        },
                    })
                    .collect::<Vec<_>>();

                let assistant_content = content.as_ref().filter(|text| !text.is_empty()).cloned();
                if assistant_content.is_none() && serialized_tool_calls.is_empty() {
                    continue;
                }

                request_messages.push(RequestMessage::Assistant {
                    content: assistant_content,
                    tool_calls: if serialized_tool_calls.is_empty() {
                        None
                    } else {
                        Some(serialized_tool_calls)
                    },
                });
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

                request_messages.push(RequestMessage::Tool {
                    tool_call_id: tool_call_id.clone(),
                    content: rendered,
                });
            }
        }
    }

    request_messages
}

/// Plain string for text-only messages, a part list once images appear.
fn to_user_content(parts: &[ContentPart]) -> Option<UserContent> {
    if parts.iter().all(|part| matches!(part, ContentPart::Text(_))) {
        let text = parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<String>();
        return (!text.is_empty()).then_some(UserContent::Text(text));
    }

    let converted = parts
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text(text) if text.is_empty() => None,
            ContentPart::Text(text) => Some(UserContentPart::Text { text: text.clone() }),
            ContentPart::Image { .. } | ContentPart::ImageUrl(_) => {
                part.image_url().map(|url| UserContentPart::ImageUrl {
                    image_url: ImageUrl { url },
                })
            }
        })
        .collect::<Vec<_>>();

    Some(UserContent::Parts(converted))
}

fn to_citations(annotations: Option<Vec<Annotation>>) -> Vec<Citation> {
    annotations
        .unwrap_or_default()
        .into_iter()
        .filter_map(|annotation| match annotation {
            Annotation::UrlCitation { url_citation } => Some(Citation {
                text: None,
                source: CitationSource::Url {
                    url: url_citation.url,
                    title: url_citation.title,
                },
            }),
            Annotation::Other => None,
        })
        .collect()
}

fn to_usage(usage: Usage) -> ModelUsage {
    ModelUsage {
        input_tokens: usage.prompt_tokens.unwrap_or(0),
        output_tokens: usage.completion_tokens.unwrap_or(0),
    }
}

fn normalize_response(
    response: ChatCompletionResponse,
) -> Result<ModelCompletion, RemoteCallError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RemoteCallError::Response("chat completion missing choices".to_string()))?;

    let message = choice.message.ok_or_else(|| {
        RemoteCallError::Response("chat completion missing choice message".to_string())
    })?;

    let mut tool_calls = Vec::new();
    for tool_call in message.tool_calls.unwrap_or_default() {
        tool_calls.push(ModelToolCall {
            arguments: parse_tool_arguments(&tool_call.function.name, &tool_call.function.arguments)?,
            id: tool_call.id,
            name: tool_call.function.name,
        });
    }

    Ok(ModelCompletion {
        text: message.content.filter(|text| !text.is_empty()),
        tool_calls,
        citations: to_citations(message.annotations),
        usage: response.usage.map(to_usage),
    })
}

fn normalize_chunk(chunk: ChatCompletionChunk) -> Vec<ModelChunk> {
    let mut items = Vec::new();

    for choice in chunk.choices {
        let Some(delta) = choice.delta else {
            continue;
        };
        if let Some(text) = delta.content.filter(|text| !text.is_empty()) {
            items.push(ModelChunk::Text(text));
        }
        for call in delta.tool_calls.unwrap_or_default() {
            let (name, arguments) = match call.function {
                Some(function) => (function.name, function.arguments.unwrap_or_default()),
                None => (None, String::new()),
            };
            items.push(ModelChunk::ToolCallDelta {
                index: call.index,
                id: call.id,
                name,
                arguments,
            });
        }
        items.extend(
            to_citations(delta.annotations)
                .into_iter()
                .map(ModelChunk::Citation),
        );
    }

    if let Some(usage) = chunk.usage {
        items.push(ModelChunk::Usage(to_usage(usage)));
    }

    items
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::{ModelSettings, ModelToolDefinition};

    fn tool_definition() -> ModelToolDefinition {
        ModelToolDefinition {
            name: "lookup".to_string(),
            description: "Look up something".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }

    #[test]
    fn build_request_serializes_messages_tools_and_settings() {
        let messages = vec![
            ModelMessage::System("You are helpful".to_string()),
            ModelMessage::User(vec![ContentPart::Text("Find docs".to_string())]),
            ModelMessage::Assistant {
                content: Some("Calling tool".to_string()),
                tool_calls: vec![ModelToolCall {
                    id: "call_1".to_string(),
                    name: "lookup".to_string(),
                    arguments: json!({"query": "rust"}),
                }],
            },
            ModelMessage::ToolResult {
                tool_call_id: "call_1".to_string(),
                tool_name: "lookup".to_string(),
                content: "boom".to_string(),
                is_error: true,
            },
        ];

        let mut config = OpenAiConfig::new("key", "gpt-4o-mini");
        config.max_tokens = Some(512);
        let settings = ModelSettings {
            temperature: Some(0.2),
            max_tokens: None,
        };
        let tools = [tool_definition()];

        let request = build_request(
            ModelRequest {
                messages: &messages,
                tools: &tools,
                tool_choice: &ModelToolChoice::Auto,
                settings: &settings,
            },
            &config,
            false,
        );
        let value = serde_json::to_value(request).expect("serializes");

        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Find docs");
        assert_eq!(
            value["messages"][2]["tool_calls"][0]["function"]["arguments"],
            "{\"query\":\"rust\"}"
        );
        assert_eq!(value["messages"][3]["role"], "tool");
        assert_eq!(value["messages"][3]["content"], "Error: boom");
        assert_eq!(value["tools"][0]["function"]["name"], "lookup");
        assert_eq!(value["tool_choice"], "auto");
        assert!((value["temperature"].as_f64().unwrap_or_default() - 0.2).abs() < 1e-6);
        assert_eq!(value["max_tokens"], 512);
        assert!(value.get("stream").is_none());
    }

    #[test]
    fn build_request_sends_images_as_parts_and_enables_stream_usage() {
        let messages = vec![ModelMessage::User(vec![
            ContentPart::Text("What is this?".to_string()),
            ContentPart::Image {
                media_type: "image/png".to_string(),
                data: b"png".to_vec(),
            },
        ])];
        let config = OpenAiConfig::new("key", "gpt-4o");

        let request = build_request(
            ModelRequest {
                messages: &messages,
                tools: &[],
                tool_choice: &ModelToolChoice::None,
                settings: &ModelSettings::default(),
            },
            &config,
            true,
        );
        let value = serde_json::to_value(request).expect("serializes");

        let parts = &value["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,cG5n");
        assert_eq!(value["stream"], true);
        assert_eq!(value["stream_options"]["include_usage"], true);
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
    }

    #[test]
    fn azure_endpoint_targets_deployment_url() {
        let model = OpenAiChatModel::new(OpenAiConfig::azure(
            "https://res.openai.azure.com/",
            "gpt-4o",
            "key",
        ))
        .expect("client builds");

        assert_eq!(
            model.url(),
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-10-21"
        );
    }

    #[test]
    fn config_resolution_reports_missing_key() {
        let config = EnvConfig::from_iter([(OPENAI_CHAT_MODEL_NAME, "gpt-4o")]);
        let err = OpenAiConfig::from_config(&config).expect_err("must fail");
        assert_eq!(err, ConfigurationError::MissingVar(OPENAI_API_KEY.to_string()));

        let config = EnvConfig::from_iter([
            (AZURE_OPENAI_ENDPOINT, "https://res.openai.azure.com"),
            (AZURE_OPENAI_DEPLOYMENT_NAME, "gpt-4o"),
            (AZURE_OPENAI_API_KEY, "key"),
            (AZURE_OPENAI_API_VERSION, "2025-01-01-preview"),
        ]);
        let resolved = OpenAiConfig::azure_from_config(&config).expect("resolves");
        assert_eq!(
            resolved.endpoint,
            OpenAiEndpoint::Azure {
                endpoint: "https://res.openai.azure.com".to_string(),
                deployment: "gpt-4o".to_string(),
                api_version: "2025-01-01-preview".to_string(),
            }
        );
    }

    #[test]
    fn normalize_response_extracts_text_tool_calls_citations_and_usage() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "answer",
                    "tool_calls": [{
                        "id": "call_x",
                        "type": "function",
                        "function": {"name": "lookup", "arguments": "{\"q\":\"rust\"}"}
                    }],
                    "annotations": [
                        {"type": "url_citation", "url_citation": {"url": "https://a.test", "title": "A", "start_index": 0, "end_index": 6}},
                        {"type": "something_new"}
                    ]
                }
            }],
            "usage": {"prompt_tokens": 11, "completion_tokens": 7}
        }))
        .expect("deserializes");

        let completion = normalize_response(response).expect("response normalizes");

        assert_eq!(completion.text.as_deref(), Some("answer"));
        assert_eq!(completion.tool_calls[0].arguments, json!({"q": "rust"}));
        assert_eq!(
            completion.citations,
            vec![Citation {
                text: None,
                source: CitationSource::Url {
                    url: "https://a.test".to_string(),
                    title: Some("A".to_string()),
                },
            }]
        );
        assert_eq!(
            completion.usage,
            Some(ModelUsage {
                input_tokens: 11,
                output_tokens: 7,
            })
        );
    }

    #[test]
    fn normalize_response_requires_choices() {
        let err = normalize_response(ChatCompletionResponse {
            choices: Vec::new(),
            usage: None,
        })
        .expect_err("should fail");

        match err {
            RemoteCallError::Response(message) => assert!(message.contains("missing choices")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn normalize_chunk_maps_text_and_tool_fragments() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [{
                "delta": {
                    "content": "Hel",
                    "tool_calls": [{"index": 0, "id": "call_1", "function": {"name": "GetSpecials", "arguments": ""}}]
                }
            }],
            "usage": null
        }))
        .expect("deserializes");

        assert_eq!(
            normalize_chunk(chunk),
            vec![
                ModelChunk::Text("Hel".to_string()),
                ModelChunk::ToolCallDelta {
                    index: 0,
                    id: Some("call_1".to_string()),
                    name: Some("GetSpecials".to_string()),
                    arguments: String::new(),
                },
            ]
        );
    }
}
