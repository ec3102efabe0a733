//! Wire types for the Foundry agents REST surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::llm::ModelToolDefinition;
use crate::message::{ChatMessage, Citation, CitationSource, ContentPart, Role};
use crate::tools::HostedTool;

#[derive(Debug, Serialize)]
pub struct CreateAgentRequest {
    pub model: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentObject {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadObject {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageRequest {
    pub role: &'static str,
    pub content: Value,
}

impl CreateMessageRequest {
    /// `None` for messages with nothing to send.
    pub fn from_chat_message(message: &ChatMessage) -> Option<Self> {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        let content = if message.has_images() {
            let parts = message
                .contents
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text(text) if text.is_empty() => None,
                    ContentPart::Text(text) => Some(json!({"type": "text", "text": text})),
                    ContentPart::Image { .. } | ContentPart::ImageUrl(_) => part
                        .image_url()
                        .map(|url| json!({"type": "image_url", "image_url": {"url": url}})),
                })
                .collect::<Vec<_>>();
            Value::Array(parts)
        } else {
            let text = message.text();
            if text.is_empty() {
                return None;
            }
            Value::String(text)
        };

        Some(Self { role, content })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    Incomplete,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Incomplete => "incomplete",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub status: RunStatus,
    pub required_action: Option<RequiredAction>,
    pub last_error: Option<RunError>,
    pub usage: Option<RunUsage>,
}

impl RunObject {
    pub fn failure_message(&self) -> String {
        self.last_error
            .as_ref()
            .map(|err| match &err.code {
                Some(code) => format!("{code}: {}", err.message),
                None => err.message.clone(),
            })
            .unwrap_or_else(|| "no error detail".to_string())
    }

    pub fn required_tool_calls(&self) -> &[RequiredToolCall] {
        self.required_action
            .as_ref()
            .map(|action| action.submit_tool_outputs.tool_calls.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputsAction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitToolOutputsAction {
    #[serde(default)]
    pub tool_calls: Vec<RequiredToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequiredToolCall {
    pub id: String,
    pub function: RequiredFunction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequiredFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct SubmitToolOutputsRequest {
    pub tool_outputs: Vec<ToolOutput>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub data: Vec<ThreadMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: MessageText },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageText {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<MessageAnnotation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageAnnotation {
    UrlCitation {
        text: Option<String>,
        url_citation: UrlCitation,
    },
    FileCitation {
        text: Option<String>,
        file_citation: FileCitation,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlCitation {
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileCitation {
    pub file_id: String,
    pub quote: Option<String>,
}

impl MessageAnnotation {
    pub fn into_citation(self) -> Option<Citation> {
        match self {
            Self::UrlCitation { text, url_citation } => Some(Citation {
                text,
                source: CitationSource::Url {
                    url: url_citation.url,
                    title: url_citation.title,
                },
            }),
            Self::FileCitation {
                text,
                file_citation,
            } => Some(Citation {
                text,
                source: CitationSource::File {
                    file_id: file_citation.file_id,
                    quote: file_citation.quote,
                },
            }),
            Self::Other => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaEvent {
    pub delta: MessageDelta,
}

#[derive(Debug, Deserialize)]
pub struct MessageDelta {
    #[serde(default)]
    pub content: Vec<MessageDeltaContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageDeltaContent {
    Text { text: MessageDeltaText },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaText {
    pub value: Option<String>,
    pub annotations: Option<Vec<MessageAnnotation>>,
}

#[derive(Debug, Deserialize)]
pub struct StreamErrorEvent {
    pub message: Option<String>,
}

/// Tool list plus `tool_resources` for an agent definition.
pub fn tool_payload(
    functions: &[ModelToolDefinition],
    hosted: &[HostedTool],
) -> (Vec<Value>, Option<Value>) {
    let mut tools = Vec::with_capacity(functions.len() + hosted.len());
    let mut resources = Map::new();

    for function in functions {
        tools.push(json!({
            "type": "function",
            "function": {
                "name": function.name,
                "description": function.description,
                "parameters": function.parameters,
            }
        }));
    }

    for tool in hosted {
        match tool {
            HostedTool::BingGrounding { connection_id } => tools.push(json!({
                "type": "bing_grounding",
                "bing_grounding": {
                    "search_configurations": [{"connection_id": connection_id}]
                }
            })),
            HostedTool::AzureAiSearch {
                connection_id,
                index_name,
                query_type,
                top_k,
            } => {
                tools.push(json!({"type": "azure_ai_search"}));
                resources.insert(
                    "azure_ai_search".to_string(),
                    json!({
                        "indexes": [{
                            "index_connection_id": connection_id,
                            "index_name": index_name,
                            "query_type": query_type.as_str(),
                            "top_k": top_k,
                        }]
                    }),
                );
            }
            HostedTool::BrowserAutomation { connection_id } => tools.push(json!({
                "type": "browser_automation",
                "browser_automation": {"connection": {"id": connection_id}}
            })),
            HostedTool::MemorySearch { store_name, scope } => tools.push(json!({
                "type": "memory_search",
                "memory_store_name": store_name,
                "scope": scope,
            })),
            HostedTool::CodeInterpreter => tools.push(json!({"type": "code_interpreter"})),
            HostedTool::FileSearch { vector_store_ids } => {
                tools.push(json!({"type": "file_search"}));
                resources.insert(
                    "file_search".to_string(),
                    json!({"vector_store_ids": vector_store_ids}),
                );
            }
        }
    }

    let resources = if resources.is_empty() {
        None
    } else {
        Some(Value::Object(resources))
    };

    (tools, resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::AzureAiSearchQueryType;

    #[test]
    fn tool_payload_splits_definitions_and_resources() {
        let functions = [ModelToolDefinition {
            name: "GetSpecials".to_string(),
            description: "specials".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let hosted = [
            HostedTool::BingGrounding {
                connection_id: "conn-bing".to_string(),
            },
            HostedTool::AzureAiSearch {
                connection_id: "conn-search".to_string(),
                index_name: "hotels".to_string(),
                query_type: AzureAiSearchQueryType::Semantic,
                top_k: 3,
            },
            HostedTool::BrowserAutomation {
                connection_id: "conn-browser".to_string(),
            },
        ];

        let (tools, resources) = tool_payload(&functions, &hosted);

        assert_eq!(tools.len(), 4);
        assert_eq!(tools[0]["function"]["name"], "GetSpecials");
        assert_eq!(
            tools[1]["bing_grounding"]["search_configurations"][0]["connection_id"],
            "conn-bing"
        );
        assert_eq!(tools[2], json!({"type": "azure_ai_search"}));
        assert_eq!(tools[3]["browser_automation"]["connection"]["id"], "conn-browser");

        let resources = resources.expect("search needs resources");
        assert_eq!(
            resources["azure_ai_search"]["indexes"][0],
            json!({
                "index_connection_id": "conn-search",
                "index_name": "hotels",
                "query_type": "semantic",
                "top_k": 3,
            })
        );
    }

    #[test]
    fn create_message_uses_string_or_parts() {
        let text = CreateMessageRequest::from_chat_message(&ChatMessage::user("hi"))
            .expect("has content");
        assert_eq!(text.content, json!("hi"));

        let image = CreateMessageRequest::from_chat_message(
            &ChatMessage::user("look").with_image_url("https://example.test/a.png"),
        )
        .expect("has content");
        assert_eq!(
            image.content,
            json!([
                {"type": "text", "text": "look"},
                {"type": "image_url", "image_url": {"url": "https://example.test/a.png"}}
            ])
        );

        assert!(CreateMessageRequest::from_chat_message(&ChatMessage::user("")).is_none());
    }

    #[test]
    fn run_object_parses_required_tool_calls_and_unknown_status() {
        let run: RunObject = serde_json::from_value(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "GetSpecials", "arguments": "{}"}
                    }]
                }
            }
        }))
        .expect("parses");

        assert_eq!(run.status, RunStatus::RequiresAction);
        assert_eq!(run.required_tool_calls()[0].function.name, "GetSpecials");

        let run: RunObject = serde_json::from_value(json!({
            "id": "run_2",
            "status": "paused_for_review",
            "last_error": {"code": "server_error", "message": "boom"}
        }))
        .expect("parses");
        assert_eq!(run.status, RunStatus::Unknown);
        assert_eq!(run.failure_message(), "server_error: boom");
        assert!(run.required_tool_calls().is_empty());
    }

    #[test]
    fn annotations_map_to_citations() {
        let text: MessageText = serde_json::from_value(json!({
            "value": "Seattle is rainy【3:0†source】",
            "annotations": [
                {"type": "url_citation", "text": "【3:0†source】", "url_citation": {"url": "https://w.test", "title": "Weather"}},
                {"type": "file_citation", "text": "【4:0†source】", "file_citation": {"file_id": "file-9"}},
                {"type": "file_path", "text": "x"}
            ]
        }))
        .expect("parses");

        let citations = text
            .annotations
            .into_iter()
            .filter_map(MessageAnnotation::into_citation)
            .collect::<Vec<_>>();

        assert_eq!(citations.len(), 2);
        assert_eq!(
            citations[1].source,
            CitationSource::File {
                file_id: "file-9".to_string(),
                quote: None,
            }
        );
    }
}
