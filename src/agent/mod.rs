mod persistent;

use std::collections::HashMap;
use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::debug;

use crate::error::{AgentError, ToolError};
use crate::llm::{
    ChatModel, ChunkAccumulator, ModelChunk, ModelCompletion, ModelMessage, ModelRequest,
    ModelSettings, ModelToolCall, ModelToolChoice, ModelToolDefinition, ModelUsage,
};
use crate::message::{ChatMessage, Citation};
use crate::tools::{AgentTool, HostedTool, ToolSpec};

pub use persistent::{PersistentAgent, PersistentAgentBuilder};

const DEFAULT_AGENT_NAME: &str = "agent";
const DEFAULT_MAX_ITERATIONS: u32 = 24;

/// Per-call options shared by every backend.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Appended to the agent's instructions for this call only.
    pub additional_instructions: Option<String>,
}

impl RunOptions {
    fn settings(&self) -> ModelSettings {
        ModelSettings {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub(crate) fn instructions(&self, base: Option<&str>) -> Option<String> {
        let parts = [base, self.additional_instructions.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

/// One incremental item of a streamed run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentUpdate {
    Text(String),
    Citation(Citation),
    ToolCall {
        tool: String,
        args_json: serde_json::Value,
        tool_call_id: String,
    },
    ToolResult {
        tool: String,
        result_text: String,
        tool_call_id: String,
        is_error: bool,
    },
    Usage(ModelUsage),
}

/// Final result of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentResponse {
    /// All assistant text of the run, in order.
    pub text: String,
    pub citations: Vec<Citation>,
    pub usage: Option<ModelUsage>,
}

impl AgentResponse {
    pub fn apply(&mut self, update: &AgentUpdate) {
        match update {
            AgentUpdate::Text(text) => self.text.push_str(text),
            AgentUpdate::Citation(citation) => self.citations.push(citation.clone()),
            AgentUpdate::Usage(usage) => self.add_usage(usage),
            AgentUpdate::ToolCall { .. } | AgentUpdate::ToolResult { .. } => {}
        }
    }

    pub fn from_updates<'a>(updates: impl IntoIterator<Item = &'a AgentUpdate>) -> Self {
        let mut response = Self::default();
        for update in updates {
            response.apply(update);
        }
        response
    }

    pub(crate) fn add_usage(&mut self, usage: &ModelUsage) {
        self.usage.get_or_insert_with(ModelUsage::default).add(usage);
    }

    fn add_completion(&mut self, completion: &ModelCompletion) {
        if let Some(text) = &completion.text {
            self.text.push_str(text);
        }
        self.citations.extend(completion.citations.iter().cloned());
        if let Some(usage) = &completion.usage {
            self.add_usage(usage);
        }
    }
}

pub type AgentStream<'a> = BoxStream<'a, Result<AgentUpdate, AgentError>>;

/// Uniform call surface over a remote chat or agent-hosting backend.
#[async_trait]
pub trait AIAgent: Send + Sync {
    fn name(&self) -> &str;

    /// Sends `messages` and waits for the final answer.
    async fn run(
        &self,
        messages: &[ChatMessage],
        options: &RunOptions,
    ) -> Result<AgentResponse, AgentError>;

    /// Streams the answer. Text fragments arrive in emission order; an error
    /// ends the stream at the point it occurred.
    fn run_streaming<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &'a RunOptions,
    ) -> AgentStream<'a>;

    /// Best-effort removal of server-side state. Never fails.
    async fn delete(&self) {}
}

/// Runs once, then cleans up. A failed cleanup never replaces the run's result.
pub async fn run_and_delete<A>(
    agent: &A,
    messages: &[ChatMessage],
    options: &RunOptions,
) -> Result<AgentResponse, AgentError>
where
    A: AIAgent + ?Sized,
{
    let result = agent.run(messages, options).await;
    agent.delete().await;
    result
}

/// Drains a stream into a response, stopping at the first error.
pub async fn collect_stream(mut stream: AgentStream<'_>) -> Result<AgentResponse, AgentError> {
    let mut response = AgentResponse::default();
    while let Some(update) = stream.next().await {
        response.apply(&update?);
    }
    Ok(response)
}

pub struct ChatAgentBuilder {
    model: Option<Arc<dyn ChatModel>>,
    name: String,
    instructions: Option<String>,
    tools: Vec<AgentTool>,
    max_iterations: u32,
}

impl Default for ChatAgentBuilder {
    fn default() -> Self {
        Self {
            model: None,
            name: DEFAULT_AGENT_NAME.to_string(),
            instructions: None,
            tools: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ChatAgentBuilder {
    pub fn model<M>(mut self, model: M) -> Self
    where
        M: ChatModel + 'static,
    {
        self.model = Some(Arc::new(model));
        self
    }

    pub fn shared_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn tool(mut self, tool: impl Into<AgentTool>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn tools<T>(mut self, tools: impl IntoIterator<Item = T>) -> Self
    where
        T: Into<AgentTool>,
    {
        self.tools.extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn build(self) -> Result<ChatAgent, AgentError> {
        let Some(model) = self.model else {
            return Err(AgentError::config(
                "agent model must be configured via ChatAgentBuilder::model(...)",
            ));
        };

        let registry = ToolRegistry::from_tools(self.tools)?;
        if let Some(hosted) = registry.hosted.first() {
            return Err(AgentError::config(format!(
                "hosted tool '{}' needs an agent-hosting backend; use PersistentAgent",
                hosted.kind()
            )));
        }

        Ok(ChatAgent {
            model,
            name: self.name,
            instructions: self.instructions,
            tools: registry,
            max_iterations: self.max_iterations,
        })
    }
}

/// Agent over a [`ChatModel`] that runs function tools locally.
///
/// Holds no conversation state between calls: every run starts from the
/// instructions plus the messages it is given.
pub struct ChatAgent {
    model: Arc<dyn ChatModel>,
    name: String,
    instructions: Option<String>,
    tools: ToolRegistry,
    max_iterations: u32,
}

impl ChatAgent {
    pub fn builder() -> ChatAgentBuilder {
        ChatAgentBuilder::default()
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    fn initial_history(&self, messages: &[ChatMessage], options: &RunOptions) -> Vec<ModelMessage> {
        let mut history = Vec::with_capacity(messages.len() + 1);
        if let Some(instructions) = options.instructions(self.instructions.as_deref()) {
            history.push(ModelMessage::System(instructions));
        }
        history.extend(messages.iter().map(ModelMessage::from));
        history
    }

    fn tool_definitions(&self) -> (Vec<ModelToolDefinition>, ModelToolChoice) {
        let definitions = self.tools.definitions();

        let tool_choice = if definitions.is_empty() {
            ModelToolChoice::None
        } else {
            ModelToolChoice::Auto
        };

        (definitions, tool_choice)
    }
}

/// Function tools by name plus hosted tool descriptors, in registration order.
#[derive(Debug, Default)]
pub(crate) struct ToolRegistry {
    functions: Vec<ToolSpec>,
    by_name: HashMap<String, ToolSpec>,
    pub(crate) hosted: Vec<HostedTool>,
}

impl ToolRegistry {
    pub(crate) fn from_tools(tools: Vec<AgentTool>) -> Result<Self, AgentError> {
        let mut registry = Self::default();
        for tool in tools {
            match tool {
                AgentTool::Function(tool) => {
                    if registry
                        .by_name
                        .insert(tool.name().to_string(), tool.clone())
                        .is_some()
                    {
                        return Err(AgentError::config(format!(
                            "duplicate tool registered: {}",
                            tool.name()
                        )));
                    }
                    registry.functions.push(tool);
                }
                AgentTool::Hosted(hosted) => {
                    if registry.hosted.contains(&hosted) {
                        return Err(AgentError::config(format!(
                            "duplicate hosted tool registered: {}",
                            hosted.kind()
                        )));
                    }
                    registry.hosted.push(hosted);
                }
            }
        }
        Ok(registry)
    }

    pub(crate) fn definitions(&self) -> Vec<ModelToolDefinition> {
        self.functions.iter().map(ToolSpec::definition).collect()
    }

    /// Runs a requested call. Unknown tools and handler failures come back as
    /// error results for the model, not as agent errors.
    pub(crate) async fn execute(&self, agent: &str, tool_call: &ModelToolCall) -> ToolExecutionResult {
        let Some(tool) = self.by_name.get(&tool_call.name) else {
            return ToolExecutionResult {
                result_text: ToolError::NotFound(tool_call.name.clone()).to_string(),
                is_error: true,
            };
        };

        debug!(agent, tool = %tool_call.name, "executing tool call");

        match tool.execute(tool_call.arguments.clone()).await {
            Ok(text) => ToolExecutionResult {
                result_text: text,
                is_error: false,
            },
            Err(err) => ToolExecutionResult {
                result_text: err.to_string(),
                is_error: true,
            },
        }
    }
}

pub(crate) struct ToolExecutionResult {
    pub(crate) result_text: String,
    pub(crate) is_error: bool,
}

fn assistant_turn(completion: &ModelCompletion) -> ModelMessage {
    ModelMessage::Assistant {
        content: completion.text.clone(),
        tool_calls: completion.tool_calls.clone(),
    }
}

fn tool_result_message(tool_call: &ModelToolCall, execution: &ToolExecutionResult) -> ModelMessage {
    ModelMessage::ToolResult {
        tool_call_id: tool_call.id.clone(),
        tool_name: tool_call.name.clone(),
        content: execution.result_text.clone(),
        is_error: execution.is_error,
    }
}

#[async_trait]
impl AIAgent for ChatAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        messages: &[ChatMessage],
        options: &RunOptions,
    ) -> Result<AgentResponse, AgentError> {
        let mut history = self.initial_history(messages, options);
        let (tool_definitions, tool_choice) = self.tool_definitions();
        let settings = options.settings();
        let mut response = AgentResponse::default();

        for _ in 0..self.max_iterations {
            let completion = self
                .model
                .invoke(ModelRequest {
                    messages: &history,
                    tools: &tool_definitions,
                    tool_choice: &tool_choice,
                    settings: &settings,
                })
                .await?;

            response.add_completion(&completion);
            history.push(assistant_turn(&completion));

            if completion.tool_calls.is_empty() {
                return Ok(response);
            }

            for tool_call in &completion.tool_calls {
                let execution = self.tools.execute(&self.name, tool_call).await;
                history.push(tool_result_message(tool_call, &execution));
            }
        }

        Err(AgentError::MaxIterationsReached {
            max_iterations: self.max_iterations,
        })
    }

    fn run_streaming<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &'a RunOptions,
    ) -> AgentStream<'a> {
        let updates = try_stream! {
            let mut history = self.initial_history(messages, options);
            let (tool_definitions, tool_choice) = self.tool_definitions();
            let settings = options.settings();

            for _ in 0..self.max_iterations {
                let mut chunks = self
                    .model
                    .invoke_stream(ModelRequest {
                        messages: &history,
                        tools: &tool_definitions,
                        tool_choice: &tool_choice,
                        settings: &settings,
                    })
                    .await?;

                let mut accumulator = ChunkAccumulator::default();
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk?;
                    match &chunk {
                        ModelChunk::Text(text) => {
                            yield AgentUpdate::Text(text.clone());
                        }
                        ModelChunk::Citation(citation) => {
                            yield AgentUpdate::Citation(citation.clone());
                        }
                        ModelChunk::Usage(usage) => {
                            yield AgentUpdate::Usage(usage.clone());
                        }
                        ModelChunk::ToolCallDelta { .. } => {}
                    }
                    accumulator.push(chunk);
                }

                let completion = accumulator.finish()?;
                history.push(assistant_turn(&completion));

                if completion.tool_calls.is_empty() {
                    return;
                }

                for tool_call in completion.tool_calls {
                    yield AgentUpdate::ToolCall {
                        tool: tool_call.name.clone(),
                        args_json: tool_call.arguments.clone(),
                        tool_call_id: tool_call.id.clone(),
                    };

                    let execution = self.tools.execute(&self.name, &tool_call).await;
                    history.push(tool_result_message(&tool_call, &execution));

                    yield AgentUpdate::ToolResult {
                        tool: tool_call.name,
                        result_text: execution.result_text,
                        tool_call_id: tool_call.id,
                        is_error: execution.is_error,
                    };
                }
            }

            Err::<(), AgentError>(AgentError::MaxIterationsReached {
                max_iterations: self.max_iterations,
            })?;
        };

        updates.boxed()
    }
}
