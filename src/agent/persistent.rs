use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::{
    AIAgent, AgentResponse, AgentStream, AgentUpdate, RunOptions, ToolExecutionResult, ToolRegistry,
};
use crate::error::{AgentError, RemoteCallError};
use crate::foundry::FoundryClient;
use crate::foundry::types::{
    CreateAgentRequest, CreateMessageRequest, CreateRunRequest, MessageAnnotation,
    MessageContent, MessageDeltaContent, MessageDeltaEvent, RunObject, RunStatus,
    StreamErrorEvent, ThreadMessage, ToolOutput, tool_payload,
};
use crate::http::SseEvent;
use crate::llm::{ModelToolCall, ModelUsage, parse_tool_arguments};
use crate::message::ChatMessage;
use crate::tools::AgentTool;

const DEFAULT_AGENT_NAME: &str = "agent";

pub struct PersistentAgentBuilder {
    client: FoundryClient,
    name: String,
    instructions: Option<String>,
    model: Option<String>,
    tools: Vec<AgentTool>,
    agent_id: Option<String>,
}

impl PersistentAgentBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Overrides the deployment from the client config.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
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

    /// Reuses an agent that already exists on the service instead of
    /// creating one on first run. Function tools must still be registered
    /// here so their calls can be executed.
    pub fn existing_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn build(self) -> Result<PersistentAgent, AgentError> {
        let tools = ToolRegistry::from_tools(self.tools)?;
        let model = self
            .model
            .unwrap_or_else(|| self.client.config().deployment.clone());

        Ok(PersistentAgent {
            client: self.client,
            name: self.name,
            instructions: self.instructions,
            model,
            tools,
            agent_id: Mutex::new(self.agent_id),
        })
    }
}

/// Agent whose definition lives on a Foundry project.
///
/// The service-side agent is created on first use and stays until
/// [`AIAgent::delete`]; a run after a successful delete creates a new one. Every run gets its own thread, which is deleted when
/// the run finishes, fails, or its stream is dropped.
pub struct PersistentAgent {
    client: FoundryClient,
    name: String,
    instructions: Option<String>,
    model: String,
    tools: ToolRegistry,
    agent_id: Mutex<Option<String>>,
}

impl PersistentAgent {
    pub fn builder(client: FoundryClient) -> PersistentAgentBuilder {
        PersistentAgentBuilder {
            client,
            name: DEFAULT_AGENT_NAME.to_string(),
            instructions: None,
            model: None,
            tools: Vec::new(),
            agent_id: None,
        }
    }

    /// Service-side id, once the agent exists.
    pub async fn agent_id(&self) -> Option<String> {
        self.agent_id.lock().await.clone()
    }

    /// Creates the service-side agent if it does not exist yet.
    ///
    /// Concurrent callers wait on the same creation.
    pub async fn create(&self) -> Result<String, AgentError> {
        let mut agent_id = self.agent_id.lock().await;
        if let Some(id) = agent_id.as_ref() {
            return Ok(id.clone());
        }

        let (tools, tool_resources) = tool_payload(&self.tools.definitions(), &self.tools.hosted);
        let request = CreateAgentRequest {
            model: self.model.clone(),
            name: self.name.clone(),
            instructions: self.instructions.clone(),
            tools,
            tool_resources,
        };
        let agent = self.client.create_agent(&request).await?;
        debug!(agent = %self.name, agent_id = %agent.id, "created persistent agent");
        *agent_id = Some(agent.id.clone());
        Ok(agent.id)
    }

    async fn start_thread(&self, messages: &[ChatMessage]) -> Result<ThreadGuard, AgentError> {
        let thread = self.client.create_thread().await?;
        let guard = ThreadGuard {
            client: self.client.clone(),
            thread_id: Some(thread.id),
        };
        for message in messages {
            if let Some(request) = CreateMessageRequest::from_chat_message(message) {
                self.client.create_message(guard.id(), &request).await?;
            }
        }
        Ok(guard)
    }

    fn run_request(&self, agent_id: &str, options: &RunOptions) -> CreateRunRequest {
        CreateRunRequest {
            assistant_id: agent_id.to_string(),
            additional_instructions: options.instructions(None),
            temperature: options.temperature,
            max_completion_tokens: options.max_tokens,
            stream: false,
        }
    }

    /// Runs every requested call. Unparseable arguments go back to the
    /// service as an error output, like any other failed call.
    async fn tool_outputs(&self, run: &RunObject) -> (Vec<ToolOutput>, Vec<ToolExchange>) {
        let mut outputs = Vec::new();
        let mut exchanges = Vec::new();
        for required in run.required_tool_calls() {
            let function = &required.function;
            let parsed = parse_tool_arguments(&function.name, &function.arguments);
            let call = ModelToolCall {
                id: required.id.clone(),
                name: function.name.clone(),
                arguments: parsed
                    .as_ref()
                    .cloned()
                    .unwrap_or_else(|_| Value::String(function.arguments.clone())),
            };
            let execution = match parsed {
                Ok(_) => self.tools.execute(&self.name, &call).await,
                Err(err) => ToolExecutionResult {
                    result_text: err.to_string(),
                    is_error: true,
                },
            };
            outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output: execution.result_text.clone(),
            });
            exchanges.push(ToolExchange {
                call,
                result_text: execution.result_text,
                is_error: execution.is_error,
            });
        }
        (outputs, exchanges)
    }

    async fn poll_to_completion(&self, thread_id: &str, mut run: RunObject) -> Result<RunObject, AgentError> {
        let config = self.client.config();
        let started = Instant::now();

        loop {
            match run.status {
                RunStatus::Completed => return Ok(run),
                RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete => {
                    return Err(run_failed(&run).into());
                }
                RunStatus::RequiresAction
                | RunStatus::Queued
                | RunStatus::InProgress
                | RunStatus::Cancelling
                | RunStatus::Unknown => {}
            }

            // Tool rounds count against the same deadline as waiting.
            if started.elapsed() >= config.run_timeout {
                return Err(RemoteCallError::Timeout {
                    seconds: config.run_timeout.as_secs(),
                }
                .into());
            }

            if run.status == RunStatus::RequiresAction {
                let (outputs, _) = self.tool_outputs(&run).await;
                run = self
                    .client
                    .submit_tool_outputs(thread_id, &run.id, outputs)
                    .await?;
            } else {
                sleep(config.poll_interval).await;
                run = self.client.get_run(thread_id, &run.id).await?;
            }
        }
    }

    async fn run_in_thread(
        &self,
        thread_id: &str,
        agent_id: &str,
        options: &RunOptions,
    ) -> Result<AgentResponse, AgentError> {
        let run = self
            .client
            .create_run(thread_id, &self.run_request(agent_id, options))
            .await?;
        let run = self.poll_to_completion(thread_id, run).await?;
        let messages = self.client.list_run_messages(thread_id, &run.id).await?;

        let mut response =
            response_from_messages(messages).ok_or(AgentError::MissingFinalResponse)?;
        if let Some(usage) = &run.usage {
            response.add_usage(&ModelUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            });
        }
        Ok(response)
    }
}

struct ToolExchange {
    call: ModelToolCall,
    result_text: String,
    is_error: bool,
}

fn run_failed(run: &RunObject) -> RemoteCallError {
    RemoteCallError::RunFailed {
        status: run.status.as_str().to_string(),
        message: run.failure_message(),
    }
}

/// `None` when the run produced no assistant message at all.
fn response_from_messages(messages: Vec<ThreadMessage>) -> Option<AgentResponse> {
    let mut response = AgentResponse::default();
    let mut answered = false;
    for message in messages.into_iter().filter(|message| message.role == "assistant") {
        answered = true;
        for content in message.content {
            if let MessageContent::Text { text } = content {
                response.text.push_str(&text.value);
                response.citations.extend(
                    text.annotations
                        .into_iter()
                        .filter_map(MessageAnnotation::into_citation),
                );
            }
        }
    }
    answered.then_some(response)
}

fn parse_event<T: serde::de::DeserializeOwned>(event: &SseEvent) -> Result<T, RemoteCallError> {
    serde_json::from_str(&event.data).map_err(|err| {
        RemoteCallError::Response(format!(
            "invalid '{}' event: {err}",
            event.event.as_deref().unwrap_or("message")
        ))
    })
}

/// Deletes the per-run thread: awaited on [`ThreadGuard::release`], spawned
/// on drop when a run is abandoned or fails.
struct ThreadGuard {
    client: FoundryClient,
    thread_id: Option<String>,
}

impl ThreadGuard {
    fn id(&self) -> &str {
        self.thread_id.as_deref().unwrap_or_default()
    }

    async fn release(mut self) {
        if let Some(thread_id) = self.thread_id.take() {
            delete_thread(&self.client, &thread_id).await;
        }
    }
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        let Some(thread_id) = self.thread_id.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client = self.client.clone();
                handle.spawn(async move { delete_thread(&client, &thread_id).await });
            }
            Err(_) => warn!(%thread_id, "no runtime available; thread left on the service"),
        }
    }
}

async fn delete_thread(client: &FoundryClient, thread_id: &str) {
    if let Err(err) = client.delete_thread(thread_id).await {
        warn!(thread_id, error = %err, "failed to delete thread");
    }
}

#[async_trait]
impl AIAgent for PersistentAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        messages: &[ChatMessage],
        options: &RunOptions,
    ) -> Result<AgentResponse, AgentError> {
        let agent_id = self.create().await?;
        let thread = self.start_thread(messages).await?;
        let result = self.run_in_thread(thread.id(), &agent_id, options).await;
        thread.release().await;
        result
    }

    fn run_streaming<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &'a RunOptions,
    ) -> AgentStream<'a> {
        let updates = try_stream! {
            let agent_id = self.create().await?;
            let thread = self.start_thread(messages).await?;
            let mut events = self
                .client
                .create_run_stream(thread.id(), &self.run_request(&agent_id, options))
                .await?;
            let mut answered = false;

            loop {
                let mut requires_action: Option<RunObject> = None;
                let mut completed = false;

                while let Some(event) = events.next().await {
                    let event = event?;
                    match event.event.as_deref() {
                        Some("thread.message.completed") => answered = true,
                        Some("thread.message.delta") => {
                            answered = true;
                            let delta: MessageDeltaEvent = parse_event(&event)?;
                            for content in delta.delta.content {
                                let MessageDeltaContent::Text { text } = content else {
                                    continue;
                                };
                                if let Some(value) = text.value.filter(|value| !value.is_empty()) {
                                    yield AgentUpdate::Text(value);
                                }
                                for annotation in text.annotations.unwrap_or_default() {
                                    if let Some(citation) = annotation.into_citation() {
                                        yield AgentUpdate::Citation(citation);
                                    }
                                }
                            }
                        }
                        Some("thread.run.requires_action") => {
                            requires_action = Some(parse_event(&event)?);
                            break;
                        }
                        Some("thread.run.completed") => {
                            completed = true;
                            let run: RunObject = parse_event(&event)?;
                            if let Some(usage) = run.usage {
                                yield AgentUpdate::Usage(ModelUsage {
                                    input_tokens: usage.prompt_tokens,
                                    output_tokens: usage.completion_tokens,
                                });
                            }
                        }
                        Some(
                            "thread.run.failed"
                            | "thread.run.cancelled"
                            | "thread.run.expired"
                            | "thread.run.incomplete",
                        ) => {
                            let run: RunObject = parse_event(&event)?;
                            Err::<(), AgentError>(run_failed(&run).into())?;
                        }
                        Some("error") => {
                            let detail: StreamErrorEvent = parse_event(&event)?;
                            Err::<(), AgentError>(
                                RemoteCallError::Response(
                                    detail.message.unwrap_or_else(|| event.data.clone()),
                                )
                                .into(),
                            )?;
                        }
                        _ if event.is_done() => {
                            completed = true;
                            break;
                        }
                        _ => {}
                    }
                }

                let Some(run) = requires_action else {
                    if !completed {
                        Err::<(), AgentError>(
                            RemoteCallError::Response("stream ended before completion".to_string())
                                .into(),
                        )?;
                    }
                    break;
                };

                let (outputs, exchanges) = self.tool_outputs(&run).await;
                for exchange in exchanges {
                    yield AgentUpdate::ToolCall {
                        tool: exchange.call.name.clone(),
                        args_json: exchange.call.arguments,
                        tool_call_id: exchange.call.id.clone(),
                    };
                    yield AgentUpdate::ToolResult {
                        tool: exchange.call.name,
                        result_text: exchange.result_text,
                        tool_call_id: exchange.call.id,
                        is_error: exchange.is_error,
                    };
                }

                events = self
                    .client
                    .submit_tool_outputs_stream(thread.id(), &run.id, outputs)
                    .await?;
            }

            thread.release().await;
            if !answered {
                Err::<(), AgentError>(AgentError::MissingFinalResponse)?;
            }
        };

        updates.boxed()
    }

    /// Forgets the id only once the service confirmed the deletion, so a
    /// failed delete can be retried.
    async fn delete(&self) {
        let mut agent_id = self.agent_id.lock().await;
        let Some(id) = agent_id.as_deref() else {
            return;
        };
        match self.client.delete_agent(id).await {
            Ok(()) => {
                debug!(agent = %self.name, agent_id = %id, "deleted persistent agent");
                *agent_id = None;
            }
            Err(err) => {
                warn!(agent = %self.name, agent_id = %id, error = %err, "failed to delete agent")
            }
        }
    }
}
