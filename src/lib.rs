//! Agents over remote chat-completion and agent-hosting services.
//!
//! - [`ChatAgent`]: name, instructions and local function tools over any
//!   [`ChatModel`] (OpenAI, Azure OpenAI, Anthropic)
//! - [`PersistentAgent`]: agent definition and per-run threads hosted by an
//!   Azure AI Foundry project, with hosted tools executed by the service
//! - [`AIAgent`]: the shared `run` / `run_streaming` / `delete` surface
//! - [`render`]: console output of answers and citations

pub mod agent;
pub mod config;
pub mod error;
pub mod foundry;
mod http;
pub mod llm;
pub mod message;
pub mod render;
#[cfg(feature = "samples")]
pub mod samples;
pub mod tools;

pub use agent::{
    AIAgent, AgentResponse, AgentStream, AgentUpdate, ChatAgent, ChatAgentBuilder,
    PersistentAgent, PersistentAgentBuilder, RunOptions, collect_stream, run_and_delete,
};
pub use config::EnvConfig;
pub use error::{
    AgentError, ConfigurationError, RemoteCallError, SchemaError, ToolError,
};
pub use foundry::{FoundryClient, FoundryConfig};
pub use llm::{
    AnthropicModel, AnthropicModelConfig, ChatModel, ModelUsage, OpenAiChatModel, OpenAiConfig,
    OpenAiEndpoint,
};
pub use message::{ChatMessage, Citation, CitationSource, ContentPart, Role};
pub use tools::{AgentTool, AzureAiSearchQueryType, HostedTool, ToolSpec};
