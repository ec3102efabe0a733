//! REST client for agents hosted in an Azure AI Foundry project.
//!
//! Authentication is delegated: the client sends a bearer token obtained
//! elsewhere (for example `az account get-access-token --resource https://ai.azure.com`).

pub(crate) mod types;

use std::time::Duration;

use futures_util::stream::BoxStream;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{
    AZURE_FOUNDRY_ACCESS_TOKEN, AZURE_FOUNDRY_API_VERSION, AZURE_FOUNDRY_PROJECT_DEPLOYMENT_NAME,
    AZURE_FOUNDRY_PROJECT_ENDPOINT, EnvConfig,
};
use crate::error::{AgentError, ConfigurationError, RemoteCallError};
use crate::http::{SseEvent, build_client, sse_events, status_error};

use types::{
    AgentObject, CreateAgentRequest, CreateMessageRequest, CreateRunRequest, MessageList,
    RunObject, SubmitToolOutputsRequest, ThreadMessage, ThreadObject, ToolOutput,
};

const DEFAULT_API_VERSION: &str = "v1";

#[derive(Debug, Clone)]
pub struct FoundryConfig {
    /// Project endpoint, e.g. `https://<resource>.services.ai.azure.com/api/projects/<project>`.
    pub endpoint: String,
    /// Model deployment the agents run on.
    pub deployment: String,
    pub access_token: String,
    pub api_version: String,
    /// Delay between run status polls.
    pub poll_interval: Duration,
    /// Upper bound on how long a polled run may stay unfinished.
    pub run_timeout: Duration,
}

impl FoundryConfig {
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            deployment: deployment.into(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            poll_interval: Duration::from_millis(500),
            run_timeout: Duration::from_secs(300),
        }
    }

    /// Reads `AZURE_FOUNDRY_PROJECT_ENDPOINT`,
    /// `AZURE_FOUNDRY_PROJECT_DEPLOYMENT_NAME`, `AZURE_FOUNDRY_ACCESS_TOKEN`
    /// (all required) and `AZURE_FOUNDRY_API_VERSION`.
    pub fn from_config(config: &EnvConfig) -> Result<Self, ConfigurationError> {
        let endpoint = config.parse_url(AZURE_FOUNDRY_PROJECT_ENDPOINT)?;
        let deployment = config.require(AZURE_FOUNDRY_PROJECT_DEPLOYMENT_NAME)?;
        let access_token = config.require(AZURE_FOUNDRY_ACCESS_TOKEN)?;

        let mut resolved = Self::new(endpoint, deployment, access_token);
        if let Some(version) = config.optional(AZURE_FOUNDRY_API_VERSION) {
            resolved.api_version = version.to_string();
        }
        Ok(resolved)
    }
}

#[derive(Debug, Clone)]
pub struct FoundryClient {
    http: Client,
    config: FoundryConfig,
}

impl FoundryClient {
    pub fn new(config: FoundryConfig) -> Result<Self, RemoteCallError> {
        Ok(Self {
            http: build_client()?,
            config,
        })
    }

    pub fn from_env() -> Result<Self, AgentError> {
        let config = FoundryConfig::from_config(&EnvConfig::from_env())?;
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &FoundryConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "foundry request");
        self.http
            .request(method, format!("{}/{path}", self.config.endpoint))
            .query(&[("api-version", self.config.api_version.as_str())])
            .bearer_auth(&self.config.access_token)
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, RemoteCallError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RemoteCallError> {
        Self::send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|err| RemoteCallError::Response(err.to_string()))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteCallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Self::send_json(self.request(Method::POST, path).json(body)).await
    }

    async fn post_stream<B>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<BoxStream<'static, Result<SseEvent, RemoteCallError>>, RemoteCallError>
    where
        B: Serialize + ?Sized,
    {
        let response = Self::send(self.request(Method::POST, path).json(body)).await?;
        Ok(sse_events(response))
    }

    pub(crate) async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<AgentObject, RemoteCallError> {
        self.post_json("assistants", request).await
    }

    pub async fn delete_agent(&self, agent_id: &str) -> Result<(), RemoteCallError> {
        Self::send(self.request(Method::DELETE, &format!("assistants/{agent_id}"))).await?;
        Ok(())
    }

    pub(crate) async fn create_thread(&self) -> Result<ThreadObject, RemoteCallError> {
        self.post_json("threads", &serde_json::json!({})).await
    }

    pub async fn delete_thread(&self, thread_id: &str) -> Result<(), RemoteCallError> {
        Self::send(self.request(Method::DELETE, &format!("threads/{thread_id}"))).await?;
        Ok(())
    }

    pub(crate) async fn create_message(
        &self,
        thread_id: &str,
        message: &CreateMessageRequest,
    ) -> Result<(), RemoteCallError> {
        Self::send(
            self.request(Method::POST, &format!("threads/{thread_id}/messages"))
                .json(message),
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn create_run(
        &self,
        thread_id: &str,
        request: &CreateRunRequest,
    ) -> Result<RunObject, RemoteCallError> {
        self.post_json(&format!("threads/{thread_id}/runs"), request)
            .await
    }

    pub(crate) async fn create_run_stream(
        &self,
        thread_id: &str,
        request: &CreateRunRequest,
    ) -> Result<BoxStream<'static, Result<SseEvent, RemoteCallError>>, RemoteCallError> {
        let request = CreateRunRequest {
            stream: true,
            ..request.clone()
        };
        self.post_stream(&format!("threads/{thread_id}/runs"), &request)
            .await
    }

    pub(crate) async fn get_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, RemoteCallError> {
        Self::send_json(self.request(Method::GET, &format!("threads/{thread_id}/runs/{run_id}")))
            .await
    }

    pub(crate) async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: Vec<ToolOutput>,
    ) -> Result<RunObject, RemoteCallError> {
        self.post_json(
            &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            &SubmitToolOutputsRequest {
                tool_outputs,
                stream: false,
            },
        )
        .await
    }

    pub(crate) async fn submit_tool_outputs_stream(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: Vec<ToolOutput>,
    ) -> Result<BoxStream<'static, Result<SseEvent, RemoteCallError>>, RemoteCallError> {
        self.post_stream(
            &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            &SubmitToolOutputsRequest {
                tool_outputs,
                stream: true,
            },
        )
        .await
    }

    /// Messages produced by `run_id`, oldest first.
    pub(crate) async fn list_run_messages(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<ThreadMessage>, RemoteCallError> {
        let list: MessageList = Self::send_json(
            self.request(Method::GET, &format!("threads/{thread_id}/messages"))
                .query(&[("order", "asc"), ("run_id", run_id)]),
        )
        .await?;
        Ok(list.data)
    }
}
