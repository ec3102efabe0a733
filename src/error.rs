use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("tool schema must be a JSON object")]
    SchemaNotObject,
    #[error("tool schema must declare type=object")]
    RootTypeMustBeObject,
    #[error("required must be an array of strings")]
    InvalidRequired,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid tool arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("tool execution failed: {0}")]
    Execution(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A required setting is absent or unusable. Raised before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{0} is not set")]
    MissingVar(String),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// The backend rejected or failed a request.
#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response invalid: {0}")]
    Response(String),
    #[error("run ended with status {status}: {message}")]
    RunFailed { status: String, message: String },
    #[error("run did not finish within {seconds}s")]
    Timeout { seconds: u64 },
}

impl RemoteCallError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

impl From<reqwest::Error> for RemoteCallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Response(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("remote call failed: {0}")]
    RemoteCall(#[from] RemoteCallError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("max iterations reached ({max_iterations})")]
    MaxIterationsReached { max_iterations: u32 },
    #[error("agent stream ended without final response")]
    MissingFinalResponse,
    #[error("writing output failed: {0}")]
    Output(#[from] std::io::Error),
}

impl AgentError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(ConfigurationError::Invalid {
            key: "agent".to_string(),
            message: message.into(),
        })
    }
}
