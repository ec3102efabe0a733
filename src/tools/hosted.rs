use crate::config::{
    AZURE_AI_MEMORY_STORE_NAME, AZURE_AI_SEARCH_CONNECTION_ID, AZURE_AI_SEARCH_INDEX_NAME,
    BING_CONNECTION_ID, BROWSER_AUTOMATION_CONNECTION_ID, EnvConfig,
};
use crate::error::ConfigurationError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AzureAiSearchQueryType {
    #[default]
    Simple,
    Semantic,
    Vector,
    VectorSimpleHybrid,
    VectorSemanticHybrid,
}

impl AzureAiSearchQueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Semantic => "semantic",
            Self::Vector => "vector",
            Self::VectorSimpleHybrid => "vector_simple_hybrid",
            Self::VectorSemanticHybrid => "vector_semantic_hybrid",
        }
    }
}

/// A tool the backend service runs on the agent's behalf.
///
/// Only descriptors live here; execution, indexing and memory extraction
/// happen on the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostedTool {
    BingGrounding {
        connection_id: String,
    },
    AzureAiSearch {
        connection_id: String,
        index_name: String,
        query_type: AzureAiSearchQueryType,
        top_k: u32,
    },
    BrowserAutomation {
        connection_id: String,
    },
    MemorySearch {
        store_name: String,
        scope: String,
    },
    CodeInterpreter,
    FileSearch {
        vector_store_ids: Vec<String>,
    },
}

impl HostedTool {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BingGrounding { .. } => "bing_grounding",
            Self::AzureAiSearch { .. } => "azure_ai_search",
            Self::BrowserAutomation { .. } => "browser_automation",
            Self::MemorySearch { .. } => "memory_search",
            Self::CodeInterpreter => "code_interpreter",
            Self::FileSearch { .. } => "file_search",
        }
    }

    pub fn azure_ai_search(connection_id: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self::AzureAiSearch {
            connection_id: connection_id.into(),
            index_name: index_name.into(),
            query_type: AzureAiSearchQueryType::default(),
            top_k: 5,
        }
    }

    /// Hosted tools whose connection settings are present.
    ///
    /// An Azure AI Search connection without an index name is a
    /// configuration error rather than a silently skipped tool.
    pub fn from_config(config: &EnvConfig, memory_scope: &str) -> Result<Vec<Self>, ConfigurationError> {
        let mut tools = Vec::new();

        if let Some(connection_id) = config.optional(BING_CONNECTION_ID) {
            tools.push(Self::BingGrounding {
                connection_id: connection_id.to_string(),
            });
        }
        if let Some(connection_id) = config.optional(AZURE_AI_SEARCH_CONNECTION_ID) {
            let index_name = config.require(AZURE_AI_SEARCH_INDEX_NAME)?;
            tools.push(Self::azure_ai_search(connection_id, index_name));
        }
        if let Some(connection_id) = config.optional(BROWSER_AUTOMATION_CONNECTION_ID) {
            tools.push(Self::BrowserAutomation {
                connection_id: connection_id.to_string(),
            });
        }
        if let Some(store_name) = config.optional(AZURE_AI_MEMORY_STORE_NAME) {
            tools.push(Self::MemorySearch {
                store_name: store_name.to_string(),
                scope: memory_scope.to_string(),
            });
        }

        Ok(tools)
    }
}
