pub mod hosted;
pub mod menu;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::{SchemaError, ToolError};
use crate::llm::ModelToolDefinition;

pub use hosted::{AzureAiSearchQueryType, HostedTool};

type ToolHandler = dyn Fn(Value) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync;

/// A function tool executed locally when the model asks for it.
#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    description: String,
    json_schema: Value,
    handler: Arc<ToolHandler>,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("json_schema", &self.json_schema)
            .finish()
    }
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            json_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": [],
                "additionalProperties": true,
            }),
            handler: Arc::new(|_args| {
                Box::pin(async {
                    Err(ToolError::Execution(
                        "tool handler not configured".to_string(),
                    ))
                })
            }),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Result<Self, SchemaError> {
        validate_schema(&schema)?;
        self.json_schema = schema;
        Ok(self)
    }

    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        self.handler = Arc::new(move |args| Box::pin(handler(args)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn json_schema(&self) -> &Value {
        &self.json_schema
    }

    pub(crate) fn definition(&self) -> ModelToolDefinition {
        ModelToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.json_schema.clone(),
        }
    }

    pub async fn execute(&self, args: Value) -> Result<String, ToolError> {
        validate_arguments(self.name(), &self.json_schema, &args)?;
        (self.handler)(args).await
    }
}

/// Anything an agent can be configured with.
#[derive(Clone, Debug)]
pub enum AgentTool {
    /// Executed locally by the agent.
    Function(ToolSpec),
    /// Executed by the backend service.
    Hosted(HostedTool),
}

impl AgentTool {
    pub fn name(&self) -> &str {
        match self {
            Self::Function(tool) => tool.name(),
            Self::Hosted(tool) => tool.kind(),
        }
    }
}

impl From<ToolSpec> for AgentTool {
    fn from(tool: ToolSpec) -> Self {
        Self::Function(tool)
    }
}

impl From<HostedTool> for AgentTool {
    fn from(tool: HostedTool) -> Self {
        Self::Hosted(tool)
    }
}

fn validate_schema(schema: &Value) -> Result<(), SchemaError> {
    let schema_obj = schema.as_object().ok_or(SchemaError::SchemaNotObject)?;

    let root_type = schema_obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(SchemaError::RootTypeMustBeObject)?;

    if root_type != "object" {
        return Err(SchemaError::RootTypeMustBeObject);
    }

    if let Some(required) = schema_obj.get("required") {
        let required_arr = required.as_array().ok_or(SchemaError::InvalidRequired)?;
        for item in required_arr {
            if !item.is_string() {
                return Err(SchemaError::InvalidRequired);
            }
        }
    }

    Ok(())
}

fn validate_arguments(tool_name: &str, schema: &Value, args: &Value) -> Result<(), ToolError> {
    let args_obj = args
        .as_object()
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool_name.to_string(),
            message: "arguments must be a JSON object".to_string(),
        })?;

    let schema_obj = schema
        .as_object()
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool_name.to_string(),
            message: "tool schema must be a JSON object".to_string(),
        })?;

    if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
        for field in required {
            let Some(field_name) = field.as_str() else {
                continue;
            };
            if !args_obj.contains_key(field_name) {
                return Err(ToolError::InvalidArguments {
                    tool: tool_name.to_string(),
                    message: format!("missing required field: {field_name}"),
                });
            }
        }
    }

    let properties = schema_obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    if schema_obj
        .get("additionalProperties")
        .and_then(Value::as_bool)
        == Some(false)
    {
        for key in args_obj.keys() {
            if !properties.contains_key(key) {
                return Err(ToolError::InvalidArguments {
                    tool: tool_name.to_string(),
                    message: format!("unknown field: {key}"),
                });
            }
        }
    }

    for (key, value) in args_obj {
        if let Some(field_schema) = properties.get(key) {
            if let Some(type_name) = field_schema.get("type").and_then(Value::as_str) {
                if !value_matches_type(value, type_name) {
                    return Err(ToolError::InvalidArguments {
                        tool: tool_name.to_string(),
                        message: format!("field '{key}' must be of type {type_name}"),
                    });
                }
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, type_name: &str) -> bool {
    match type_name {
        "string" => value.is_string(),
        "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
        "number" => value.as_f64().is_some(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo_tool() -> ToolSpec {
        ToolSpec::new("echo", "echo a value")
            .with_schema(json!({
                "type": "object",
                "properties": {"value": {"type": "string"}},
                "required": ["value"],
                "additionalProperties": false
            }))
            .expect("schema valid")
            .with_handler(|args| async move {
                args.get("value")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| ToolError::Execution("value missing".to_string()))
            })
    }

    #[test]
    fn schema_validation_rejects_non_object_root() {
        let result = ToolSpec::new("bad", "bad").with_schema(json!({"type": "string"}));
        assert!(result.is_err());

        let result = ToolSpec::new("bad", "bad")
            .with_schema(json!({"type": "object", "required": [1]}));
        assert!(matches!(result, Err(SchemaError::InvalidRequired)));
    }

    #[tokio::test]
    async fn execute_runs_handler_with_valid_arguments() {
        let output = echo_tool()
            .execute(json!({"value": "hi"}))
            .await
            .expect("tool executes");
        assert_eq!(output, "hi");
    }

    #[tokio::test]
    async fn argument_validation_reports_missing_required() {
        let err = echo_tool().execute(json!({})).await.expect_err("should fail");
        assert!(err.to_string().contains("missing required field"));
    }

    #[tokio::test]
    async fn argument_validation_rejects_unknown_and_mistyped_fields() {
        let err = echo_tool()
            .execute(json!({"value": "x", "extra": 1}))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("unknown field: extra"));

        let err = echo_tool()
            .execute(json!({"value": 3}))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("must be of type string"));
    }

    #[tokio::test]
    async fn unconfigured_handler_fails() {
        let err = ToolSpec::new("noop", "nothing")
            .execute(json!({}))
            .await
            .expect_err("should fail");
        assert!(matches!(err, ToolError::Execution(_)));
    }

    #[test]
    fn agent_tool_names_follow_their_kind() {
        let function = AgentTool::from(echo_tool());
        let hosted = AgentTool::from(HostedTool::CodeInterpreter);

        assert_eq!(function.name(), "echo");
        assert_eq!(hosted.name(), "code_interpreter");
    }
}
