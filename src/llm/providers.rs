use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Provider-agnostic tool declaration, in the OpenAI `tools` shape:
/// `{"type": "function", "function": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDeclaration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object")]
    pub parameters: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDeclaration {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn is_function(&self) -> bool {
        self.kind == "function"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Serialized argument object.
    pub arguments: String,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// What `ask` hands back: either text content or tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} API key is not configured.")]
    MissingApiKey { provider: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API returned {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned no candidate content")]
    EmptyResponse { provider: &'static str },

    #[error("Failed to serialize tool arguments: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// Chat capability shared by every backend.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Send a conversation and get back the assistant turn.
    ///
    /// `response_format` and `tool_choice` are hints; backends that cannot
    /// express them accept and ignore them.
    async fn ask(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        response_format: Option<&serde_json::Value>,
        tool_choice: Option<&str>,
    ) -> Result<AssistantMessage>;

    fn name(&self) -> &str;
    fn model_name(&self) -> &str;
    fn temperature(&self) -> f64;
    fn max_tokens(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let value = serde_json::to_value(Message::assistant("Hi")).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "Hi"}));
    }

    #[test]
    fn test_tool_definition_shape() {
        let tool: ToolDefinition = serde_json::from_value(json!({
            "type": "function",
            "function": {
                "name": "shell_execute",
                "description": "Execute a shell command",
                "parameters": {
                    "type": "object",
                    "properties": {"command": {"type": "string"}},
                    "required": ["command"]
                }
            }
        }))
        .unwrap();

        assert!(tool.is_function());
        assert_eq!(tool.function.name, "shell_execute");
        assert!(tool.function.parameters["properties"]["command"].is_object());
    }

    #[test]
    fn test_tool_call_serializes_type_field() {
        let call = ToolCall::function("call_1", "read_file", r#"{"path":"/tmp/a"}"#);
        let value = serde_json::to_value(&call).unwrap();

        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "read_file");
        assert_eq!(value["function"]["arguments"], r#"{"path":"/tmp/a"}"#);
    }

    #[test]
    fn test_assistant_message_with_tool_calls_has_null_content() {
        let msg = AssistantMessage::tool_calls(vec![ToolCall::function("a", "a", "{}")]);
        let value = serde_json::to_value(&msg).unwrap();

        assert!(value["content"].is_null());
        assert_eq!(value["tool_calls"].as_array().unwrap().len(), 1);
    }
}
