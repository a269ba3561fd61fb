// ============================================
// MANUS BACKEND - OpenAI-Compatible Adapter
// Serves openai, deepseek and the fallback provider
// ============================================

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::providers::{
    AssistantMessage, Llm, LlmError, Message, Result, Role, ToolCall, ToolDefinition,
};
use crate::config::Settings;

const PROVIDER: &str = "OpenAI";

pub struct OpenAiLlm {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model_name: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiLlm {
    pub fn new(settings: &Settings) -> Self {
        let api_key = settings.api_key.clone().filter(|key| !key.is_empty());
        if api_key.is_none() {
            tracing::warn!("No API key configured; requests to {} are unauthenticated", settings.api_base);
        }

        tracing::info!("Initialized OpenAI LLM with model: {}", settings.model_name);

        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: settings.api_base.trim_end_matches('/').to_string(),
            model_name: settings.model_name.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn chat_completion(&self, body: &Value) -> Result<AssistantMessage> {
        let mut request = self.client.post(self.endpoint()).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(LlmError::EmptyResponse { provider: PROVIDER })?;

        Ok(AssistantMessage {
            role: Role::Assistant,
            content: message.content,
            tool_calls: message.tool_calls,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[async_trait]
impl Llm for OpenAiLlm {
    async fn ask(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        response_format: Option<&Value>,
        tool_choice: Option<&str>,
    ) -> Result<AssistantMessage> {
        let mut body = serde_json::json!({
            "model": self.model_name,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        if let Some(tool_defs) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = serde_json::to_value(tool_defs)?;
            if let Some(choice) = tool_choice {
                body["tool_choice"] = Value::String(choice.to_string());
            }
        }
        if let Some(format) = response_format {
            body["response_format"] = format.clone();
        }

        tracing::debug!("Sending request to OpenAI-compatible API, model: {}", self.model_name);

        self.chat_completion(&body).await.map_err(|e| {
            tracing::error!("Error calling OpenAI API: {}", e);
            e
        })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
