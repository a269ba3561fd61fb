// ============================================
// MANUS BACKEND - Gemini Adapter
// generateContent over REST
// ============================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::providers::{
    AssistantMessage, FunctionDeclaration, Llm, LlmError, Message, Result, Role, ToolCall,
    ToolDefinition,
};
use crate::config::Settings;

const PROVIDER: &str = "Gemini";

pub struct GeminiLlm {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model_name: String,
    temperature: f64,
    max_tokens: u32,
}

impl GeminiLlm {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .gemini_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(LlmError::MissingApiKey { provider: PROVIDER })?;
        let endpoint = settings.gemini_generate_content_url()?;

        tracing::info!("Initialized Gemini LLM with model: {}", settings.model_name);

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint,
            model_name: settings.model_name.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn generate_content(&self, request: &GeminiRequest<'_>) -> Result<AssistantMessage> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let body: GeminiResponse = response.json().await?;
        from_gemini_response(body)
    }
}

// --- Request ---

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool<'a>>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiTool<'a> {
    function_declarations: Vec<&'a FunctionDeclaration>,
}

// --- Response ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponsePart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

/// Map chat turns onto Gemini's `user`/`model` vocabulary.
///
/// System text never becomes its own turn. The last system message is folded
/// into the first user turn; if there is no user turn it is dropped.
fn to_gemini_contents(messages: &[Message]) -> Vec<GeminiContent> {
    let mut system_prompt: Option<&str> = None;
    let mut contents = Vec::with_capacity(messages.len());

    for msg in messages {
        let role = match msg.role {
            Role::System => {
                system_prompt = Some(msg.content.as_str());
                continue;
            }
            Role::User => "user",
            Role::Assistant => "model",
        };
        contents.push(GeminiContent {
            role,
            parts: vec![GeminiPart {
                text: msg.content.clone(),
            }],
        });
    }

    if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
        match contents.iter_mut().find(|c| c.role == "user") {
            Some(first_user) => {
                let part = &mut first_user.parts[0];
                part.text = format!("{}\n\n{}", system, part.text);
            }
            None => tracing::debug!("No user turn to carry the system prompt; dropping it"),
        }
    }

    contents
}

fn to_gemini_tools(tools: &[ToolDefinition]) -> Option<Vec<GeminiTool<'_>>> {
    let function_declarations: Vec<&FunctionDeclaration> = tools
        .iter()
        .filter(|tool| tool.is_function())
        .map(|tool| &tool.function)
        .collect();

    if function_declarations.is_empty() {
        None
    } else {
        Some(vec![GeminiTool {
            function_declarations,
        }])
    }
}

fn from_gemini_response(response: GeminiResponse) -> Result<AssistantMessage> {
    let part = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .ok_or(LlmError::EmptyResponse { provider: PROVIDER })?;

    if let Some(call) = part.function_call {
        // Gemini has no call id; the function name stands in for it.
        let arguments = serde_json::to_string(&call.args)?;
        return Ok(AssistantMessage::tool_calls(vec![ToolCall::function(
            call.name.clone(),
            call.name,
            arguments,
        )]));
    }

    Ok(AssistantMessage::text(part.text.unwrap_or_default()))
}

#[async_trait]
impl Llm for GeminiLlm {
    async fn ask(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        response_format: Option<&Value>,
        tool_choice: Option<&str>,
    ) -> Result<AssistantMessage> {
        if response_format.is_some() || tool_choice.is_some() {
            tracing::debug!("Gemini adapter ignores response_format and tool_choice");
        }

        let request = GeminiRequest {
            contents: to_gemini_contents(messages),
            tools: to_gemini_tools(tools.unwrap_or_default()),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        tracing::debug!("Sending request to Gemini, model: {}", self.model_name);

        self.generate_content(&request).await.map_err(|e| {
            tracing::error!("Error calling Gemini API: {}", e);
            e
        })
    }

    fn name(&self) -> &str {
        "gemini"
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
