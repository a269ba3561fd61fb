use super::gemini::GeminiLlm;
use super::openai::OpenAiLlm;
use super::providers::{Llm, Result};
use crate::config::{ModelProvider, Settings};

/// Build the chat backend named by `settings.model_provider`.
///
/// Unknown provider names fall back to the OpenAI-compatible adapter instead
/// of failing. Nothing is cached; every call builds a fresh adapter.
pub fn create_llm(settings: &Settings) -> Result<Box<dyn Llm>> {
    let llm: Box<dyn Llm> = match settings.provider() {
        Some(ModelProvider::Gemini) => {
            tracing::info!("Using Gemini LLM");
            Box::new(GeminiLlm::new(settings)?)
        }
        Some(ModelProvider::OpenAi) => {
            tracing::info!("Using OpenAI LLM");
            Box::new(OpenAiLlm::new(settings))
        }
        Some(ModelProvider::DeepSeek) => {
            tracing::info!("Using Deepseek LLM (via OpenAI compatible API)");
            Box::new(OpenAiLlm::new(settings))
        }
        None => {
            tracing::warn!(
                "Unknown model provider: {}. Falling back to Deepseek.",
                settings.model_provider
            );
            Box::new(OpenAiLlm::new(settings))
        }
    };

    Ok(llm)
}
