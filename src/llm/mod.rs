mod factory;
mod gemini;
mod openai;
mod providers;

pub use factory::create_llm;
pub use gemini::GeminiLlm;
pub use openai::OpenAiLlm;
pub use providers::{
    AssistantMessage, FunctionCall, FunctionDeclaration, Llm, LlmError, Message, Role, ToolCall,
    ToolDefinition,
};
