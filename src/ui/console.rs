use colored::Colorize;

use manus::config::Settings;
use manus::llm::AssistantMessage;

pub struct Console;

impl Console {
    pub fn new() -> Self {
        Self
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", "[INFO]".blue(), message);
    }

    pub fn error(&self, message: &str) {
        println!("{} {}", "[ERROR]".red(), message);
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "[OK]".green(), message);
    }

    pub fn assistant_message(&self, model: &str, message: &AssistantMessage) {
        println!(
            "\n{} {}",
            format!("[{}]", model).green().bold(),
            "━".repeat(50).dimmed()
        );
        if let Some(content) = &message.content {
            println!("{}", content);
        }
        for call in &message.tool_calls {
            println!(
                "{} {}",
                format!("[TOOL:{}]", call.function.name).magenta(),
                call.function.arguments.dimmed()
            );
        }
    }

    pub fn show_config(&self, settings: &Settings) {
        let settings = settings.masked();

        println!("\n{}", "CONFIGURATION".bold().underline());
        println!("{}", "─".repeat(50));

        println!("\n  {}", "Model:".yellow());
        println!("    Provider:    {}", settings.model_provider.cyan().bold());
        println!("    Model:       {}", settings.model_name.cyan());
        println!("    Temperature: {}", settings.temperature);
        println!("    Max tokens:  {}", settings.max_tokens);
        println!("    API base:    {}", settings.api_base.dimmed());
        match settings.gemini_generate_content_url() {
            Ok(url) => println!("    Endpoint:    {}", url.dimmed()),
            Err(_) => println!("    Endpoint:    {}", "(OpenAI-compatible)".dimmed()),
        }

        println!("\n  {}", "Credentials:".yellow());
        println!("    API key:        {}", display_secret(&settings.api_key));
        println!("    Gemini API key: {}", display_secret(&settings.gemini_api_key));

        println!("\n  {}", "Storage:".yellow());
        println!(
            "    Redis:   {}",
            settings.redis_url.as_deref().unwrap_or("(not set)").dimmed()
        );
        println!(
            "    MongoDB: {} / {}",
            settings.mongodb_uri.dimmed(),
            settings.mongodb_database.dimmed()
        );

        println!(
            "\n  {} {}",
            "MCP config:".yellow(),
            settings.mcp_config_path.dimmed()
        );
        println!("  {} {}", "Log level:".yellow(), settings.log_level.green());
        println!();
    }
}

fn display_secret(value: &Option<String>) -> colored::ColoredString {
    match value {
        Some(masked) => masked.green(),
        None => "not set".red(),
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
