//! `ragdesk ask`: single-question or interactive chat mode.

use ragdesk_agent::SupportDesk;
use ragdesk_config::AppConfig;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    conversation_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  WARNING: No API key configured.");
        eprintln!("  Set RAGDESK_API_KEY or OPENAI_API_KEY, or add `api_key` to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
    }

    let desk = SupportDesk::from_config(&config);

    if let Some(question) = message {
        // Single question mode
        let response = desk
            .answer_question(&question, conversation_id.as_deref())
            .await;
        println!("{}", response.answer);
        eprintln!("  conversation: {}", response.conversation_id);
        return Ok(());
    }

    // Interactive mode: every turn shares one conversation id.
    println!();
    println!("  ragdesk: interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    match &config.knowledge.path {
        Some(path) => println!("  Knowledge: {}", path.display()),
        None => println!("  Knowledge: (none)"),
    }
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut conversation_id = conversation_id;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }

        let response = desk
            .answer_question(&line, conversation_id.as_deref())
            .await;
        conversation_id = Some(response.conversation_id.to_string());

        println!();
        for text in response.answer.lines() {
            println!("  Agent > {text}");
        }
        println!();

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    if let Some(id) = conversation_id {
        println!("  Conversation: {id}");
    }
    println!("  Goodbye!");
    println!();

    Ok(())
}
