//! `ragdesk config`: show the effective configuration.

use ragdesk_config::AppConfig;

pub fn run(show_default: bool) -> Result<(), Box<dyn std::error::Error>> {
    if show_default {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!(
        "# {}",
        AppConfig::config_dir().join("config.toml").display()
    );
    print!("{}", toml::to_string_pretty(&config.redacted())?);

    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set RAGDESK_API_KEY or OPENAI_API_KEY)");
    }
    if config.knowledge.path.is_none() {
        warnings.push("No knowledge.path set: every question will get the information-system apology");
    }
    if config.domain.instructions.trim().is_empty() {
        warnings.push("domain.instructions is empty: answers will use a generic tone");
    }

    if !warnings.is_empty() {
        eprintln!();
        for warning in warnings {
            eprintln!("   warning: {warning}");
        }
    }

    Ok(())
}
