//! Provider selection: builds the configured completion provider.

use std::sync::Arc;
use ragdesk_config::AppConfig;
use ragdesk_core::provider::Provider;
use tracing::info;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the default provider from configuration.
///
/// A `[providers.<name>]` table overrides the key and base URL for that
/// provider; otherwise the top-level `api_key` and the well-known URL are
/// used. A missing key is not an error here: the provider reports
/// `NotConfigured` when asked to complete.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_else(|| {
            if name == "ollama" {
                "ollama".into()
            } else {
                String::new()
            }
        });

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    info!(provider = %name, base_url = %base_url, "Completion provider configured");
    Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
