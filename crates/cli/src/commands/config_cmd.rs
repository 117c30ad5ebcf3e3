//! `autolearn config`: Configuration commands.

use autolearn_config::AppConfig;

use super::load_config;

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    if config.collaborators.mode == "llm" && !config.has_api_key() {
        eprintln!("  ⚠️  No API key set (AUTOLEARN_API_KEY, GROQ_API_KEY or OPENAI_API_KEY)");
    }
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
