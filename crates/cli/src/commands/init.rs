//! `llmask init`: write the default configuration file.

use llmask_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run init.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Set LLMASK_API_KEY (or OPENAI_API_KEY), or put the key in ./{}",
        llmask_config::KEY_FILE
    );
    println!("  2. Run: llmask ask \"what is the tallest mountain?\"");
    Ok(())
}
