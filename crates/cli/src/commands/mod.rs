//! Subcommand implementations.

pub mod arithmetic;
pub mod ask;
pub mod init;
pub mod story;

use llmask_agent::Asker;
use llmask_config::AppConfig;

/// Load configuration, resolve the API key and wire up an [`Asker`].
pub fn setup() -> Result<(Asker, AppConfig), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let cwd = std::env::current_dir()?;
    let api_key = match config.resolve_api_key(&cwd) {
        Ok(key) => key,
        Err(e) => {
            eprintln!();
            eprintln!("  ERROR: {e}");
            eprintln!();
            eprintln!("  Set one of these environment variables:");
            eprintln!("    LLMASK_API_KEY=sk-...");
            eprintln!("    OPENAI_API_KEY=sk-...");
            eprintln!();
            eprintln!("  Or put the key in {} in the working directory,", llmask_config::KEY_FILE);
            eprintln!("  or add `api_key` to {}", AppConfig::config_path().display());
            eprintln!();
            return Err(e.into());
        }
    };

    let backends = llmask_providers::build_from_config(&config, api_key);
    let asker = Asker::new(backends.provider, backends.transcriber, backends.extractor)
        .with_config(&config);
    Ok((asker, config))
}

/// Ask with or without streaming to stdout.
pub async fn ask<A>(
    asker: &Asker,
    question: llmask_core::Question<A>,
    stream: bool,
) -> Result<llmask_core::Response<A>, llmask_agent::AskFailure>
where
    A: serde::Serialize + serde::de::DeserializeOwned + schemars::JsonSchema + Clone,
{
    if stream {
        let mut stdout = std::io::stdout();
        asker.ask_streaming(question, &mut stdout).await
    } else {
        asker.ask(question).await
    }
}
