//! `llmask ask`: a free-form question with optional background files.

use std::path::{Path, PathBuf};

use llmask_core::{File, Question};
use tracing::debug;

pub async fn run(
    prompt: String,
    paths: Vec<PathBuf>,
    stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (asker, config) = super::setup()?;

    let mut question = Question::<serde_json::Value>::new(prompt);
    for path in &paths {
        question = question.with_file(load_file(path)?);
    }

    let response = super::ask(&asker, question, stream && config.ask.stream).await?;
    println!("{}", response.answer);
    Ok(())
}

/// Read a file and guess its content type from the extension.
pub fn load_file(path: &Path) -> Result<File, Box<dyn std::error::Error>> {
    let content =
        std::fs::read(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!(file = %name, content_type = %content_type, bytes = content.len(), "Loaded file");
    Ok(File::new(name, content, content_type))
}
