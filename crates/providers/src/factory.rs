//! Backend wiring: builds the completion, transcription and text-extraction
//! backends from configuration.

use std::sync::Arc;

use llmask_config::AppConfig;
use llmask_core::media::{TextExtractor, Transcriber};
use llmask_core::provider::Provider;
use tracing::info;

use crate::openai_compat::OpenAiCompatProvider;
use crate::pdftotext::PdfToText;

/// The three backends a question may need.
#[derive(Clone)]
pub struct Backends {
    pub provider: Arc<dyn Provider>,
    pub transcriber: Arc<dyn Transcriber>,
    pub extractor: Arc<dyn TextExtractor>,
}

/// Build backends from configuration and a resolved API key.
///
/// One OpenAI-compatible client serves both chat completions and
/// transcription.
pub fn build_from_config(config: &AppConfig, api_key: impl Into<String>) -> Backends {
    let name = if config.api_url.trim_end_matches('/') == llmask_config::OPENAI_API_URL {
        "openai"
    } else {
        "custom"
    };

    let client = Arc::new(
        OpenAiCompatProvider::new(name, &config.api_url, api_key)
            .with_transcription_model(&config.models.transcription),
    );

    info!(
        provider = name,
        api_url = %config.api_url,
        pdftotext = %config.media.pdftotext,
        "Backends configured"
    );

    Backends {
        provider: client.clone(),
        transcriber: client,
        extractor: Arc::new(PdfToText::new(&config.media.pdftotext)),
    }
}
