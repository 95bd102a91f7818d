//! Collaborators that turn audio, video and PDF background material into text.

use async_trait::async_trait;

use crate::error::MediaError;

/// Speech-to-text for audio and video files.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        media: &[u8],
        content_type: &str,
    ) -> std::result::Result<String, MediaError>;
}

/// Plain-text rendering of PDF documents.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, pdf: &[u8]) -> std::result::Result<String, MediaError>;
}
