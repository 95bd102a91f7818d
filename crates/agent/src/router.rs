//! Content router: turns background files into conversation messages.
//!
//! Dispatch is an exact match on the declared content type. Audio and video
//! go through the transcriber, PDFs through the text extractor, text-like
//! types are embedded verbatim and images become multi-part messages. Any
//! image switches the whole request to the vision tier.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use llmask_core::error::MediaError;
use llmask_core::media::{TextExtractor, Transcriber};
use llmask_core::message::{ContentPart, Message};
use llmask_core::provider::{ModelTier, ResponseFormat};
use llmask_core::question::File;
use tracing::debug;

const TRANSCRIBABLE: &[&str] = &[
    "audio/mp3",
    "audio/mp4",
    "audio/mpeg",
    "audio/wav",
    "audio/x-wav",
    "audio/webm",
    "video/mp4",
    "video/mpeg",
    "video/webm",
];

const PDF: &str = "application/pdf";

const PLAIN_TEXT: &[&str] = &[
    "application/json",
    "text/plain",
    "text/html",
    "text/markdown",
    "text/csv",
    "text/xml",
    "text/rtf",
    "text/tab-separated-values",
    "text/richtext",
    "text/yaml",
    "text/x-yaml",
    "text/x-markdown",
    "text/x-rst",
    "text/x-org",
];

const IMAGES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// How a file is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Audio or video, transcribed to text.
    Transcribable,
    /// PDF, rendered to text by the extractor.
    Pdf,
    /// Text-like, embedded as-is.
    PlainText,
    /// Image, embedded inline; needs the vision tier.
    Image,
}

impl ContentKind {
    /// Classify a content type, or fail with `UnsupportedContentType`.
    pub fn classify(content_type: &str) -> Result<Self, MediaError> {
        if TRANSCRIBABLE.contains(&content_type) {
            Ok(Self::Transcribable)
        } else if content_type == PDF {
            Ok(Self::Pdf)
        } else if PLAIN_TEXT.contains(&content_type) {
            Ok(Self::PlainText)
        } else if IMAGES.contains(&content_type) {
            Ok(Self::Image)
        } else {
            Err(MediaError::UnsupportedContentType(content_type.to_string()))
        }
    }
}

/// Per-run request settings that routing may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestProfile {
    pub tier: ModelTier,
    pub response_format: ResponseFormat,
    pub max_tokens: Option<u32>,
}

impl Default for RequestProfile {
    fn default() -> Self {
        Self {
            tier: ModelTier::Text,
            response_format: ResponseFormat::Json,
            max_tokens: None,
        }
    }
}

impl RequestProfile {
    /// Vision models take no response format and need an explicit output
    /// ceiling; their default is very small.
    pub fn switch_to_vision(&mut self, max_tokens: u32) {
        self.tier = ModelTier::Vision;
        self.response_format = ResponseFormat::Unspecified;
        self.max_tokens = Some(max_tokens);
    }
}

/// Messages produced for a question's files, plus the resulting profile.
#[derive(Debug)]
pub struct RoutedFiles {
    pub messages: Vec<Message>,
    pub profile: RequestProfile,
}

/// Routes files to their ingestion path.
#[derive(Clone)]
pub struct ContentRouter {
    transcriber: Arc<dyn Transcriber>,
    extractor: Arc<dyn TextExtractor>,
    vision_max_tokens: u32,
}

impl ContentRouter {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        extractor: Arc<dyn TextExtractor>,
        vision_max_tokens: u32,
    ) -> Self {
        Self {
            transcriber,
            extractor,
            vision_max_tokens,
        }
    }

    pub fn with_vision_max_tokens(mut self, max_tokens: u32) -> Self {
        self.vision_max_tokens = max_tokens;
        self
    }

    /// Produce the message(s) representing one file.
    pub async fn route(&self, file: &File) -> Result<Vec<Message>, MediaError> {
        let kind = ContentKind::classify(&file.content_type)?;
        debug!(
            file = %file.name,
            content_type = %file.content_type,
            bytes = file.content.len(),
            kind = ?kind,
            "Routing file"
        );

        let message = match kind {
            ContentKind::Transcribable => {
                let text = self
                    .transcriber
                    .transcribe(&file.content, &file.content_type)
                    .await?;
                Message::system(format!(
                    "here is the transcription of a {} file named {:?}:\n\n{}",
                    file.content_type, file.name, text
                ))
            }
            ContentKind::Pdf => {
                let text = self.extractor.extract_text(&file.content).await?;
                Message::system(format!(
                    "here is the text rendering of an {} file named {:?}:\n\n{}",
                    file.content_type, file.name, text
                ))
            }
            ContentKind::PlainText => Message::system(format!(
                "here is a {} file named {:?}:\n\n{}",
                file.content_type,
                file.name,
                String::from_utf8_lossy(&file.content)
            )),
            ContentKind::Image => Message::system_parts(vec![
                ContentPart::Text {
                    text: format!("here is an {} file named {:?}", file.content_type, file.name),
                },
                ContentPart::ImageUrl {
                    url: data_url(&file.content_type, &file.content),
                },
            ]),
        };

        Ok(vec![message])
    }

    /// Route every file in order, preceded by a file-count message.
    ///
    /// Stops at the first failure.
    pub async fn route_all(&self, files: &[File]) -> Result<RoutedFiles, MediaError> {
        let mut profile = RequestProfile::default();
        let mut messages = Vec::new();

        if files.is_empty() {
            return Ok(RoutedFiles { messages, profile });
        }

        messages.push(file_count_message(files.len()));
        for file in files {
            messages.extend(self.route(file).await?);
            if ContentKind::classify(&file.content_type)? == ContentKind::Image {
                profile.switch_to_vision(self.vision_max_tokens);
            }
        }

        Ok(RoutedFiles { messages, profile })
    }
}

/// The orientation message sent ahead of the files.
pub fn file_count_message(count: usize) -> Message {
    Message::system(format!(
        "there are going to be {count} files in the following request, each of which you will use as background material for assisting the user."
    ))
}

/// An inline `data:` URL for the given bytes.
pub fn data_url(content_type: &str, content: &[u8]) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingExtractor, StaticExtractor, StaticTranscriber};
    use llmask_core::message::Role;

    fn router() -> ContentRouter {
        ContentRouter::new(
            Arc::new(StaticTranscriber::new("spoken words")),
            Arc::new(StaticExtractor::new("pdf words")),
            4096,
        )
    }

    #[test]
    fn classification_table() {
        assert_eq!(ContentKind::classify("audio/x-wav").unwrap(), ContentKind::Transcribable);
        assert_eq!(ContentKind::classify("video/webm").unwrap(), ContentKind::Transcribable);
        assert_eq!(ContentKind::classify("application/pdf").unwrap(), ContentKind::Pdf);
        assert_eq!(ContentKind::classify("text/x-org").unwrap(), ContentKind::PlainText);
        assert_eq!(ContentKind::classify("application/json").unwrap(), ContentKind::PlainText);
        assert_eq!(ContentKind::classify("image/gif").unwrap(), ContentKind::Image);
    }

    #[test]
    fn unknown_types_are_rejected() {
        let err = ContentKind::classify("application/zip").unwrap_err();
        assert!(matches!(
            err,
            MediaError::UnsupportedContentType(ref ct) if ct == "application/zip"
        ));
        // Parameters are not stripped; the match is exact.
        assert!(ContentKind::classify("text/plain; charset=utf-8").is_err());
    }

    #[tokio::test]
    async fn plain_text_is_embedded_verbatim() {
        let file = File::new("greeting.txt", "hello", "text/plain");
        let messages = router().route(&file).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("hello"));
        assert!(messages[0].content.contains("greeting.txt"));
    }

    #[tokio::test]
    async fn audio_goes_through_the_transcriber() {
        let file = File::new("memo.mp3", vec![0u8; 16], "audio/mp3");
        let messages = router().route(&file).await.unwrap();
        assert_eq!(
            messages[0].content,
            "here is the transcription of a audio/mp3 file named \"memo.mp3\":\n\nspoken words"
        );
    }

    #[tokio::test]
    async fn pdf_goes_through_the_extractor() {
        let file = File::new("paper.pdf", b"%PDF-1.4".to_vec(), "application/pdf");
        let messages = router().route(&file).await.unwrap();
        assert!(
            messages[0]
                .content
                .starts_with("here is the text rendering of an application/pdf")
        );
        assert!(messages[0].content.ends_with("pdf words"));
    }

    #[tokio::test]
    async fn extraction_failure_aborts_routing() {
        let router = ContentRouter::new(
            Arc::new(StaticTranscriber::new("")),
            Arc::new(FailingExtractor),
            4096,
        );
        let files = vec![
            File::new("paper.pdf", b"%PDF".to_vec(), "application/pdf"),
            File::new("notes.txt", "later", "text/plain"),
        ];
        let err = router.route_all(&files).await.unwrap_err();
        assert!(matches!(err, MediaError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn image_becomes_multi_part_and_switches_to_vision() {
        let files = vec![
            File::new("notes.txt", "hello", "text/plain"),
            File::new("chart.png", vec![0x89, b'P', b'N', b'G'], "image/png"),
        ];
        let routed = router().route_all(&files).await.unwrap();

        assert_eq!(routed.messages.len(), 3);
        assert!(routed.messages[0].content.contains("there are going to be 2 files"));

        let image = &routed.messages[2];
        assert_eq!(image.parts.len(), 2);
        assert_eq!(
            image.parts[1],
            ContentPart::ImageUrl { url: "data:image/png;base64,iVBORw==".into() }
        );

        assert_eq!(routed.profile.tier, ModelTier::Vision);
        assert_eq!(routed.profile.response_format, ResponseFormat::Unspecified);
        assert_eq!(routed.profile.max_tokens, Some(4096));
    }

    #[tokio::test]
    async fn no_files_means_no_messages() {
        let routed = router().route_all(&[]).await.unwrap();
        assert!(routed.messages.is_empty());
        assert_eq!(routed.profile, RequestProfile::default());
    }
}
