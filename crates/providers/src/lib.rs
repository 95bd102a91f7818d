//! Backend implementations for llmask.
//!
//! - [`OpenAiCompatProvider`] implements `llmask_core::Provider` (chat
//!   completions, streaming) and `llmask_core::Transcriber` (audio/video).
//! - [`PdfToText`] implements `llmask_core::TextExtractor` by shelling out
//!   to `pdftotext`.
//! - [`factory::build_from_config`] wires both from an `AppConfig`.

pub mod factory;
pub mod openai_compat;
pub mod pdftotext;
pub mod transcription;

pub use factory::{Backends, build_from_config};
pub use openai_compat::OpenAiCompatProvider;
pub use pdftotext::PdfToText;
