//! # llmask Core
//!
//! Domain types, traits, and error definitions for asking a completion
//! backend a question and getting back a schema-checked, typed answer.
//!
//! Every external collaborator (completion backend, transcription, PDF text
//! extraction, tools) is defined as a trait here. Implementations live in
//! their respective crates, which keeps the orchestration core testable
//! with scripted stand-ins.

pub mod answer;
pub mod error;
pub mod media;
pub mod message;
pub mod provider;
pub mod question;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use answer::{Answer, Response};
pub use error::{Error, MediaError, ProviderError, Result, ToolError};
pub use media::{TextExtractor, Transcriber};
pub use message::{ContentPart, Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{
    FinishReason, ModelTier, Provider, ProviderRequest, ProviderResponse, ResponseFormat,
    StreamChunk, ToolDefinition, Usage,
};
pub use question::{Example, File, Question};
pub use tool::{Tool, ToolCall, ToolRegistry};
